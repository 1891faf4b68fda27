//! Daily usage ledger: per-user, per-date counters and the limits they feed.

use afk_core::{DailyUsage, LimitCheck, RewardConfig, UserId, check_limits};
use afk_db::Database;
use chrono::NaiveDate;

use crate::error::EngineError;

/// Daily usage operations over one database connection.
pub struct DailyUsageLedger<'db> {
    db: &'db mut Database,
}

impl<'db> DailyUsageLedger<'db> {
    pub const fn new(db: &'db mut Database) -> Self {
        Self { db }
    }

    /// Today's row for `user`, created if absent. Safe under concurrent callers.
    pub fn get_or_create(&mut self, user: UserId, date: NaiveDate) -> Result<DailyUsage, EngineError> {
        Ok(self.db.get_or_create_daily_usage(user, date)?)
    }

    /// Adds deltas to the `(user, date)` row in one locked unit.
    ///
    /// Returns `false` (after logging) when the write failed; nothing is applied then.
    pub fn record_usage(
        &mut self,
        user: UserId,
        date: NaiveDate,
        credits_delta: i64,
        time_delta: i64,
        session_increment: bool,
    ) -> bool {
        match self
            .db
            .record_usage(user, date, credits_delta, time_delta, session_increment)
        {
            Ok(usage) => {
                tracing::debug!(
                    %user,
                    %date,
                    credits_earned = usage.credits_earned,
                    time_seconds = usage.time_seconds,
                    sessions_count = usage.sessions_count,
                    "recorded daily usage"
                );
                true
            }
            Err(err) => {
                tracing::error!(%user, %date, error = %err, "failed to record daily usage");
                false
            }
        }
    }

    /// Evaluates `config`'s daily caps against the `(user, date)` row.
    pub fn check_limits(
        &mut self,
        user: UserId,
        date: NaiveDate,
        config: &RewardConfig,
    ) -> Result<LimitCheck, EngineError> {
        let usage = self.get_or_create(user, date)?;
        Ok(check_limits(&usage, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afk_core::ErrorCode;

    fn user() -> UserId {
        UserId::new(1).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn record_then_check() {
        let mut db = Database::open_in_memory().unwrap();
        let mut ledger = DailyUsageLedger::new(&mut db);
        let config = RewardConfig {
            max_credits_per_day: Some(5),
            ..RewardConfig::default()
        };

        assert!(ledger.record_usage(user(), day(), 4, 240, false));
        assert!(ledger.check_limits(user(), day(), &config).unwrap().is_allowed());

        assert!(ledger.record_usage(user(), day(), 1, 60, false));
        let check = ledger.check_limits(user(), day(), &config).unwrap();
        assert_eq!(check.reason(), Some(ErrorCode::DailyCreditsLimit));
    }

    #[test]
    fn get_or_create_starts_empty() {
        let mut db = Database::open_in_memory().unwrap();
        let mut ledger = DailyUsageLedger::new(&mut db);
        assert_eq!(
            ledger.get_or_create(user(), day()).unwrap(),
            DailyUsage::empty(user(), day())
        );
    }
}
