//! Request-level entry points.
//!
//! Each call validates the user, resolves [`RewardConfig`] once from the
//! settings store and threads it through the strategy that does the work.

use afk_core::{RewardConfig, SettingsResolver, UserId};
use afk_db::Database;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{Ports, RequestContext};
use crate::error::EngineError;
use crate::session::{ClaimOutcome, SessionAccrual, SessionStarted, SessionStatus, SessionStopped};
use crate::stats::{AdminStats, UserReport, user_report};
use crate::strategy::{AccrualReport, StatusReport, strategy_for};
use crate::tick::{TickAccrual, WorkOutcome};

/// Result of an admin settings update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigUpdate {
    pub key: String,
    pub value: String,
    pub config: RewardConfig,
}

/// The credit award orchestrator for one database connection.
pub struct Engine {
    db: Database,
    ports: Ports,
    resolver: SettingsResolver,
}

impl Engine {
    pub const fn new(db: Database, ports: Ports, resolver: SettingsResolver) -> Self {
        Self {
            db,
            ports,
            resolver,
        }
    }

    pub const fn ports(&self) -> &Ports {
        &self.ports
    }

    /// The current configuration with defaults applied.
    pub fn config(&self) -> Result<RewardConfig, EngineError> {
        Ok(self.resolver.resolve(self.ports.settings.as_ref())?)
    }

    /// Validates and stores one setting; returns the resulting configuration.
    pub fn update_config(&self, key: &str, value: &str) -> Result<ConfigUpdate, EngineError> {
        let normalized = self
            .resolver
            .update(self.ports.settings.as_ref(), key, value)?;
        Ok(ConfigUpdate {
            key: key.to_string(),
            value: normalized,
            config: self.config()?,
        })
    }

    fn authorize(&self, user: i64) -> Result<UserId, EngineError> {
        let user = UserId::new(user)?;
        if !self.ports.users.exists(user)? {
            return Err(EngineError::UserNotFound {
                user_id: user.get(),
            });
        }
        Ok(user)
    }

    fn run<T>(
        &mut self,
        user: i64,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut RequestContext<'_>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let user = self.authorize(user)?;
        let config = self.config()?;
        let mut cx = RequestContext {
            db: &mut self.db,
            ports: &self.ports,
            config: &config,
            user,
            now,
        };
        f(&mut cx)
    }

    pub fn work(&mut self, user: i64) -> Result<WorkOutcome, EngineError> {
        self.work_at(user, Utc::now())
    }

    pub fn work_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<WorkOutcome, EngineError> {
        self.run(user, now, |cx| TickAccrual.work(cx))
    }

    pub fn start(&mut self, user: i64) -> Result<SessionStarted, EngineError> {
        self.start_at(user, Utc::now())
    }

    pub fn start_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<SessionStarted, EngineError> {
        self.run(user, now, |cx| SessionAccrual.start(cx))
    }

    pub fn stop(&mut self, user: i64) -> Result<SessionStopped, EngineError> {
        self.stop_at(user, Utc::now())
    }

    pub fn stop_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<SessionStopped, EngineError> {
        self.run(user, now, |cx| SessionAccrual.stop(cx))
    }

    pub fn claim(&mut self, user: i64) -> Result<ClaimOutcome, EngineError> {
        self.claim_at(user, Utc::now())
    }

    pub fn claim_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<ClaimOutcome, EngineError> {
        self.run(user, now, |cx| SessionAccrual.claim(cx))
    }

    pub fn session_status(&mut self, user: i64) -> Result<SessionStatus, EngineError> {
        self.session_status_at(user, Utc::now())
    }

    pub fn session_status_at(
        &mut self,
        user: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionStatus, EngineError> {
        self.run(user, now, |cx| SessionAccrual.session_status(cx))
    }

    /// Accrues through the strategy selected by `accrual_mode`.
    pub fn accrue(&mut self, user: i64) -> Result<AccrualReport, EngineError> {
        self.accrue_at(user, Utc::now())
    }

    pub fn accrue_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<AccrualReport, EngineError> {
        self.run(user, now, |cx| strategy_for(cx.config.accrual_mode).accrue(cx))
    }

    /// Progress through the strategy selected by `accrual_mode`.
    pub fn status(&mut self, user: i64) -> Result<StatusReport, EngineError> {
        self.status_at(user, Utc::now())
    }

    pub fn status_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<StatusReport, EngineError> {
        self.run(user, now, |cx| strategy_for(cx.config.accrual_mode).status(cx))
    }

    pub fn user_stats(&mut self, user: i64) -> Result<UserReport, EngineError> {
        self.user_stats_at(user, Utc::now())
    }

    pub fn user_stats_at(&mut self, user: i64, now: DateTime<Utc>) -> Result<UserReport, EngineError> {
        self.run(user, now, |cx| user_report(cx))
    }

    pub fn admin_stats(&self) -> Result<AdminStats, EngineError> {
        self.admin_stats_at(Utc::now())
    }

    pub fn admin_stats_at(&self, now: DateTime<Utc>) -> Result<AdminStats, EngineError> {
        let config = self.config()?;
        let today = now.date_naive();
        let totals = self.db.totals(today)?;
        let formatted = self.ports.formatter.format(totals.total_credits_earned);
        Ok(AdminStats::new(totals, today, &config, formatted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestBed, at};
    use afk_core::{AccrualMode, ErrorCode, SettingsStore};

    fn engine(bed: TestBed) -> Engine {
        Engine::new(bed.db, bed.ports, SettingsResolver::new("afk"))
    }

    #[test]
    fn invalid_and_unknown_users_are_rejected() {
        let mut engine = engine(TestBed::new(RewardConfig::default()));

        let err = engine.work_at(0, at(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.http_status(), 400);

        let err = engine.work_at(42, at(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn settings_are_read_per_request() {
        let bed = TestBed::new(RewardConfig::default());
        let panel = bed.panel.clone();
        let mut engine = engine(bed);

        assert!(engine.work_at(1, at(0)).is_ok());
        panel.set("afk", "is_enabled", "0").unwrap();
        let err = engine.work_at(1, at(60)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AfkDisabled);
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn accrue_follows_configured_mode() {
        let mut engine = engine(TestBed::new(RewardConfig::default()));
        assert!(matches!(
            engine.accrue_at(1, at(0)).unwrap(),
            AccrualReport::Tick(WorkOutcome {
                credits_awarded: 1,
                ..
            })
        ));

        let update = engine.update_config("accrual_mode", "session").unwrap();
        assert_eq!(update.config.accrual_mode, AccrualMode::Session);

        engine.start_at(1, at(60)).unwrap();
        let report = engine.accrue_at(1, at(185)).unwrap();
        let AccrualReport::Session(claim) = report else {
            panic!("expected a claim, got {report:?}");
        };
        assert_eq!(claim.credits_claimed, 2);
        assert_eq!(claim.balance, Some(3));

        assert!(matches!(
            engine.status_at(1, at(190)).unwrap(),
            StatusReport::Session(SessionStatus { active: true, .. })
        ));
    }

    #[test]
    fn update_config_rejects_bad_values() {
        let engine = engine(TestBed::new(RewardConfig::default()));
        let err = engine
            .update_config("credits_per_minute", "lots")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        let err = engine.update_config("no_such_key", "1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(engine.config().unwrap(), RewardConfig::default());
    }

    #[test]
    fn admin_stats_sum_users() {
        let bed = TestBed::new(RewardConfig::default());
        bed.panel
            .add_user(UserId::new(2).unwrap(), "bob")
            .unwrap();
        let mut engine = engine(bed);
        engine.work_at(1, at(0)).unwrap();
        engine.work_at(2, at(0)).unwrap();
        engine.start_at(2, at(0)).unwrap();

        let stats = engine.admin_stats_at(at(10)).unwrap();
        assert_eq!(stats.users_tracked, 2);
        assert_eq!(stats.total_credits_earned, 2);
        assert_eq!(stats.formatted_credits_earned, "2 credits");
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.today.users_active, 2);
        assert_eq!(stats.today.time_seconds, 120);
    }
}
