//! User and admin statistics.

use afk_core::{AccrualMode, DailyUsage, RewardConfig, Session, UserId, UserStats};
use afk_db::StorageTotals;
use chrono::NaiveDate;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::EngineError;

/// Usage of one daily dimension against its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitStatus {
    pub used: i64,
    /// `None` means unlimited.
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

impl LimitStatus {
    pub fn new(used: i64, limit: Option<i64>) -> Self {
        Self {
            used,
            limit,
            remaining: limit.map(|limit| (limit - used).max(0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyLimits {
    pub credits: LimitStatus,
    pub sessions: LimitStatus,
    pub time_seconds: LimitStatus,
}

impl DailyLimits {
    pub fn new(usage: &DailyUsage, config: &RewardConfig) -> Self {
        Self {
            credits: LimitStatus::new(usage.credits_earned, config.max_credits_per_day),
            sessions: LimitStatus::new(usage.sessions_count, config.max_sessions_per_day),
            time_seconds: LimitStatus::new(usage.time_seconds, config.max_time_per_day_seconds),
        }
    }
}

/// Everything a user's statistics page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub user_id: UserId,
    pub accrual_mode: AccrualMode,
    pub stats: UserStats,
    pub today: DailyUsage,
    pub limits: DailyLimits,
    pub balance: Option<i64>,
    pub formatted_balance: Option<String>,
    pub active_session: Option<Session>,
}

/// Gathers a user's report. Read-only.
pub fn user_report(cx: &RequestContext<'_>) -> Result<UserReport, EngineError> {
    let (user, today) = (cx.user, cx.today());
    let stats = cx
        .db
        .user_stats(user)?
        .unwrap_or_else(|| UserStats::empty(user));
    let usage = cx
        .db
        .daily_usage(user, today)?
        .unwrap_or_else(|| DailyUsage::empty(user, today));
    let balance = cx.ports.balance(user);

    Ok(UserReport {
        user_id: user,
        accrual_mode: cx.config.accrual_mode,
        limits: DailyLimits::new(&usage, cx.config),
        stats,
        today: usage,
        formatted_balance: balance.map(|balance| cx.ports.formatter.format(balance)),
        balance,
        active_session: cx.db.active_session(user)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayTotals {
    pub date: NaiveDate,
    pub users_active: i64,
    pub credits_earned: i64,
    pub sessions: i64,
    pub time_seconds: i64,
}

/// Plugin-wide totals for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub is_enabled: bool,
    pub accrual_mode: AccrualMode,
    pub users_tracked: i64,
    pub total_credits_earned: i64,
    pub formatted_credits_earned: String,
    pub total_time_seconds: i64,
    pub total_minutes_afk: i64,
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub today: TodayTotals,
}

impl AdminStats {
    pub fn new(
        totals: StorageTotals,
        date: NaiveDate,
        config: &RewardConfig,
        formatted_credits_earned: String,
    ) -> Self {
        Self {
            is_enabled: config.is_enabled,
            accrual_mode: config.accrual_mode,
            users_tracked: totals.users_tracked,
            total_credits_earned: totals.total_credits_earned,
            formatted_credits_earned,
            total_time_seconds: totals.total_time_seconds,
            total_minutes_afk: totals.total_minutes_afk,
            total_sessions: totals.total_sessions,
            active_sessions: totals.active_sessions,
            today: TodayTotals {
                date,
                users_active: totals.users_active_today,
                credits_earned: totals.today_credits_earned,
                sessions: totals.today_sessions,
                time_seconds: totals.today_time_seconds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionAccrual;
    use crate::testing::{TestBed, at};
    use crate::tick::TickAccrual;

    #[test]
    fn limit_status_remaining() {
        assert_eq!(
            LimitStatus::new(7, Some(5)),
            LimitStatus {
                used: 7,
                limit: Some(5),
                remaining: Some(0)
            }
        );
        assert_eq!(LimitStatus::new(7, None).remaining, None);
    }

    #[test]
    fn report_for_untracked_user_is_empty() {
        let mut bed = TestBed::new(RewardConfig::default());
        let report = bed.with_cx(at(0), |cx| user_report(cx)).unwrap();
        assert_eq!(report.stats, UserStats::empty(bed.user));
        assert_eq!(report.balance, Some(0));
        assert_eq!(report.active_session, None);
    }

    #[test]
    fn report_reflects_ticks_and_sessions() {
        let mut bed = TestBed::new(RewardConfig {
            max_credits_per_day: Some(10),
            ..RewardConfig::default()
        });
        bed.with_cx(at(0), |cx| TickAccrual.work(cx)).unwrap();
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();

        let report = bed.with_cx(at(30), |cx| user_report(cx)).unwrap();
        assert_eq!(report.stats.minutes_afk, 1);
        assert_eq!(report.today.credits_earned, 1);
        assert_eq!(report.limits.credits.remaining, Some(9));
        assert_eq!(report.limits.sessions.limit, None);
        assert_eq!(report.formatted_balance.as_deref(), Some("1 credits"));
        assert!(report.active_session.is_some());
    }
}
