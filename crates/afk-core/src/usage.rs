//! Per-user accrual records and daily limit evaluation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RewardConfig;
use crate::types::{ErrorCode, UserId};

/// Cumulative per-user counters. Only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    /// Accepted ticks, one per minute of presence.
    pub minutes_afk: i64,
    /// Unix seconds of the last accepted tick. Used only for tick rate limiting.
    pub last_seen_afk: i64,
    pub total_time_seconds: i64,
    pub total_credits_earned: i64,
    pub sessions_count: i64,
}

impl UserStats {
    /// A fresh row, as created on first access.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            minutes_afk: 0,
            last_seen_afk: 0,
            total_time_seconds: 0,
            total_credits_earned: 0,
            sessions_count: 0,
        }
    }
}

/// Result of a rate-limited tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick was counted; carries the updated row.
    Accepted(UserStats),
    /// A tick was already accepted inside the current window.
    TooSoon {
        retry_after_seconds: i64,
        stats: UserStats,
    },
}

/// One user's counters for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub credits_earned: i64,
    pub sessions_count: i64,
    pub time_seconds: i64,
}

impl DailyUsage {
    #[must_use]
    pub const fn empty(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            credits_earned: 0,
            sessions_count: 0,
            time_seconds: 0,
        }
    }
}

/// An explicit AFK session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Snapshot of total credits implied by elapsed time. Never decreases.
    pub credits_earned: i64,
    /// Credits already moved to the ledger. Never exceeds `credits_earned`.
    pub credits_claimed: i64,
    pub time_elapsed: i64,
    pub last_claim_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A new active session starting at `now`.
    #[must_use]
    pub fn start(id: String, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            started_at: now,
            stopped_at: None,
            is_active: true,
            credits_earned: 0,
            credits_claimed: 0,
            time_elapsed: 0,
            last_claim_at: None,
        }
    }
}

/// The daily dimensions that can be capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyLimit {
    Credits,
    Sessions,
    Time,
}

impl DailyLimit {
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::Credits => ErrorCode::DailyCreditsLimit,
            Self::Sessions => ErrorCode::DailySessionsLimit,
            Self::Time => ErrorCode::DailyTimeLimit,
        }
    }
}

/// A daily limit that has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitViolation {
    pub limit_kind: DailyLimit,
    pub current: i64,
    pub limit: i64,
}

impl LimitViolation {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.limit_kind.code()
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit_kind {
            DailyLimit::Credits => write!(
                f,
                "daily credit limit reached ({}/{} credits)",
                self.current, self.limit
            ),
            DailyLimit::Sessions => write!(
                f,
                "daily session limit reached ({}/{} sessions)",
                self.current, self.limit
            ),
            DailyLimit::Time => write!(
                f,
                "daily time limit reached ({}/{} seconds)",
                self.current, self.limit
            ),
        }
    }
}

/// Outcome of [`check_limits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    Allowed,
    Blocked(LimitViolation),
}

impl LimitCheck {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    #[must_use]
    pub const fn reason(&self) -> Option<ErrorCode> {
        match self {
            Self::Allowed => None,
            Self::Blocked(violation) => Some(violation.code()),
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::Blocked(violation) => Some(violation.message()),
        }
    }
}

/// Checks credits, then sessions, then time against today's row.
///
/// Returns the first limit reached. `None` limits are unlimited.
pub fn check_limits(usage: &DailyUsage, config: &RewardConfig) -> LimitCheck {
    let dimensions = [
        (
            DailyLimit::Credits,
            usage.credits_earned,
            config.max_credits_per_day,
        ),
        (
            DailyLimit::Sessions,
            usage.sessions_count,
            config.max_sessions_per_day,
        ),
        (
            DailyLimit::Time,
            usage.time_seconds,
            config.max_time_per_day_seconds,
        ),
    ];

    for (limit_kind, current, limit) in dimensions {
        if let Some(limit) = limit {
            if current >= limit {
                return LimitCheck::Blocked(LimitViolation {
                    limit_kind,
                    current,
                    limit,
                });
            }
        }
    }
    LimitCheck::Allowed
}

/// Credits still awardable today, or `None` when there is no daily credit cap.
pub fn remaining_daily_credits(usage: &DailyUsage, config: &RewardConfig) -> Option<i64> {
    config
        .max_credits_per_day
        .map(|max| (max - usage.credits_earned).max(0))
}
