//! Orchestrator errors and their wire codes.

use afk_core::{ErrorCode, LimitViolation, PortError, SettingsError, ValidationError};
use afk_db::DbError;
use thiserror::Error;

/// Why an orchestrator call was rejected or failed.
///
/// Every variant maps to exactly one [`ErrorCode`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("user {user_id} not found")]
    UserNotFound { user_id: i64 },

    #[error("AFK rewards are disabled")]
    Disabled,

    #[error("rate limit exceeded: next tick allowed in {retry_after_seconds}s (one per {min_interval_seconds}s)")]
    RateLimited {
        retry_after_seconds: i64,
        min_interval_seconds: i64,
    },

    #[error("session {session_id} is already active")]
    AlreadyActive { session_id: String },

    #[error("no active session")]
    NoActiveSession,

    #[error("{0}")]
    DailyLimit(LimitViolation),

    #[error("claim too soon: wait {retry_after_seconds}s (one claim per {interval_seconds}s)")]
    ClaimTooSoon {
        retry_after_seconds: i64,
        interval_seconds: i64,
    },

    #[error("no credits available to claim ({claimed}/{total_earned} already claimed)")]
    NoCredits { total_earned: i64, claimed: i64 },

    #[error("credits ledger did not accept {credits} credits")]
    LedgerUnavailable { credits: i64 },

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
}

impl From<SettingsError> for EngineError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(err) => Self::Validation(err),
            SettingsError::Store(err) => Self::Port(err),
        }
    }
}

impl EngineError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidRequest,
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::Disabled => ErrorCode::AfkDisabled,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::AlreadyActive { .. } => ErrorCode::SessionAlreadyActive,
            Self::NoActiveSession => ErrorCode::NoActiveSession,
            Self::DailyLimit(violation) => violation.code(),
            Self::ClaimTooSoon { .. } => ErrorCode::ClaimTooSoon,
            Self::NoCredits { .. } => ErrorCode::NoCredits,
            Self::LedgerUnavailable { .. } => ErrorCode::LedgerUnavailable,
            Self::Port(_) | Self::Storage(_) => ErrorCode::TemporaryFailure,
        }
    }

    pub const fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Seconds the caller should wait before retrying, when known.
    pub const fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            Self::RateLimited {
                retry_after_seconds,
                ..
            }
            | Self::ClaimTooSoon {
                retry_after_seconds,
                ..
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }

    /// `(current, limit)` for daily-limit rejections.
    pub const fn usage(&self) -> Option<(i64, i64)> {
        match self {
            Self::DailyLimit(violation) => Some((violation.current, violation.limit)),
            _ => None,
        }
    }

    /// Persistence and collaborator failures, as opposed to rejections.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Port(_) | Self::Storage(_))
    }
}
