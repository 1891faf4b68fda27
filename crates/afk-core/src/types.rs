//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and settings values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// User ids are positive integers.
    #[error("invalid user id: {value}")]
    InvalidUserId { value: i64 },

    /// Unknown plugin setting key.
    #[error("unknown setting: {key}")]
    UnknownSetting { key: String },

    /// A setting value failed to parse or was out of range.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Invalid accrual mode value.
    #[error("invalid accrual mode: {value}")]
    InvalidAccrualMode { value: String },
}

/// A validated billing panel user id.
///
/// The panel hands out positive integer ids; zero and negative values never
/// refer to a user and are rejected before any lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Creates a user id after validation.
    pub const fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::InvalidUserId { value });
        }
        Ok(Self(value))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which accrual model the generic `accrue`/`status` entry points route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccrualMode {
    /// Session-less periodic "work" ticks.
    #[default]
    Tick,
    /// Explicit start / claim / stop sessions.
    Session,
}

impl AccrualMode {
    /// String representation for settings storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for AccrualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccrualMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tick" | "work" => Ok(Self::Tick),
            "session" | "sessions" => Ok(Self::Session),
            _ => Err(ValidationError::InvalidAccrualMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Stable machine-readable error codes carried in every rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    SessionAlreadyActive,
    NoActiveSession,
    DailyCreditsLimit,
    DailySessionsLimit,
    DailyTimeLimit,
    ClaimTooSoon,
    NoCredits,
    AfkDisabled,
    /// Reserved for the panel's authentication layer in front of the plugin.
    /// The engine never produces it; callers get it before a request reaches
    /// the engine.
    Unauthorized,
    InvalidRequest,
    UserNotFound,
    LedgerUnavailable,
    TemporaryFailure,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::SessionAlreadyActive => "SESSION_ALREADY_ACTIVE",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::DailyCreditsLimit => "DAILY_CREDITS_LIMIT",
            Self::DailySessionsLimit => "DAILY_SESSIONS_LIMIT",
            Self::DailyTimeLimit => "DAILY_TIME_LIMIT",
            Self::ClaimTooSoon => "CLAIM_TOO_SOON",
            Self::NoCredits => "NO_CREDITS",
            Self::AfkDisabled => "AFK_DISABLED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::LedgerUnavailable => "LEDGER_UNAVAILABLE",
            Self::TemporaryFailure => "TEMPORARY_FAILURE",
        }
    }

    /// HTTP status the code is reported with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::RateLimitExceeded
            | Self::DailyCreditsLimit
            | Self::DailySessionsLimit
            | Self::DailyTimeLimit
            | Self::ClaimTooSoon => 429,
            Self::AfkDisabled => 403,
            Self::NoActiveSession | Self::UserNotFound => 404,
            Self::Unauthorized => 401,
            Self::SessionAlreadyActive | Self::NoCredits | Self::InvalidRequest => 400,
            Self::LedgerUnavailable | Self::TemporaryFailure => 503,
        }
    }

    /// Whether the same request may succeed if retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded
                | Self::ClaimTooSoon
                | Self::NoCredits
                | Self::LedgerUnavailable
                | Self::TemporaryFailure
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
