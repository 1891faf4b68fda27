//! Core domain logic for the AFK credits plugin.
//!
//! This crate contains the fundamental types and logic for:
//! - Settings resolution: turning the string-valued plugin settings into a [`RewardConfig`]
//! - Accrual: converting elapsed presence time into credits
//! - Daily limits: evaluating per-user, per-day caps
//! - Ports: the interfaces of the billing panel collaborators the plugin talks to

pub mod accrual;
pub mod config;
pub mod events;
pub mod ports;
pub mod types;
pub mod usage;

pub use accrual::{
    LAST_SEEN_CUTOFF, SessionProgress, TICK_WIDTH_SECONDS, TickDecision, TickRate, compute_credits,
    next_reward_in, session_progress, tick_award, tick_decision,
};
pub use config::{
    MAX_CREDITS_PER_MINUTE, MIN_MINUTES_PER_CREDIT, RewardConfig, SettingKey, SettingsError,
    SettingsResolver,
};
pub use events::{AccrualEvent, EventSink, TracingSink};
pub use ports::{CreditsLedger, CurrencyFormatter, PlainFormatter, PortError, SettingsStore, UserDirectory};
pub use types::{AccrualMode, ErrorCode, UserId, ValidationError};
pub use usage::{
    DailyLimit, DailyUsage, LimitCheck, LimitViolation, Session, TickOutcome, UserStats,
    check_limits, remaining_daily_credits,
};
