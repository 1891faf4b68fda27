//! Accrual rules: turning elapsed presence into credits.
//!
//! Two models share these rules:
//! - Sessions accrue over an arbitrary elapsed span ([`compute_credits`]).
//! - Ticks accrue one minute at a time ([`tick_award`]), debounced per user
//!   by [`tick_decision`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RewardConfig;
use crate::usage::Session;

/// Presence time represented by one accepted tick.
pub const TICK_WIDTH_SECONDS: i64 = 60;

/// `last_seen_afk` values before 2020-01-01T00:00:00Z count as "never ticked".
///
/// Zero (fresh rows) and legacy rows that stored minutes or garbage in the
/// column fall below it.
pub const LAST_SEEN_CUTOFF: i64 = 1_577_836_800;

/// Credits implied by `elapsed_seconds` of presence.
///
/// First applicable rate wins: `credits_per_minute`, then
/// `minutes_per_credit`, then one credit per minute. The result is floored,
/// capped at `max_credits_per_session` and never negative.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "elapsed seconds are far below 2^52 and credits are floored"
)]
pub fn compute_credits(elapsed_seconds: i64, config: &RewardConfig) -> i64 {
    let minutes = elapsed_seconds.max(0) as f64 / 60.0;
    let raw = if config.credits_per_minute > 0.0 {
        minutes * config.credits_per_minute
    } else if let Some(minutes_per_credit) = config.minutes_per_credit.filter(|m| *m > 0.0) {
        minutes / minutes_per_credit
    } else {
        minutes
    };

    let mut credits = raw.floor() as i64;
    if let Some(cap) = config.max_credits_per_session {
        credits = credits.min(cap);
    }
    credits.max(0)
}

/// Seconds until the next interval boundary.
///
/// A zero remainder counts as a full interval away, so the result is always
/// positive. `None` when the interval is not positive.
pub const fn next_reward_in(elapsed_seconds: i64, interval_seconds: i64) -> Option<i64> {
    if interval_seconds <= 0 {
        return None;
    }
    let remainder = elapsed_seconds.rem_euclid(interval_seconds);
    if remainder == 0 {
        Some(interval_seconds)
    } else {
        Some(interval_seconds - remainder)
    }
}

/// Per-tick payout derived from the configured rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TickRate {
    /// At least one credit per minute: pay this many every tick.
    Whole(i64),
    /// Less than one credit per minute: pay one credit on every Nth tick.
    EveryNth(i64),
}

impl TickRate {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "rates are small positive numbers"
    )]
    pub fn from_config(config: &RewardConfig) -> Self {
        if config.credits_per_minute > 0.0 {
            let rate = config.credits_per_minute;
            if rate >= 1.0 {
                Self::Whole(rate.floor() as i64)
            } else {
                Self::EveryNth((1.0 / rate).ceil() as i64)
            }
        } else if let Some(minutes_per_credit) = config.minutes_per_credit.filter(|m| *m > 0.0) {
            if minutes_per_credit <= 1.0 {
                Self::Whole((1.0 / minutes_per_credit).floor() as i64)
            } else {
                Self::EveryNth(minutes_per_credit.ceil() as i64)
            }
        } else {
            Self::Whole(1)
        }
    }
}

/// Credits for the tick that brought the user to `minutes_afk`.
///
/// Fractional rates pay on ticks where `minutes_afk` is a multiple of the
/// period, so a skipped tick shifts which wall-clock minute pays.
pub fn tick_award(minutes_afk: i64, config: &RewardConfig) -> i64 {
    match TickRate::from_config(config) {
        TickRate::Whole(credits) => credits.max(0),
        TickRate::EveryNth(period) if period > 0 && minutes_afk % period == 0 => 1,
        TickRate::EveryNth(_) => 0,
    }
}

/// Whether a tick at `now` passes the per-user debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Accept,
    TooSoon { retry_after_seconds: i64 },
}

/// At most one accepted tick per `min_interval_seconds` window.
///
/// `last_seen_afk` and `now` are unix seconds. A clock that moved backwards
/// is treated as "too soon" until it catches up.
pub const fn tick_decision(last_seen_afk: i64, now: i64, min_interval_seconds: i64) -> TickDecision {
    if last_seen_afk < LAST_SEEN_CUTOFF {
        return TickDecision::Accept;
    }
    let since = now - last_seen_afk;
    if since < min_interval_seconds {
        let wait = min_interval_seconds - since;
        let retry_after_seconds = if wait < min_interval_seconds {
            wait
        } else {
            min_interval_seconds
        };
        return TickDecision::TooSoon {
            retry_after_seconds,
        };
    }
    TickDecision::Accept
}

/// Recomputed view of an active session at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    /// Seconds since start, capped at `max_session_duration_seconds`.
    pub time_elapsed: i64,
    /// Total credits implied by `time_elapsed`; never below the stored snapshot.
    pub total_credits_earned: i64,
    /// `total_credits_earned - credits_claimed`, floored at zero.
    pub unclaimed_credits: i64,
    /// Wall-clock seconds since the last claim, or since start if none.
    pub seconds_since_reference: i64,
    /// Accruing seconds since the last claim (or start), within the duration cap.
    pub accrual_window_seconds: i64,
    pub next_reward_in: Option<i64>,
    pub duration_capped: bool,
}

/// Recomputes elapsed time and credits for `session` at `now`.
pub fn session_progress(
    session: &Session,
    config: &RewardConfig,
    now: DateTime<Utc>,
) -> SessionProgress {
    let raw_elapsed = now
        .signed_duration_since(session.started_at)
        .num_seconds()
        .max(0);
    let (time_elapsed, duration_capped) = match config.max_session_duration_seconds {
        Some(max) if raw_elapsed >= max => (max, true),
        _ => (raw_elapsed, false),
    };

    let total_credits_earned = compute_credits(time_elapsed, config).max(session.credits_earned);
    let unclaimed_credits = (total_credits_earned - session.credits_claimed).max(0);

    let reference = session.last_claim_at.unwrap_or(session.started_at);
    let seconds_since_reference = now.signed_duration_since(reference).num_seconds().max(0);
    let reference_offset = reference
        .signed_duration_since(session.started_at)
        .num_seconds()
        .max(0);
    let accrual_window_seconds = (time_elapsed - reference_offset).max(0);

    SessionProgress {
        time_elapsed,
        total_credits_earned,
        unclaimed_credits,
        seconds_since_reference,
        accrual_window_seconds,
        next_reward_in: next_reward_in(seconds_since_reference, config.reward_interval_seconds),
        duration_capped,
    }
}
