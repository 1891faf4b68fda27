//! Observability port for non-fatal accrual events.
//!
//! Components report things worth watching (a ledger refusing credits, an
//! award clamped by a daily cap) through an injected [`EventSink`] instead of
//! a global logger. [`TracingSink`] forwards everything to `tracing`.

use serde::Serialize;

use crate::types::{ErrorCode, UserId};

/// Something the accrual engine did or declined to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccrualEvent {
    TickAccepted {
        user_id: UserId,
        minutes_afk: i64,
    },
    TickRejected {
        user_id: UserId,
        retry_after_seconds: i64,
    },
    CreditsAwarded {
        user_id: UserId,
        credits: i64,
    },
    /// A computed award was reduced (possibly to zero) by a daily limit.
    AwardLimited {
        user_id: UserId,
        reason: ErrorCode,
        requested: i64,
        granted: i64,
    },
    LedgerAddFailed {
        user_id: UserId,
        credits: i64,
    },
    UsageRecordFailed {
        user_id: UserId,
        message: String,
    },
    SessionStarted {
        user_id: UserId,
        session_id: String,
    },
    SessionStopped {
        user_id: UserId,
        session_id: String,
        forfeited_credits: i64,
    },
    ClaimCommitted {
        user_id: UserId,
        session_id: String,
        credits: i64,
        credits_claimed: i64,
    },
}

/// Receives [`AccrualEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AccrualEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AccrualEvent) {
        match event {
            AccrualEvent::TickAccepted {
                user_id,
                minutes_afk,
            } => tracing::debug!(%user_id, minutes_afk, "tick accepted"),
            AccrualEvent::TickRejected {
                user_id,
                retry_after_seconds,
            } => tracing::debug!(%user_id, retry_after_seconds, "tick rejected"),
            AccrualEvent::CreditsAwarded { user_id, credits } => {
                tracing::info!(%user_id, credits, "credits awarded");
            }
            AccrualEvent::AwardLimited {
                user_id,
                reason,
                requested,
                granted,
            } => tracing::info!(%user_id, %reason, requested, granted, "award limited"),
            AccrualEvent::LedgerAddFailed { user_id, credits } => {
                tracing::warn!(%user_id, credits, "credits ledger refused award");
            }
            AccrualEvent::UsageRecordFailed { user_id, message } => {
                tracing::error!(%user_id, %message, "failed to record usage");
            }
            AccrualEvent::SessionStarted {
                user_id,
                session_id,
            } => tracing::info!(%user_id, %session_id, "session started"),
            AccrualEvent::SessionStopped {
                user_id,
                session_id,
                forfeited_credits,
            } => tracing::info!(%user_id, %session_id, forfeited_credits, "session stopped"),
            AccrualEvent::ClaimCommitted {
                user_id,
                session_id,
                credits,
                credits_claimed,
            } => tracing::info!(%user_id, %session_id, credits, credits_claimed, "claim committed"),
        }
    }
}
