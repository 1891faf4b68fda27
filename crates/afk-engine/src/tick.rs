//! Session-less accrual: one debounced tick per minute of presence.

use afk_core::{
    AccrualEvent, AccrualMode, DailyUsage, ErrorCode, LimitCheck, RewardConfig,
    TICK_WIDTH_SECONDS, TickDecision, TickOutcome, TickRate, UserStats, check_limits,
    remaining_daily_credits, tick_award, tick_decision,
};
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::EngineError;
use crate::strategy::{AccrualReport, AccrualStrategy, StatusReport};

/// Result of an accepted `work` tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkOutcome {
    pub credits_awarded: i64,
    /// Ledger balance after the award, if the ledger could be read.
    pub total_credits: Option<i64>,
    pub formatted_total: Option<String>,
    /// Accepted ticks so far, in minutes.
    pub total_afk_time: i64,
    /// Set when a daily limit reduced the computed award.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_reason: Option<ErrorCode>,
    pub next_tick_in: i64,
}

/// Tick-mode view of a user's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickStatus {
    pub is_enabled: bool,
    pub minutes_afk: i64,
    pub total_time_seconds: i64,
    pub total_credits_earned: i64,
    pub rate: TickRate,
    /// Zero when a tick would be accepted now.
    pub next_tick_in: i64,
    pub today: DailyUsage,
}

/// Periodic-tick strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickAccrual;

impl TickAccrual {
    /// Counts one minute of presence and pays the per-tick award.
    ///
    /// The tick, the daily-cap check and the counter updates commit as one
    /// locked unit; the ledger is paid after that commit. Time always accrues
    /// for an accepted tick, even when the award is zero or the ledger
    /// refuses it, in which case the credit counters are taken back.
    pub fn work(&self, cx: &mut RequestContext<'_>) -> Result<WorkOutcome, EngineError> {
        let (config, user, now, today) = (cx.config, cx.user, cx.now, cx.today());
        if !config.is_enabled {
            return Err(EngineError::Disabled);
        }

        let min_interval_seconds = config.reward_interval_seconds;
        let committed = cx.db.locked(|tx| -> Result<_, EngineError> {
            let stats = match tx.tick(user, min_interval_seconds, now)? {
                TickOutcome::Accepted(stats) => stats,
                TickOutcome::TooSoon {
                    retry_after_seconds,
                    ..
                } => return Ok(Err(retry_after_seconds)),
            };

            let requested = tick_award(stats.minutes_afk, config);
            let (award, limit_reason) = if requested > 0 {
                clamp_award(requested, &tx.daily_usage(user, today)?, config)
            } else {
                (0, None)
            };
            tx.add_daily_usage(user, today, award, TICK_WIDTH_SECONDS, 0)?;
            tx.add_user_totals(user, award, TICK_WIDTH_SECONDS, 0, now)?;
            Ok(Ok((stats, requested, award, limit_reason)))
        })?;

        let (stats, requested, award, limit_reason) = match committed {
            Ok(committed) => committed,
            Err(retry_after_seconds) => {
                cx.emit(&AccrualEvent::TickRejected {
                    user_id: user,
                    retry_after_seconds,
                });
                return Err(EngineError::RateLimited {
                    retry_after_seconds,
                    min_interval_seconds,
                });
            }
        };
        cx.emit(&AccrualEvent::TickAccepted {
            user_id: user,
            minutes_afk: stats.minutes_afk,
        });
        if let Some(reason) = limit_reason {
            cx.emit(&AccrualEvent::AwardLimited {
                user_id: user,
                reason,
                requested,
                granted: award,
            });
        }

        let credited = if award <= 0 {
            0
        } else if cx.ports.ledger.add_credits(user, award) {
            cx.emit(&AccrualEvent::CreditsAwarded {
                user_id: user,
                credits: award,
            });
            award
        } else {
            cx.emit(&AccrualEvent::LedgerAddFailed {
                user_id: user,
                credits: award,
            });
            let reversed = cx
                .db
                .locked(|tx| tx.reverse_award(user, today, award, 0, 0, now));
            if let Err(err) = reversed {
                tracing::error!(%user, credits = award, error = %err, "failed to reverse unpaid tick award");
                cx.emit(&AccrualEvent::UsageRecordFailed {
                    user_id: user,
                    message: err.to_string(),
                });
            }
            0
        };

        let total_credits = cx.ports.balance(user);
        Ok(WorkOutcome {
            credits_awarded: credited,
            formatted_total: total_credits.map(|balance| cx.ports.formatter.format(balance)),
            total_credits,
            total_afk_time: stats.minutes_afk,
            limit_reason,
            next_tick_in: min_interval_seconds,
        })
    }

    /// Read-only progress; never locks.
    pub fn progress(&self, cx: &RequestContext<'_>) -> Result<TickStatus, EngineError> {
        let (config, user, today) = (cx.config, cx.user, cx.today());
        let stats = cx
            .db
            .user_stats(user)?
            .unwrap_or_else(|| UserStats::empty(user));
        let next_tick_in = match tick_decision(
            stats.last_seen_afk,
            cx.now.timestamp(),
            config.reward_interval_seconds,
        ) {
            TickDecision::Accept => 0,
            TickDecision::TooSoon {
                retry_after_seconds,
            } => retry_after_seconds,
        };
        let today = cx
            .db
            .daily_usage(user, today)?
            .unwrap_or_else(|| DailyUsage::empty(user, today));

        Ok(TickStatus {
            is_enabled: config.is_enabled,
            minutes_afk: stats.minutes_afk,
            total_time_seconds: stats.total_time_seconds,
            total_credits_earned: stats.total_credits_earned,
            rate: TickRate::from_config(config),
            next_tick_in,
            today,
        })
    }
}

/// Applies the daily caps to a computed award.
///
/// A reached limit zeroes the award; otherwise it is clamped to the remaining
/// daily credit headroom.
fn clamp_award(
    requested: i64,
    usage: &DailyUsage,
    config: &RewardConfig,
) -> (i64, Option<ErrorCode>) {
    match check_limits(usage, config) {
        LimitCheck::Blocked(violation) => (0, Some(violation.code())),
        LimitCheck::Allowed => match remaining_daily_credits(usage, config) {
            Some(remaining) if remaining < requested => {
                (remaining, Some(ErrorCode::DailyCreditsLimit))
            }
            _ => (requested, None),
        },
    }
}

impl AccrualStrategy for TickAccrual {
    fn mode(&self) -> AccrualMode {
        AccrualMode::Tick
    }

    fn accrue(&self, cx: &mut RequestContext<'_>) -> Result<AccrualReport, EngineError> {
        self.work(cx).map(AccrualReport::Tick)
    }

    fn status(&self, cx: &mut RequestContext<'_>) -> Result<StatusReport, EngineError> {
        self.progress(cx).map(StatusReport::Tick)
    }
}
