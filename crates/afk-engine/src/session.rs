//! Explicit sessions: start, accrue by elapsed time, claim, stop.
//!
//! Every mutation re-reads the active session inside [`afk_db::Database::locked`],
//! so duplicate requests serialize on the lock and the loser sees the
//! winner's `credits_claimed`.

use afk_core::{
    AccrualEvent, AccrualMode, DailyUsage, ErrorCode, LimitCheck, RewardConfig, Session,
    SessionProgress, check_limits, compute_credits, remaining_daily_credits, session_progress,
};
use afk_db::{DbError, new_session_id};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::EngineError;
use crate::ledger::DailyUsageLedger;
use crate::strategy::{AccrualReport, AccrualStrategy, StatusReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStarted {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub reward_interval_seconds: i64,
    pub require_claim: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStopped {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub time_elapsed: i64,
    pub total_credits_earned: i64,
    pub credits_claimed: i64,
    /// Accrued but unclaimed credits lost by stopping.
    pub forfeited_credits: i64,
}

/// Current view of a user's session, recomputed at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub is_enabled: bool,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub time_elapsed: i64,
    /// Unclaimed credits.
    pub credits_earned: i64,
    pub total_credits_earned: i64,
    pub credits_claimed: i64,
    pub next_reward_in: Option<i64>,
    pub can_claim: bool,
    pub duration_capped: bool,
    pub require_claim: bool,
    pub auto_claim_interval_seconds: Option<i64>,
    pub reward_interval_seconds: i64,
}

impl SessionStatus {
    fn inactive(config: &RewardConfig) -> Self {
        Self {
            active: false,
            is_enabled: config.is_enabled,
            session_id: None,
            started_at: None,
            time_elapsed: 0,
            credits_earned: 0,
            total_credits_earned: 0,
            credits_claimed: 0,
            next_reward_in: None,
            can_claim: false,
            duration_capped: false,
            require_claim: config.require_claim,
            auto_claim_interval_seconds: config.auto_claim_interval_seconds,
            reward_interval_seconds: config.reward_interval_seconds,
        }
    }

    fn active(session: &Session, progress: &SessionProgress, config: &RewardConfig) -> Self {
        Self {
            active: true,
            session_id: Some(session.id.clone()),
            started_at: Some(session.started_at),
            time_elapsed: progress.time_elapsed,
            credits_earned: progress.unclaimed_credits,
            total_credits_earned: progress.total_credits_earned,
            credits_claimed: session.credits_claimed,
            next_reward_in: progress.next_reward_in,
            can_claim: progress.unclaimed_credits > 0
                && progress.seconds_since_reference >= config.reward_interval_seconds,
            duration_capped: progress.duration_capped,
            ..Self::inactive(config)
        }
    }
}

/// A committed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub session_id: String,
    /// Credits moved to the ledger by this claim.
    pub credits_claimed: i64,
    /// Session total claimed so far, this claim included.
    pub total_claimed: i64,
    pub total_credits_earned: i64,
    pub remaining_unclaimed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_reason: Option<ErrorCode>,
    pub balance: Option<i64>,
    pub formatted_balance: Option<String>,
}

/// What a claim at a given instant would pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPlan {
    /// Credits to move, after daily clamping.
    pub credits: i64,
    /// Credits eligible before daily clamping.
    pub requested: i64,
    pub progress: SessionProgress,
}

/// Decides what a claim on `session` at `now` may pay, without side effects.
///
/// Checks in order: unclaimed credits exist, claim spacing, then daily limits.
/// The eligible amount is what accrued since the last claim (or start),
/// bounded by the unclaimed balance and the remaining daily credit headroom.
pub fn plan_claim(
    session: &Session,
    usage: &DailyUsage,
    config: &RewardConfig,
    now: DateTime<Utc>,
) -> Result<ClaimPlan, EngineError> {
    let progress = session_progress(session, config, now);
    let no_credits = || EngineError::NoCredits {
        total_earned: progress.total_credits_earned,
        claimed: session.credits_claimed,
    };
    if progress.unclaimed_credits <= 0 {
        return Err(no_credits());
    }

    let interval_seconds = config.reward_interval_seconds;
    if progress.seconds_since_reference < interval_seconds {
        return Err(EngineError::ClaimTooSoon {
            retry_after_seconds: interval_seconds - progress.seconds_since_reference,
            interval_seconds,
        });
    }

    let requested =
        compute_credits(progress.accrual_window_seconds, config).min(progress.unclaimed_credits);
    if requested <= 0 {
        return Err(no_credits());
    }

    if let LimitCheck::Blocked(violation) = check_limits(usage, config) {
        return Err(EngineError::DailyLimit(violation));
    }
    let credits = remaining_daily_credits(usage, config)
        .map_or(requested, |remaining| remaining.min(requested));

    Ok(ClaimPlan {
        credits,
        requested,
        progress,
    })
}

/// Explicit-session strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAccrual;

impl SessionAccrual {
    pub fn start(&self, cx: &mut RequestContext<'_>) -> Result<SessionStarted, EngineError> {
        let (config, user, now, today) = (cx.config, cx.user, cx.now, cx.today());
        if !config.is_enabled {
            return Err(EngineError::Disabled);
        }

        let session = cx.db.locked(|tx| -> Result<Session, EngineError> {
            if let Some(active) = tx.active_session(user)? {
                return Err(EngineError::AlreadyActive {
                    session_id: active.id,
                });
            }
            let usage = tx.daily_usage(user, today)?;
            if let LimitCheck::Blocked(violation) = check_limits(&usage, config) {
                return Err(EngineError::DailyLimit(violation));
            }
            let session = Session::start(new_session_id(), user, now);
            tx.insert_session(&session)?;
            Ok(session)
        })?;

        cx.emit(&AccrualEvent::SessionStarted {
            user_id: user,
            session_id: session.id.clone(),
        });
        Ok(SessionStarted {
            session_id: session.id,
            started_at: session.started_at,
            reward_interval_seconds: config.reward_interval_seconds,
            require_claim: config.require_claim,
        })
    }

    /// Recomputes the active session and writes the snapshot back if it moved.
    pub fn session_status(&self, cx: &mut RequestContext<'_>) -> Result<SessionStatus, EngineError> {
        let (config, user, now) = (cx.config, cx.user, cx.now);
        let Some(session) = cx.db.active_session(user)? else {
            return Ok(SessionStatus::inactive(config));
        };

        let progress = session_progress(&session, config, now);
        if progress.total_credits_earned != session.credits_earned
            || progress.time_elapsed != session.time_elapsed
        {
            cx.db.locked(|tx| {
                tx.update_session_progress(
                    &session.id,
                    progress.total_credits_earned,
                    progress.time_elapsed,
                )
            })?;
        }
        Ok(SessionStatus::active(&session, &progress, config))
    }

    /// Moves credits accrued since the last claim into the ledger.
    ///
    /// The plan is computed once without the lock to reject cheaply, then
    /// again under the lock against fresh rows. The claim and its counters
    /// commit before the ledger is paid; a ledger refusal reverts them.
    pub fn claim(&self, cx: &mut RequestContext<'_>) -> Result<ClaimOutcome, EngineError> {
        let (config, user, now, today) = (cx.config, cx.user, cx.now, cx.today());
        if !config.is_enabled {
            return Err(EngineError::Disabled);
        }

        let session = cx
            .db
            .active_session(user)?
            .ok_or(EngineError::NoActiveSession)?;
        let usage = DailyUsageLedger::new(cx.db).get_or_create(user, today)?;
        plan_claim(&session, &usage, config, now)?;

        let (outcome, plan, previous_claim_at) = cx.db.locked(|tx| -> Result<_, EngineError> {
            let session = tx
                .active_session(user)?
                .ok_or(EngineError::NoActiveSession)?;
            let usage = tx.daily_usage(user, today)?;
            let plan = plan_claim(&session, &usage, config, now)?;
            let total_claimed = session.credits_claimed.saturating_add(plan.credits);

            tx.record_claim(
                &session.id,
                total_claimed,
                plan.progress.total_credits_earned,
                plan.progress.time_elapsed,
                now,
            )?;
            let window = plan.progress.accrual_window_seconds;
            tx.add_daily_usage(user, today, plan.credits, window, 1)?;
            // sessions_count counts claims, not session lifecycles.
            tx.add_user_totals(user, plan.credits, window, 1, now)?;

            let outcome = ClaimOutcome {
                session_id: session.id,
                credits_claimed: plan.credits,
                total_claimed,
                total_credits_earned: plan.progress.total_credits_earned,
                remaining_unclaimed: (plan.progress.total_credits_earned - total_claimed).max(0),
                limit_reason: (plan.credits < plan.requested).then_some(ErrorCode::DailyCreditsLimit),
                balance: None,
                formatted_balance: None,
            };
            Ok((outcome, plan, session.last_claim_at))
        })?;

        if !cx.ports.ledger.add_credits(user, plan.credits) {
            cx.emit(&AccrualEvent::LedgerAddFailed {
                user_id: user,
                credits: plan.credits,
            });
            let window = plan.progress.accrual_window_seconds;
            let reverted = cx.db.locked(|tx| -> Result<(), DbError> {
                tx.revert_claim(&outcome.session_id, plan.credits, now, previous_claim_at)?;
                tx.reverse_award(user, today, plan.credits, window, 1, now)
            });
            if let Err(err) = reverted {
                tracing::error!(
                    %user,
                    session_id = %outcome.session_id,
                    credits = plan.credits,
                    error = %err,
                    "failed to revert unpaid claim"
                );
                cx.emit(&AccrualEvent::UsageRecordFailed {
                    user_id: user,
                    message: err.to_string(),
                });
            }
            return Err(EngineError::LedgerUnavailable {
                credits: plan.credits,
            });
        }

        if plan.credits < plan.requested {
            cx.emit(&AccrualEvent::AwardLimited {
                user_id: user,
                reason: ErrorCode::DailyCreditsLimit,
                requested: plan.requested,
                granted: plan.credits,
            });
        }
        cx.emit(&AccrualEvent::ClaimCommitted {
            user_id: user,
            session_id: outcome.session_id.clone(),
            credits: outcome.credits_claimed,
            credits_claimed: outcome.total_claimed,
        });

        let balance = cx.ports.balance(user);
        Ok(ClaimOutcome {
            formatted_balance: balance.map(|balance| cx.ports.formatter.format(balance)),
            balance,
            ..outcome
        })
    }

    /// Ends the active session. Unclaimed credits are forfeited.
    pub fn stop(&self, cx: &mut RequestContext<'_>) -> Result<SessionStopped, EngineError> {
        let (config, user, now) = (cx.config, cx.user, cx.now);
        let (session, progress) = cx.db.locked(|tx| -> Result<_, EngineError> {
            let session = tx
                .active_session(user)?
                .ok_or(EngineError::NoActiveSession)?;
            let progress = session_progress(&session, config, now);
            tx.stop_session(
                &session.id,
                now,
                progress.total_credits_earned,
                progress.time_elapsed,
            )?;
            Ok((session, progress))
        })?;

        cx.emit(&AccrualEvent::SessionStopped {
            user_id: user,
            session_id: session.id.clone(),
            forfeited_credits: progress.unclaimed_credits,
        });
        Ok(SessionStopped {
            session_id: session.id,
            started_at: session.started_at,
            stopped_at: now,
            time_elapsed: progress.time_elapsed,
            total_credits_earned: progress.total_credits_earned,
            credits_claimed: session.credits_claimed,
            forfeited_credits: progress.unclaimed_credits,
        })
    }
}

impl AccrualStrategy for SessionAccrual {
    fn mode(&self) -> AccrualMode {
        AccrualMode::Session
    }

    fn accrue(&self, cx: &mut RequestContext<'_>) -> Result<AccrualReport, EngineError> {
        self.claim(cx).map(AccrualReport::Session)
    }

    fn status(&self, cx: &mut RequestContext<'_>) -> Result<StatusReport, EngineError> {
        self.session_status(cx).map(StatusReport::Session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestBed, at};
    use afk_core::{DailyLimit, LimitViolation, UserId};
    use chrono::NaiveDate;

    fn session_at(secs: i64) -> Session {
        Session::start("s-1".to_string(), UserId::new(1).unwrap(), at(secs))
    }

    fn usage(credits: i64) -> DailyUsage {
        DailyUsage {
            credits_earned: credits,
            ..DailyUsage::empty(
                UserId::new(1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            )
        }
    }

    #[test]
    fn plan_pays_credits_since_start() {
        let plan = plan_claim(&session_at(0), &usage(0), &RewardConfig::default(), at(125)).unwrap();
        assert_eq!(plan.credits, 2);
        assert_eq!(plan.requested, 2);
        assert_eq!(plan.progress.accrual_window_seconds, 125);
    }

    #[test]
    fn plan_rejects_before_first_interval() {
        let err = plan_claim(&session_at(0), &usage(0), &RewardConfig::default(), at(30))
            .unwrap_err();
        assert!(matches!(err, EngineError::NoCredits { .. }));

        let slow = RewardConfig {
            credits_per_minute: 2.0,
            reward_interval_seconds: 120,
            ..RewardConfig::default()
        };
        let err = plan_claim(&session_at(0), &usage(0), &slow, at(90)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ClaimTooSoon {
                retry_after_seconds: 30,
                interval_seconds: 120
            }
        ));
    }

    #[test]
    fn plan_counts_only_window_since_last_claim() {
        let mut session = session_at(0);
        session.credits_earned = 2;
        session.credits_claimed = 2;
        session.last_claim_at = Some(at(125));

        let err = plan_claim(&session, &usage(0), &RewardConfig::default(), at(130)).unwrap_err();
        assert!(matches!(err, EngineError::NoCredits { .. }));

        // 245s in: 4 earned, 2 unclaimed, window of 120s
        let plan = plan_claim(&session, &usage(0), &RewardConfig::default(), at(245)).unwrap();
        assert_eq!(plan.credits, 2);
    }

    #[test]
    fn plan_clamps_to_daily_headroom() {
        let config = RewardConfig {
            max_credits_per_day: Some(5),
            ..RewardConfig::default()
        };
        let plan = plan_claim(&session_at(0), &usage(4), &config, at(300)).unwrap();
        assert_eq!(plan.requested, 5);
        assert_eq!(plan.credits, 1);

        let err = plan_claim(&session_at(0), &usage(5), &config, at(300)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DailyLimit(LimitViolation {
                limit_kind: DailyLimit::Credits,
                current: 5,
                limit: 5
            })
        ));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut bed = TestBed::new(RewardConfig::default());
        let started = bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();

        let err = bed.with_cx(at(5), |cx| SessionAccrual.start(cx)).unwrap_err();
        match err {
            EngineError::AlreadyActive { session_id } => assert_eq!(session_id, started.session_id),
            other => panic!("expected AlreadyActive, got {other:?}"),
        }
    }

    #[test]
    fn start_blocked_by_daily_session_limit() {
        let mut bed = TestBed::new(RewardConfig {
            max_sessions_per_day: Some(1),
            ..RewardConfig::default()
        });
        bed.db
            .record_usage(bed.user, at(0).date_naive(), 0, 0, true)
            .unwrap();

        let err = bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DailySessionsLimit);
        assert!(bed.db.active_session(bed.user).unwrap().is_none());
    }

    #[test]
    fn status_recomputes_and_writes_back() {
        let mut bed = TestBed::new(RewardConfig::default());
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();

        let status = bed
            .with_cx(at(125), |cx| SessionAccrual.session_status(cx))
            .unwrap();
        assert!(status.active);
        assert_eq!(status.time_elapsed, 125);
        assert_eq!(status.credits_earned, 2);
        assert_eq!(status.next_reward_in, Some(55));
        assert!(status.can_claim);
        assert!(status.require_claim);

        let stored = bed.db.active_session(bed.user).unwrap().unwrap();
        assert_eq!(stored.credits_earned, 2);
        assert_eq!(stored.time_elapsed, 125);
    }

    #[test]
    fn status_without_session_is_inactive() {
        let mut bed = TestBed::new(RewardConfig::default());
        let status = bed
            .with_cx(at(0), |cx| SessionAccrual.session_status(cx))
            .unwrap();
        assert!(!status.active);
        assert!(!status.can_claim);
        assert_eq!(status.session_id, None);
    }

    #[test]
    fn duration_cap_freezes_credits() {
        let mut bed = TestBed::new(RewardConfig {
            max_session_duration_seconds: Some(120),
            ..RewardConfig::default()
        });
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();
        let status = bed
            .with_cx(at(600), |cx| SessionAccrual.session_status(cx))
            .unwrap();
        assert!(status.duration_capped);
        assert_eq!(status.time_elapsed, 120);
        assert_eq!(status.total_credits_earned, 2);
    }

    #[test]
    fn claim_moves_credits_to_ledger() {
        let mut bed = TestBed::new(RewardConfig::default());
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();

        let outcome = bed.with_cx(at(125), |cx| SessionAccrual.claim(cx)).unwrap();
        assert_eq!(outcome.credits_claimed, 2);
        assert_eq!(outcome.total_claimed, 2);
        assert_eq!(outcome.balance, Some(2));
        assert_eq!(outcome.formatted_balance.as_deref(), Some("2 credits"));

        let today = bed.db.daily_usage(bed.user, at(0).date_naive()).unwrap().unwrap();
        assert_eq!(today.credits_earned, 2);
        assert_eq!(today.time_seconds, 125);
    }

    #[test]
    fn each_claim_counts_as_a_session() {
        let mut bed = TestBed::new(RewardConfig::default());
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();
        bed.with_cx(at(60), |cx| SessionAccrual.claim(cx)).unwrap();
        bed.with_cx(at(120), |cx| SessionAccrual.claim(cx)).unwrap();

        // One session lifecycle, two claims: the counter follows claims.
        let stats = bed.db.user_stats(bed.user).unwrap().unwrap();
        assert_eq!(stats.sessions_count, 2);
        assert_eq!(stats.total_credits_earned, 2);
    }

    #[test]
    fn ledger_refusal_rolls_claim_back() {
        let mut bed = TestBed::new(RewardConfig::default()).with_unregistered_user();
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();

        let err = bed.with_cx(at(125), |cx| SessionAccrual.claim(cx)).unwrap_err();
        assert!(matches!(err, EngineError::LedgerUnavailable { credits: 2 }));

        let session = bed.db.active_session(bed.user).unwrap().unwrap();
        assert_eq!(session.credits_claimed, 0);
        assert_eq!(session.last_claim_at, None);
        let stats = bed.db.user_stats(bed.user).unwrap().unwrap();
        assert_eq!(
            (stats.total_credits_earned, stats.total_time_seconds, stats.sessions_count),
            (0, 0, 0)
        );
        let today = bed.db.daily_usage(bed.user, at(0).date_naive()).unwrap().unwrap();
        assert_eq!(
            (today.credits_earned, today.time_seconds, today.sessions_count),
            (0, 0, 0)
        );
        assert!(bed.events().iter().any(|event| matches!(
            event,
            AccrualEvent::LedgerAddFailed { credits: 2, .. }
        )));
        assert!(!bed
            .events()
            .iter()
            .any(|event| matches!(event, AccrualEvent::ClaimCommitted { .. })));
    }

    #[test]
    fn stop_forfeits_unclaimed_credits() {
        let mut bed = TestBed::new(RewardConfig::default());
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();
        bed.with_cx(at(60), |cx| SessionAccrual.claim(cx)).unwrap();

        let stopped = bed.with_cx(at(200), |cx| SessionAccrual.stop(cx)).unwrap();
        assert_eq!(stopped.total_credits_earned, 3);
        assert_eq!(stopped.credits_claimed, 1);
        assert_eq!(stopped.forfeited_credits, 2);

        let err = bed.with_cx(at(260), |cx| SessionAccrual.claim(cx)).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveSession));
        let err = bed.with_cx(at(260), |cx| SessionAccrual.stop(cx)).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveSession));
    }

    #[test]
    fn stop_ignores_disabled_flag() {
        let mut bed = TestBed::new(RewardConfig::default());
        bed.with_cx(at(0), |cx| SessionAccrual.start(cx)).unwrap();
        bed.config.is_enabled = false;

        assert!(bed.with_cx(at(10), |cx| SessionAccrual.stop(cx)).is_ok());
    }
}
