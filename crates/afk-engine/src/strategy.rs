//! The two accrual models behind one interface, selected by `accrual_mode`.

use afk_core::AccrualMode;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::EngineError;
use crate::session::{ClaimOutcome, SessionAccrual, SessionStatus};
use crate::tick::{TickAccrual, TickStatus, WorkOutcome};

/// What a strategy-neutral `accrue` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AccrualReport {
    Tick(WorkOutcome),
    Session(ClaimOutcome),
}

/// Strategy-neutral progress view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StatusReport {
    Tick(TickStatus),
    Session(SessionStatus),
}

/// An accrual model: how presence turns into ledger credits.
pub trait AccrualStrategy: Send + Sync {
    fn mode(&self) -> AccrualMode;

    /// Converts presence into credits: a tick, or a claim against the active session.
    fn accrue(&self, cx: &mut RequestContext<'_>) -> Result<AccrualReport, EngineError>;

    fn status(&self, cx: &mut RequestContext<'_>) -> Result<StatusReport, EngineError>;
}

/// The strategy configured for `mode`.
pub fn strategy_for(mode: AccrualMode) -> &'static dyn AccrualStrategy {
    match mode {
        AccrualMode::Tick => &TickAccrual,
        AccrualMode::Session => &SessionAccrual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_matches_mode() {
        for mode in [AccrualMode::Tick, AccrualMode::Session] {
            assert_eq!(strategy_for(mode).mode(), mode);
        }
    }
}
