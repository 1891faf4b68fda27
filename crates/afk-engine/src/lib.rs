//! Credit award orchestration for the AFK credits plugin.
//!
//! Two accrual models sit behind [`AccrualStrategy`]:
//! - [`TickAccrual`]: one debounced `work` tick per minute of presence
//! - [`SessionAccrual`]: explicit sessions with start, claim and stop
//!
//! [`Engine`] is the request-level entry point. It validates the user,
//! resolves the configuration once and hands a [`RequestContext`] to the
//! strategy. Results are wrapped for the wire by [`ApiResponse`].

mod context;
mod engine;
mod error;
mod ledger;
mod response;
mod session;
mod stats;
mod strategy;
mod tick;

#[cfg(test)]
mod testing;

pub use context::{Ports, RequestContext};
pub use engine::{ConfigUpdate, Engine};
pub use error::EngineError;
pub use ledger::DailyUsageLedger;
pub use response::{ApiResponse, ErrorBody};
pub use session::{
    ClaimOutcome, ClaimPlan, SessionAccrual, SessionStarted, SessionStatus, SessionStopped,
    plan_claim,
};
pub use stats::{AdminStats, DailyLimits, LimitStatus, TodayTotals, UserReport, user_report};
pub use strategy::{AccrualReport, AccrualStrategy, StatusReport, strategy_for};
pub use tick::{TickAccrual, TickStatus, WorkOutcome};
