//! Accrual endpoints: work ticks and the session lifecycle.

use std::io::Write;

use afk_engine::{ApiResponse, Engine};
use anyhow::Result;
use chrono::{DateTime, Utc};

use super::util::print_response;

/// One accrual endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Work,
    Start,
    Stop,
    Claim,
    Accrue,
    Status,
    SessionStatus,
}

/// Runs `action` for `user` at `now`, printing the response envelope.
///
/// Returns whether the request succeeded.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &mut Engine,
    action: Action,
    user: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    match action {
        Action::Work => print_response(writer, &ApiResponse::from_result(engine.work_at(user, now))),
        Action::Start => print_response(writer, &ApiResponse::from_result(engine.start_at(user, now))),
        Action::Stop => print_response(writer, &ApiResponse::from_result(engine.stop_at(user, now))),
        Action::Claim => print_response(writer, &ApiResponse::from_result(engine.claim_at(user, now))),
        Action::Accrue => {
            print_response(writer, &ApiResponse::from_result(engine.accrue_at(user, now)))
        }
        Action::Status => {
            print_response(writer, &ApiResponse::from_result(engine.status_at(user, now)))
        }
        Action::SessionStatus => print_response(
            writer,
            &ApiResponse::from_result(engine.session_status_at(user, now)),
        ),
    }
}
