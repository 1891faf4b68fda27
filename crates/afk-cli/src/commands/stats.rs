//! User statistics, as JSON or a text summary.

use std::io::Write;

use afk_engine::{ApiResponse, Engine, LimitStatus, UserReport};
use anyhow::Result;
use chrono::{DateTime, Utc};

use super::util::{format_duration, print_response};

pub fn run<W: Write>(
    writer: &mut W,
    engine: &mut Engine,
    user: i64,
    now: DateTime<Utc>,
    text: bool,
) -> Result<bool> {
    match engine.user_stats_at(user, now) {
        Ok(report) if text => {
            writeln!(writer, "{}", render_text(&report))?;
            Ok(true)
        }
        result => print_response(writer, &ApiResponse::from_result(result)),
    }
}

fn render_limit(name: &str, status: &LimitStatus, render: impl Fn(i64) -> String) -> String {
    match (status.limit, status.remaining) {
        (Some(limit), Some(remaining)) => format!(
            "{name} {}/{} ({} left)",
            render(status.used),
            render(limit),
            render(remaining)
        ),
        _ => format!("{name} {} (unlimited)", render(status.used)),
    }
}

/// Human-readable summary of a [`UserReport`].
pub fn render_text(report: &UserReport) -> String {
    let stats = &report.stats;
    let mut lines = vec![
        format!("User {} ({} mode)", report.user_id, report.accrual_mode),
        format!(
            "Balance: {}",
            report.formatted_balance.as_deref().unwrap_or("unavailable")
        ),
        format!(
            "AFK time: {} ({} ticks)",
            format_duration(stats.total_time_seconds),
            stats.minutes_afk
        ),
        format!("Credits earned: {}", stats.total_credits_earned),
        format!("Sessions: {}", stats.sessions_count),
        format!(
            "Today ({}): {} credits, {} sessions, {}",
            report.today.date,
            report.today.credits_earned,
            report.today.sessions_count,
            format_duration(report.today.time_seconds)
        ),
        format!(
            "Limits: {}; {}; {}",
            render_limit("credits", &report.limits.credits, |n| n.to_string()),
            render_limit("sessions", &report.limits.sessions, |n| n.to_string()),
            render_limit("time", &report.limits.time_seconds, format_duration),
        ),
    ];
    lines.push(match &report.active_session {
        Some(session) => format!(
            "Active session: {} since {} ({} claimed)",
            session.id,
            session.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            session.credits_claimed
        ),
        None => "Active session: none".to_string(),
    });

    lines.join("\n")
}
