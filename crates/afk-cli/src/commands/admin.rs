//! Admin endpoints: plugin-wide statistics and reward settings.

use std::io::Write;

use afk_engine::{ApiResponse, Engine};
use anyhow::Result;
use chrono::{DateTime, Utc};

use super::util::print_response;

pub fn stats<W: Write>(writer: &mut W, engine: &Engine, now: DateTime<Utc>) -> Result<bool> {
    print_response(writer, &ApiResponse::from_result(engine.admin_stats_at(now)))
}

pub fn show_config<W: Write>(writer: &mut W, engine: &Engine) -> Result<bool> {
    print_response(writer, &ApiResponse::from_result(engine.config()))
}

pub fn set_config<W: Write>(writer: &mut W, engine: &Engine, key: &str, value: &str) -> Result<bool> {
    print_response(
        writer,
        &ApiResponse::from_result(engine.update_config(key, value)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{at, engine};

    fn json(out: &[u8]) -> serde_json::Value {
        serde_json::from_slice(out).unwrap()
    }

    #[test]
    fn set_then_show_config() {
        let engine = engine();
        let mut out = Vec::new();
        assert!(set_config(&mut out, &engine, "credits_per_minute", " 2.5 ").unwrap());
        let set = json(&out);
        assert_eq!(set["data"]["key"], "credits_per_minute");
        assert_eq!(set["data"]["value"], "2.5");

        let mut out = Vec::new();
        assert!(show_config(&mut out, &engine).unwrap());
        assert_eq!(json(&out)["data"]["credits_per_minute"], 2.5);
    }

    #[test]
    fn invalid_setting_is_rejected() {
        let engine = engine();
        let mut out = Vec::new();
        assert!(!set_config(&mut out, &engine, "accrual_mode", "hourly").unwrap());
        let body = json(&out);
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[test]
    fn stats_on_empty_database() {
        let engine = engine();
        let mut out = Vec::new();
        assert!(stats(&mut out, &engine, at(0)).unwrap());
        let body = json(&out);
        assert_eq!(body["data"]["users_tracked"], 0);
        assert_eq!(body["data"]["formatted_credits_earned"], "0 credits");
        assert_eq!(body["data"]["today"]["date"], "2026-03-01");
    }
}
