//! End-to-end tests driving the `afk` binary against on-disk databases.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::{NamedTempFile, TempDir};

fn afk_binary() -> String {
    env!("CARGO_BIN_EXE_afk").to_string()
}

struct Fixture {
    _dir: TempDir,
    config: NamedTempFile,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = NamedTempFile::new().unwrap();
        writeln!(
            config,
            "database_path = {:?}\npanel_database_path = {:?}",
            dir.path().join("data/afk.db"),
            dir.path().join("data/panel.db"),
        )
        .unwrap();
        Self { _dir: dir, config }
    }

    fn config_path(&self) -> &Path {
        self.config.path()
    }

    /// Runs the binary and returns (exit success, parsed stdout).
    fn run(&self, args: &[&str]) -> (bool, serde_json::Value) {
        let output = Command::new(afk_binary())
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run afk");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json = serde_json::from_str(&stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not JSON ({err}): {stdout}\nstderr: {}",
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output.status.success(), json)
    }

    fn run_text(&self, args: &[&str]) -> String {
        let output = Command::new(afk_binary())
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .output()
            .expect("failed to run afk");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}

#[test]
fn tick_flow_with_rate_limit() {
    let fx = Fixture::new();
    let (ok, added) = fx.run(&["user", "add", "1", "--name", "alice"]);
    assert!(ok);
    assert_eq!(added["data"]["user_id"], 1);

    let (ok, first) = fx.run(&["work", "1", "--at", "2026-03-01T12:00:00Z"]);
    assert!(ok);
    assert_eq!(first["data"]["credits_awarded"], 1);

    let (ok, second) = fx.run(&["work", "1", "--at", "2026-03-01T12:00:30Z"]);
    assert!(!ok);
    assert_eq!(second["status"], 429);
    assert_eq!(second["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(second["error"]["retry_after_seconds"], 30);

    let (ok, third) = fx.run(&["work", "1", "--at", "2026-03-01T12:01:00Z"]);
    assert!(ok);
    assert_eq!(third["data"]["total_credits"], 2);

    let (_, balance) = fx.run(&["user", "balance", "1"]);
    assert_eq!(balance["data"]["balance"], 2);
    assert_eq!(balance["data"]["formatted"], "2 credits");
}

#[test]
fn unknown_user_is_not_found() {
    let fx = Fixture::new();
    let (ok, body) = fx.run(&["work", "42", "--at", "2026-03-01T12:00:00Z"]);
    assert!(!ok);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

#[test]
fn session_flow_with_settings() {
    let fx = Fixture::new();
    assert!(fx.run(&["user", "add", "1"]).0);
    let (ok, set) = fx.run(&["admin", "config", "set", "accrual_mode", "session"]);
    assert!(ok);
    assert_eq!(set["data"]["config"]["accrual_mode"], "session");

    let (ok, started) = fx.run(&["start", "1", "--at", "2026-03-01T12:00:00Z"]);
    assert!(ok);
    assert!(started["data"]["session_id"].is_string());
    assert_eq!(started["data"]["require_claim"], true);

    let (ok, claim) = fx.run(&["accrue", "1", "--at", "2026-03-01T12:03:00Z"]);
    assert!(ok);
    assert_eq!(claim["data"]["mode"], "session");
    assert_eq!(claim["data"]["credits_claimed"], 3);

    let (ok, stopped) = fx.run(&["stop", "1", "--at", "2026-03-01T12:03:30Z"]);
    assert!(ok);
    assert_eq!(stopped["data"]["forfeited_credits"], 0);

    let (_, admin) = fx.run(&["admin", "stats", "--at", "2026-03-01T13:00:00Z"]);
    assert_eq!(admin["data"]["total_credits_earned"], 3);
    assert_eq!(admin["data"]["active_sessions"], 0);

    let text = fx.run_text(&["stats", "1", "--text", "--at", "2026-03-01T13:00:00Z"]);
    assert!(text.starts_with("User 1 (session mode)"), "{text}");
    assert!(text.contains("Balance: 3 credits"), "{text}");
}
