//! Shared fixtures for the in-crate tests.

use std::sync::{Arc, Mutex};

use afk_core::{AccrualEvent, CreditsLedger, EventSink, PlainFormatter, RewardConfig, UserId};
use afk_db::{Database, Panel};
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::context::{Ports, RequestContext};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AccrualEvent>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AccrualEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// In-memory plugin database and panel with user 1 registered.
pub struct TestBed {
    pub db: Database,
    pub panel: Arc<Panel>,
    pub ports: Ports,
    pub config: RewardConfig,
    pub user: UserId,
    sink: Arc<RecordingSink>,
}

impl TestBed {
    pub fn new(config: RewardConfig) -> Self {
        let panel = Arc::new(Panel::open_in_memory().unwrap());
        let user = UserId::new(1).unwrap();
        panel.add_user(user, "alice").unwrap();
        let sink = Arc::new(RecordingSink::default());
        let ports = Ports::from_panel(&panel, PlainFormatter::default()).with_sink(sink.clone());
        Self {
            db: Database::open_in_memory().unwrap(),
            panel,
            ports,
            config,
            user,
            sink,
        }
    }

    /// Targets a user the panel has no credit account for.
    pub fn with_unregistered_user(mut self) -> Self {
        self.user = UserId::new(2).unwrap();
        self
    }

    pub fn with_cx<T>(
        &mut self,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut RequestContext<'_>) -> T,
    ) -> T {
        let mut cx = RequestContext {
            db: &mut self.db,
            ports: &self.ports,
            config: &self.config,
            user: self.user,
            now,
        };
        f(&mut cx)
    }

    pub fn balance(&self) -> i64 {
        self.panel.balance(self.user).unwrap()
    }

    pub fn events(&self) -> Vec<AccrualEvent> {
        self.sink.events.lock().unwrap().clone()
    }
}
