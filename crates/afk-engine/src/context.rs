//! Collaborators and per-request state threaded through every operation.

use std::sync::Arc;

use afk_core::{
    AccrualEvent, CreditsLedger, CurrencyFormatter, EventSink, PlainFormatter, RewardConfig,
    SettingsStore, TracingSink, UserDirectory, UserId,
};
use afk_db::{Database, Panel};
use chrono::{DateTime, NaiveDate, Utc};

/// The external collaborators the engine talks to.
///
/// Shared across threads; each thread pairs it with its own [`Database`].
#[derive(Clone)]
pub struct Ports {
    pub settings: Arc<dyn SettingsStore>,
    pub ledger: Arc<dyn CreditsLedger>,
    pub users: Arc<dyn UserDirectory>,
    pub formatter: Arc<dyn CurrencyFormatter>,
    pub sink: Arc<dyn EventSink>,
}

impl Ports {
    /// Wires every port to a [`Panel`] database, logging events through `tracing`.
    pub fn from_panel(panel: &Arc<Panel>, formatter: PlainFormatter) -> Self {
        let settings: Arc<dyn SettingsStore> = panel.clone();
        let ledger: Arc<dyn CreditsLedger> = panel.clone();
        let users: Arc<dyn UserDirectory> = panel.clone();
        Self {
            settings,
            ledger,
            users,
            formatter: Arc::new(formatter),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Current balance, or `None` (logged) when the ledger cannot answer.
    pub fn balance(&self, user: UserId) -> Option<i64> {
        match self.ledger.balance(user) {
            Ok(balance) => Some(balance),
            Err(err) => {
                tracing::warn!(%user, error = %err, "could not read credit balance");
                None
            }
        }
    }
}

/// Everything one orchestrator call needs, resolved once up front.
pub struct RequestContext<'a> {
    pub db: &'a mut Database,
    pub ports: &'a Ports,
    pub config: &'a RewardConfig,
    pub user: UserId,
    pub now: DateTime<Utc>,
}

impl RequestContext<'_> {
    /// The calendar date daily usage is booked against.
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn emit(&self, event: &AccrualEvent) {
        self.ports.sink.emit(event);
    }
}
