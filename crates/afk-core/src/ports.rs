//! Interfaces of the billing panel collaborators.
//!
//! The plugin does not own settings storage, the credit ledger, currency
//! display or user accounts. It only needs the narrow contracts below, which
//! the panel (or a test double) implements.

use thiserror::Error;

use crate::types::UserId;

/// A collaborator could not serve the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{collaborator} unavailable: {message}")]
pub struct PortError {
    pub collaborator: &'static str,
    pub message: String,
}

impl PortError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// Plugin settings key/value store. All values are strings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, plugin_id: &str, key: &str) -> Result<Option<String>, PortError>;

    fn set(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), PortError>;
}

/// The panel's credit balance ledger.
pub trait CreditsLedger: Send + Sync {
    fn balance(&self, user: UserId) -> Result<i64, PortError>;

    /// Adds `amount` credits atomically.
    ///
    /// `false` means nothing was applied.
    fn add_credits(&self, user: UserId, amount: i64) -> bool;
}

/// Display-only rendering of credit amounts.
pub trait CurrencyFormatter: Send + Sync {
    fn format(&self, amount: i64) -> String;
}

/// User existence lookup.
pub trait UserDirectory: Send + Sync {
    fn exists(&self, user: UserId) -> Result<bool, PortError>;
}

/// Formats amounts as `{prefix}{amount}{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainFormatter {
    pub prefix: String,
    pub suffix: String,
}

impl PlainFormatter {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new("", " credits")
    }
}

impl CurrencyFormatter for PlainFormatter {
    fn format(&self, amount: i64) -> String {
        format!("{}{amount}{}", self.prefix, self.suffix)
    }
}
