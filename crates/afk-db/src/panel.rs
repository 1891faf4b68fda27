//! SQLite stand-in for the billing panel.
//!
//! Hosts the three tables the plugin reads from but does not own: registered
//! users, credit balances and plugin settings. Implements the core ports so the
//! engine can run standalone.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use afk_core::{CreditsLedger, PortError, SettingsStore, UserDirectory, UserId};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::{DEFAULT_BUSY_TIMEOUT, DbError, format_timestamp};

/// The panel's users, balances and plugin settings.
///
/// The connection sits behind a mutex so one `Panel` can be shared across
/// request handlers.
pub struct Panel {
    conn: Mutex<Connection>,
}

impl Panel {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS panel_users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS panel_credits (
                user_id INTEGER PRIMARY KEY REFERENCES panel_users(id),
                balance INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS plugin_settings (
                plugin_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (plugin_id, key)
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panicked holder cannot leave the connection half-written: every
        // write below is a single statement.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a user with a zero balance. Re-adding is a no-op.
    pub fn add_user(&self, user: UserId, name: &str) -> Result<(), DbError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO panel_users (id, name, created_at) VALUES (?, ?, ?)",
            params![user.get(), name, format_timestamp(Utc::now())],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO panel_credits (user_id, balance) VALUES (?, 0)",
            [user.get()],
        )?;
        tx.commit()?;
        tracing::debug!(%user, name, "panel user registered");
        Ok(())
    }

    /// All settings stored for `plugin_id`, ordered by key.
    pub fn settings(&self, plugin_id: &str) -> Result<Vec<(String, String)>, DbError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT key, value FROM plugin_settings WHERE plugin_id = ? ORDER BY key")?;
        let rows = stmt.query_map([plugin_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    fn read_setting(&self, plugin_id: &str, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM plugin_settings WHERE plugin_id = ? AND key = ?",
                [plugin_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_setting(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), DbError> {
        self.conn().execute(
            "
            INSERT INTO plugin_settings (plugin_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(plugin_id, key) DO UPDATE SET value = ?3, updated_at = ?4
            ",
            params![plugin_id, key, value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    fn read_balance(&self, user: UserId) -> Result<i64, DbError> {
        let balance = self
            .conn()
            .query_row(
                "SELECT balance FROM panel_credits WHERE user_id = ?",
                [user.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance.unwrap_or(0))
    }

    fn apply_credits(&self, user: UserId, amount: i64) -> Result<bool, DbError> {
        let updated = self.conn().execute(
            "UPDATE panel_credits SET balance = balance + ? WHERE user_id = ?",
            params![amount, user.get()],
        )?;
        Ok(updated == 1)
    }

    fn user_exists(&self, user: UserId) -> Result<bool, DbError> {
        let exists = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM panel_users WHERE id = ?)",
            [user.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl SettingsStore for Panel {
    fn get(&self, plugin_id: &str, key: &str) -> Result<Option<String>, PortError> {
        self.read_setting(plugin_id, key)
            .map_err(|err| PortError::new("settings store", err.to_string()))
    }

    fn set(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), PortError> {
        self.write_setting(plugin_id, key, value)
            .map_err(|err| PortError::new("settings store", err.to_string()))
    }
}

impl CreditsLedger for Panel {
    fn balance(&self, user: UserId) -> Result<i64, PortError> {
        self.read_balance(user)
            .map_err(|err| PortError::new("credits ledger", err.to_string()))
    }

    fn add_credits(&self, user: UserId, amount: i64) -> bool {
        if amount <= 0 {
            tracing::warn!(%user, amount, "refusing non-positive credit amount");
            return false;
        }
        match self.apply_credits(user, amount) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(%user, amount, "no credit account for user");
                false
            }
            Err(err) => {
                tracing::error!(%user, amount, error = %err, "failed to add credits");
                false
            }
        }
    }
}

impl UserDirectory for Panel {
    fn exists(&self, user: UserId) -> Result<bool, PortError> {
        self.user_exists(user)
            .map_err(|err| PortError::new("user directory", err.to_string()))
    }
}
