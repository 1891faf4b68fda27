//! Storage layer for the AFK credits plugin.
//!
//! Provides persistence for per-user stats, sessions and daily usage using
//! `rusqlite`, plus [`Panel`], an SQLite-backed stand-in for the billing
//! panel's settings store, user directory and credit ledger.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Open one `Database` per thread or request, all pointing at the same file.
//! Cross-connection consistency comes from [`Database::locked`].
//!
//! # Locking
//!
//! Every read-modify-write goes through [`Database::locked`], which runs the
//! closure inside a `BEGIN IMMEDIATE` transaction. SQLite takes its write lock
//! up front, so a concurrent writer for the same user waits (up to the busy
//! timeout) and then observes the committed state instead of a stale read.
//! A wait that exceeds the busy timeout surfaces as [`DbError::LockTimeout`].
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Session timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g., `2026-01-15T10:30:00.000Z`), so lexicographic ordering
//! matches chronological ordering. `afk_user_stats.last_seen_afk` is an INTEGER
//! of unix seconds. Usage dates are `YYYY-MM-DD` in UTC.

use std::path::Path;
use std::time::Duration;

use afk_core::{
    DailyUsage, Session, TickDecision, TickOutcome, UserId, UserStats, tick_decision,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use thiserror::Error;

mod panel;

pub use panel::Panel;

/// Default time to wait for another connection's lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
    /// Another connection held the lock for longer than the busy timeout.
    #[error("timed out waiting for database lock")]
    LockTimeout(#[source] rusqlite::Error),
    /// Failed to parse a stored timestamp or date.
    #[error("invalid timestamp in {table}: {value}")]
    TimestampParse {
        table: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant.
    #[error("invalid row in {table}: {message}")]
    InvalidRow {
        table: &'static str,
        message: String,
    },
}

impl DbError {
    /// Lock contention; the same operation may succeed on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let busy = matches!(
            &err,
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        );
        if busy {
            Self::LockTimeout(err)
        } else {
            Self::Sqlite(err)
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Aggregates across all users, for admin statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StorageTotals {
    pub users_tracked: i64,
    pub total_credits_earned: i64,
    pub total_time_seconds: i64,
    pub total_minutes_afk: i64,
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub users_active_today: i64,
    pub today_credits_earned: i64,
    pub today_sessions: i64,
    pub today_time_seconds: i64,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety and locking.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens a database with a custom lock wait timeout.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- One row per user; counters grow except when an unpaid award is reversed
            -- last_seen_afk: unix seconds of the last accepted tick
            CREATE TABLE IF NOT EXISTS afk_user_stats (
                user_id INTEGER PRIMARY KEY,
                minutes_afk INTEGER NOT NULL DEFAULT 0,
                last_seen_afk INTEGER NOT NULL DEFAULT 0,
                total_time_seconds INTEGER NOT NULL DEFAULT 0,
                total_credits_earned INTEGER NOT NULL DEFAULT 0,
                sessions_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS afk_sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                stopped_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                credits_earned INTEGER NOT NULL DEFAULT 0,
                credits_claimed INTEGER NOT NULL DEFAULT 0,
                time_elapsed INTEGER NOT NULL DEFAULT 0,
                last_claim_at TEXT,
                CHECK (credits_claimed >= 0 AND credits_claimed <= credits_earned)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_afk_sessions_one_active
                ON afk_sessions(user_id) WHERE is_active = 1;
            CREATE INDEX IF NOT EXISTS idx_afk_sessions_user_active
                ON afk_sessions(user_id, is_active, started_at);

            -- One row per user per UTC date; a new day starts a new row
            CREATE TABLE IF NOT EXISTS afk_daily_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                usage_date TEXT NOT NULL,
                credits_earned INTEGER NOT NULL DEFAULT 0,
                sessions_count INTEGER NOT NULL DEFAULT 0,
                time_seconds INTEGER NOT NULL DEFAULT 0,
                UNIQUE (user_id, usage_date)
            );

            CREATE INDEX IF NOT EXISTS idx_afk_daily_usage_date ON afk_daily_usage(usage_date);
            ",
        )?;
        Ok(())
    }

    /// Runs `f` under the exclusive write lock.
    ///
    /// Commits when `f` returns `Ok`; rolls back everything `f` wrote when it
    /// returns `Err` (the transaction is dropped uncommitted).
    pub fn locked<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&LockedTx<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let locked = LockedTx { tx };
        let value = f(&locked)?;
        locked.tx.commit().map_err(DbError::from)?;
        Ok(value)
    }

    /// Counts one minute of presence, at most once per `min_interval_seconds`.
    ///
    /// Creates the stats row on first use. A rejected tick changes nothing.
    pub fn tick(
        &mut self,
        user: UserId,
        min_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, DbError> {
        self.locked(|tx| tx.tick(user, min_interval_seconds, now))
    }

    /// Returns a user's stats row, if one exists.
    pub fn user_stats(&self, user: UserId) -> Result<Option<UserStats>, DbError> {
        select_user_stats(&self.conn, user)
    }

    /// Returns the usage row for `(user, date)`, creating it if absent.
    ///
    /// Concurrent creators converge on a single row: losing the insert race
    /// re-fetches the winner's row.
    pub fn get_or_create_daily_usage(
        &mut self,
        user: UserId,
        date: NaiveDate,
    ) -> Result<DailyUsage, DbError> {
        ensure_daily_usage(&self.conn, user, date)
    }

    /// Returns the usage row for `(user, date)` without creating it.
    pub fn daily_usage(&self, user: UserId, date: NaiveDate) -> Result<Option<DailyUsage>, DbError> {
        select_daily_usage(&self.conn, user, date)
    }

    /// Adds deltas to the `(user, date)` row under the lock, creating it first if needed.
    pub fn record_usage(
        &mut self,
        user: UserId,
        date: NaiveDate,
        credits_delta: i64,
        time_delta: i64,
        session_increment: bool,
    ) -> Result<DailyUsage, DbError> {
        self.locked(|tx| {
            tx.add_daily_usage(
                user,
                date,
                credits_delta,
                time_delta,
                i64::from(session_increment),
            )
        })
    }

    /// Returns the user's most recent active session, if any.
    pub fn active_session(&self, user: UserId) -> Result<Option<Session>, DbError> {
        select_active_session(&self.conn, user)
    }

    /// Looks up a session by id, active or not.
    pub fn session(&self, id: &str) -> Result<Option<Session>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM afk_sessions WHERE id = ?"),
                [id],
                session_row,
            )
            .optional()?;
        row.map(SessionRow::into_session).transpose()
    }

    /// Aggregates stats, sessions and usage for `today`.
    pub fn totals(&self, today: NaiveDate) -> Result<StorageTotals, DbError> {
        let mut totals = self.conn.query_row(
            "
            SELECT COUNT(*),
                   COALESCE(SUM(total_credits_earned), 0),
                   COALESCE(SUM(total_time_seconds), 0),
                   COALESCE(SUM(minutes_afk), 0),
                   COALESCE(SUM(sessions_count), 0)
            FROM afk_user_stats
            ",
            [],
            |row| {
                Ok(StorageTotals {
                    users_tracked: row.get(0)?,
                    total_credits_earned: row.get(1)?,
                    total_time_seconds: row.get(2)?,
                    total_minutes_afk: row.get(3)?,
                    total_sessions: row.get(4)?,
                    ..StorageTotals::default()
                })
            },
        )?;
        totals.active_sessions = self.conn.query_row(
            "SELECT COUNT(*) FROM afk_sessions WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        let (users, credits, sessions, time): (i64, i64, i64, i64) = self.conn.query_row(
            "
            SELECT COUNT(*),
                   COALESCE(SUM(credits_earned), 0),
                   COALESCE(SUM(sessions_count), 0),
                   COALESCE(SUM(time_seconds), 0)
            FROM afk_daily_usage
            WHERE usage_date = ?
            ",
            [format_date(today)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        totals.users_active_today = users;
        totals.today_credits_earned = credits;
        totals.today_sessions = sessions;
        totals.today_time_seconds = time;
        Ok(totals)
    }
}

/// Handle to the open exclusive transaction inside [`Database::locked`].
pub struct LockedTx<'conn> {
    tx: Transaction<'conn>,
}

impl LockedTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }

    /// [`Database::tick`] inside an already-open lock, so the caller can
    /// commit the tick together with the award it pays.
    pub fn tick(
        &self,
        user: UserId,
        min_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, DbError> {
        let stats = self.user_stats(user, now)?;
        match tick_decision(stats.last_seen_afk, now.timestamp(), min_interval_seconds) {
            TickDecision::TooSoon {
                retry_after_seconds,
            } => Ok(TickOutcome::TooSoon {
                retry_after_seconds,
                stats,
            }),
            TickDecision::Accept => {
                let updated = UserStats {
                    minutes_afk: stats.minutes_afk + 1,
                    last_seen_afk: now.timestamp().max(stats.last_seen_afk),
                    ..stats
                };
                self.save_tick(&updated, now)?;
                Ok(TickOutcome::Accepted(updated))
            }
        }
    }

    /// Returns the user's stats row, creating a zeroed one if absent.
    pub fn user_stats(&self, user: UserId, now: DateTime<Utc>) -> Result<UserStats, DbError> {
        let now = format_timestamp(now);
        self.conn().execute(
            "
            INSERT OR IGNORE INTO afk_user_stats (user_id, created_at, updated_at)
            VALUES (?, ?, ?)
            ",
            params![user.get(), now, now],
        )?;
        select_user_stats(self.conn(), user)?.ok_or_else(|| DbError::InvalidRow {
            table: "afk_user_stats",
            message: format!("row for user {user} vanished after insert"),
        })
    }

    fn save_tick(&self, stats: &UserStats, now: DateTime<Utc>) -> Result<(), DbError> {
        self.conn().execute(
            "
            UPDATE afk_user_stats
            SET minutes_afk = ?, last_seen_afk = ?, updated_at = ?
            WHERE user_id = ?
            ",
            params![
                stats.minutes_afk,
                stats.last_seen_afk,
                format_timestamp(now),
                stats.user_id.get()
            ],
        )?;
        Ok(())
    }

    /// Adds to the cumulative counters, creating the stats row if absent.
    pub fn add_user_totals(
        &self,
        user: UserId,
        credits_delta: i64,
        time_delta: i64,
        sessions_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<UserStats, DbError> {
        self.user_stats(user, now)?;
        self.conn().execute(
            "
            UPDATE afk_user_stats
            SET total_credits_earned = total_credits_earned + ?,
                total_time_seconds = total_time_seconds + ?,
                sessions_count = sessions_count + ?,
                updated_at = ?
            WHERE user_id = ?
            ",
            params![
                credits_delta.max(0),
                time_delta.max(0),
                sessions_delta.max(0),
                format_timestamp(now),
                user.get()
            ],
        )?;
        self.user_stats(user, now)
    }

    /// Returns the `(user, date)` usage row, creating it if absent.
    pub fn daily_usage(&self, user: UserId, date: NaiveDate) -> Result<DailyUsage, DbError> {
        ensure_daily_usage(self.conn(), user, date)
    }

    /// Adds deltas to the `(user, date)` usage row, creating it if absent.
    pub fn add_daily_usage(
        &self,
        user: UserId,
        date: NaiveDate,
        credits_delta: i64,
        time_delta: i64,
        sessions_delta: i64,
    ) -> Result<DailyUsage, DbError> {
        ensure_daily_usage(self.conn(), user, date)?;
        self.conn().execute(
            "
            UPDATE afk_daily_usage
            SET credits_earned = credits_earned + ?,
                time_seconds = time_seconds + ?,
                sessions_count = sessions_count + ?
            WHERE user_id = ? AND usage_date = ?
            ",
            params![
                credits_delta.max(0),
                time_delta.max(0),
                sessions_delta.max(0),
                user.get(),
                format_date(date)
            ],
        )?;
        ensure_daily_usage(self.conn(), user, date)
    }

    /// Returns the user's active session, if any.
    pub fn active_session(&self, user: UserId) -> Result<Option<Session>, DbError> {
        select_active_session(self.conn(), user)
    }

    /// Inserts a new session row.
    pub fn insert_session(&self, session: &Session) -> Result<(), DbError> {
        self.conn().execute(
            "
            INSERT INTO afk_sessions
            (id, user_id, started_at, stopped_at, is_active, credits_earned, credits_claimed, time_elapsed, last_claim_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                session.id,
                session.user_id.get(),
                format_timestamp(session.started_at),
                session.stopped_at.map(format_timestamp),
                session.is_active,
                session.credits_earned,
                session.credits_claimed,
                session.time_elapsed,
                session.last_claim_at.map(format_timestamp),
            ],
        )?;
        Ok(())
    }

    /// Stores a recomputed earned/elapsed snapshot. `credits_earned` never decreases.
    pub fn update_session_progress(
        &self,
        session_id: &str,
        credits_earned: i64,
        time_elapsed: i64,
    ) -> Result<(), DbError> {
        self.conn().execute(
            "
            UPDATE afk_sessions
            SET credits_earned = MAX(credits_earned, ?), time_elapsed = ?
            WHERE id = ? AND is_active = 1
            ",
            params![credits_earned, time_elapsed, session_id],
        )?;
        Ok(())
    }

    /// Records a claim. `credits_claimed` only moves forward.
    pub fn record_claim(
        &self,
        session_id: &str,
        credits_claimed: i64,
        credits_earned: i64,
        time_elapsed: i64,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let updated = self.conn().execute(
            "
            UPDATE afk_sessions
            SET credits_earned = MAX(credits_earned, ?),
                credits_claimed = ?,
                time_elapsed = ?,
                last_claim_at = ?
            WHERE id = ? AND is_active = 1 AND credits_claimed <= ?
            ",
            params![
                credits_earned,
                credits_claimed,
                time_elapsed,
                format_timestamp(claimed_at),
                session_id,
                credits_claimed,
            ],
        )?;
        if updated != 1 {
            return Err(DbError::InvalidRow {
                table: "afk_sessions",
                message: format!("claim on {session_id} would move credits_claimed backwards"),
            });
        }
        Ok(())
    }

    /// Undoes a committed claim of `credits` made at `claimed_at`.
    ///
    /// Fails without writing if a later claim already moved the session on.
    pub fn revert_claim(
        &self,
        session_id: &str,
        credits: i64,
        claimed_at: DateTime<Utc>,
        previous_claim_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        let updated = self.conn().execute(
            "
            UPDATE afk_sessions
            SET credits_claimed = credits_claimed - ?1,
                last_claim_at = ?2
            WHERE id = ?3 AND credits_claimed >= ?1 AND last_claim_at = ?4
            ",
            params![
                credits,
                previous_claim_at.map(format_timestamp),
                session_id,
                format_timestamp(claimed_at),
            ],
        )?;
        if updated != 1 {
            return Err(DbError::InvalidRow {
                table: "afk_sessions",
                message: format!("claim on {session_id} at {claimed_at} is no longer the latest"),
            });
        }
        Ok(())
    }

    /// Takes back counters recorded for an award that was never paid.
    ///
    /// Counters never drop below zero.
    pub fn reverse_award(
        &self,
        user: UserId,
        date: NaiveDate,
        credits: i64,
        time_seconds: i64,
        sessions: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let (credits, time_seconds, sessions) =
            (credits.max(0), time_seconds.max(0), sessions.max(0));
        self.conn().execute(
            "
            UPDATE afk_daily_usage
            SET credits_earned = MAX(credits_earned - ?1, 0),
                time_seconds = MAX(time_seconds - ?2, 0),
                sessions_count = MAX(sessions_count - ?3, 0)
            WHERE user_id = ?4 AND usage_date = ?5
            ",
            params![credits, time_seconds, sessions, user.get(), format_date(date)],
        )?;
        self.conn().execute(
            "
            UPDATE afk_user_stats
            SET total_credits_earned = MAX(total_credits_earned - ?1, 0),
                total_time_seconds = MAX(total_time_seconds - ?2, 0),
                sessions_count = MAX(sessions_count - ?3, 0),
                updated_at = ?4
            WHERE user_id = ?5
            ",
            params![credits, time_seconds, sessions, format_timestamp(now), user.get()],
        )?;
        Ok(())
    }

    /// Marks a session stopped.
    pub fn stop_session(
        &self,
        session_id: &str,
        stopped_at: DateTime<Utc>,
        credits_earned: i64,
        time_elapsed: i64,
    ) -> Result<(), DbError> {
        self.conn().execute(
            "
            UPDATE afk_sessions
            SET is_active = 0,
                stopped_at = ?,
                credits_earned = MAX(credits_earned, ?),
                time_elapsed = ?
            WHERE id = ?
            ",
            params![
                format_timestamp(stopped_at),
                credits_earned,
                time_elapsed,
                session_id
            ],
        )?;
        Ok(())
    }
}

fn select_user_stats(conn: &Connection, user: UserId) -> Result<Option<UserStats>, DbError> {
    let row = conn
        .query_row(
            "
            SELECT minutes_afk, last_seen_afk, total_time_seconds, total_credits_earned, sessions_count
            FROM afk_user_stats
            WHERE user_id = ?
            ",
            [user.get()],
            |row| {
                Ok(UserStats {
                    user_id: user,
                    minutes_afk: row.get(0)?,
                    last_seen_afk: row.get(1)?,
                    total_time_seconds: row.get(2)?,
                    total_credits_earned: row.get(3)?,
                    sessions_count: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn select_daily_usage(
    conn: &Connection,
    user: UserId,
    date: NaiveDate,
) -> Result<Option<DailyUsage>, DbError> {
    let row = conn
        .query_row(
            "
            SELECT credits_earned, sessions_count, time_seconds
            FROM afk_daily_usage
            WHERE user_id = ? AND usage_date = ?
            ",
            params![user.get(), format_date(date)],
            |row| {
                Ok(DailyUsage {
                    user_id: user,
                    date,
                    credits_earned: row.get(0)?,
                    sessions_count: row.get(1)?,
                    time_seconds: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn ensure_daily_usage(
    conn: &Connection,
    user: UserId,
    date: NaiveDate,
) -> Result<DailyUsage, DbError> {
    if let Some(existing) = select_daily_usage(conn, user, date)? {
        return Ok(existing);
    }

    match conn.execute(
        "INSERT INTO afk_daily_usage (user_id, usage_date) VALUES (?, ?)",
        params![user.get(), format_date(date)],
    ) {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(%user, %date, "daily usage row created concurrently, re-fetching");
        }
        Err(err) => return Err(err.into()),
    }

    select_daily_usage(conn, user, date)?.ok_or_else(|| DbError::InvalidRow {
        table: "afk_daily_usage",
        message: format!("row for user {user} on {date} missing after insert"),
    })
}

const SESSION_COLUMNS: &str = "id, user_id, started_at, stopped_at, is_active, credits_earned, credits_claimed, time_elapsed, last_claim_at";

fn select_active_session(conn: &Connection, user: UserId) -> Result<Option<Session>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {SESSION_COLUMNS}
                FROM afk_sessions
                WHERE user_id = ? AND is_active = 1
                ORDER BY started_at DESC
                LIMIT 1
                "
            ),
            [user.get()],
            session_row,
        )
        .optional()?;
    row.map(SessionRow::into_session).transpose()
}

#[derive(Debug)]
struct SessionRow {
    id: String,
    user_id: i64,
    started_at: String,
    stopped_at: Option<String>,
    is_active: bool,
    credits_earned: i64,
    credits_claimed: i64,
    time_elapsed: i64,
    last_claim_at: Option<String>,
}

fn session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        started_at: row.get(2)?,
        stopped_at: row.get(3)?,
        is_active: row.get(4)?,
        credits_earned: row.get(5)?,
        credits_claimed: row.get(6)?,
        time_elapsed: row.get(7)?,
        last_claim_at: row.get(8)?,
    })
}

impl SessionRow {
    fn into_session(self) -> Result<Session, DbError> {
        let user_id = UserId::new(self.user_id).map_err(|err| DbError::InvalidRow {
            table: "afk_sessions",
            message: err.to_string(),
        })?;
        Ok(Session {
            user_id,
            started_at: parse_timestamp(&self.started_at, "afk_sessions")?,
            stopped_at: self
                .stopped_at
                .as_deref()
                .map(|value| parse_timestamp(value, "afk_sessions"))
                .transpose()?,
            is_active: self.is_active,
            credits_earned: self.credits_earned,
            credits_claimed: self.credits_claimed,
            time_elapsed: self.time_elapsed,
            last_claim_at: self
                .last_claim_at
                .as_deref()
                .map(|value| parse_timestamp(value, "afk_sessions"))
                .transpose()?,
            id: self.id,
        })
    }
}

/// Generates an id for a new session.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_timestamp(value: &str, table: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
