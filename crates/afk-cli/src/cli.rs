//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AFK credits: reward idle presence with panel credits.
///
/// Every command prints a JSON response envelope and exits non-zero when the
/// request was rejected.
#[derive(Debug, Parser)]
#[command(name = "afk", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Evaluate the request at this instant instead of now
    /// (ISO 8601, "now", "N minutes ago" or "in N minutes").
    #[arg(long, global = true)]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record one minute of presence (tick mode).
    Work {
        #[arg(allow_negative_numbers = true)]
        user: i64,
    },

    /// Start an explicit AFK session.
    Start {
        #[arg(allow_negative_numbers = true)]
        user: i64,
    },

    /// Stop the active session, forfeiting unclaimed credits.
    Stop {
        #[arg(allow_negative_numbers = true)]
        user: i64,
    },

    /// Claim credits accrued in the active session.
    Claim {
        #[arg(allow_negative_numbers = true)]
        user: i64,
    },

    /// Accrue through the configured mode (tick or session claim).
    Accrue {
        #[arg(allow_negative_numbers = true)]
        user: i64,
    },

    /// Show progress in the configured mode.
    Status {
        #[arg(allow_negative_numbers = true)]
        user: i64,

        /// Show the explicit session regardless of the configured mode.
        #[arg(long)]
        session: bool,
    },

    /// Show a user's statistics.
    Stats {
        #[arg(allow_negative_numbers = true)]
        user: i64,

        /// Render a human-readable summary instead of JSON.
        #[arg(long)]
        text: bool,
    },

    /// Administrative commands.
    #[command(subcommand)]
    Admin(AdminAction),

    /// Manage panel users.
    #[command(subcommand)]
    User(UserAction),
}

#[derive(Debug, Subcommand)]
pub enum AdminAction {
    /// Plugin-wide statistics.
    Stats,

    /// Show or change reward settings.
    #[command(subcommand)]
    Config(ConfigAction),
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration.
    Show,

    /// Validate and store one setting.
    Set { key: String, value: String },
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a user with the panel.
    Add {
        user: i64,

        #[arg(long, default_value = "user")]
        name: String,
    },

    /// Print a user's credit balance.
    Balance { user: i64 },
}
