//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Process configuration.
///
/// Reward tuning lives in the panel's plugin settings, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the plugin database file.
    pub database_path: PathBuf,
    /// Path to the panel database (users, balances, plugin settings).
    pub panel_database_path: PathBuf,
    /// Namespace of this plugin's settings in the panel.
    pub plugin_id: String,
    /// How long to wait for another writer's lock, in milliseconds.
    pub busy_timeout_ms: u64,
    pub currency_prefix: String,
    pub currency_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("afk.db"),
            panel_database_path: data_dir.join("panel.db"),
            plugin_id: "afk".to_string(),
            busy_timeout_ms: 5000,
            currency_prefix: String::new(),
            currency_suffix: " credits".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (AFK_*)
        figment = figment.merge(Env::prefixed("AFK_"));

        figment.extract()
    }

    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Returns the platform-specific config directory for afk.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("afk"))
}

/// Returns the platform-specific data directory for afk.
///
/// On Linux: `~/.local/share/afk`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("afk"))
}
