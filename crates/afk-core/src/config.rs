//! Reward configuration and the settings resolver.
//!
//! The panel stores every plugin setting as a string. [`SettingsResolver`]
//! reads them once per request and coerces them into a typed
//! [`RewardConfig`], falling back to defaults for anything missing or
//! malformed. Admin updates go through [`SettingsResolver::update`], which
//! applies the same rules strictly and refuses bad input instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{PortError, SettingsStore};
use crate::types::{AccrualMode, ValidationError};

/// Default primary rate.
pub const DEFAULT_CREDITS_PER_MINUTE: f64 = 1.0;

/// Upper bound on the primary rate. Larger values are clamped on resolve and
/// refused on update so credit arithmetic stays far from `i64` overflow.
pub const MAX_CREDITS_PER_MINUTE: f64 = 1_000_000.0;

/// Lower bound on the inverse rate, mirroring [`MAX_CREDITS_PER_MINUTE`].
pub const MIN_MINUTES_PER_CREDIT: f64 = 1.0 / MAX_CREDITS_PER_MINUTE;

/// Default reward/claim cadence.
pub const DEFAULT_REWARD_INTERVAL_SECONDS: i64 = 60;

/// Tunable reward configuration, immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub credits_per_minute: f64,
    /// Inverse rate, consulted only when `credits_per_minute` is zero.
    pub minutes_per_credit: Option<f64>,
    pub reward_interval_seconds: i64,
    pub max_credits_per_session: Option<i64>,
    pub max_session_duration_seconds: Option<i64>,
    pub max_credits_per_day: Option<i64>,
    pub max_sessions_per_day: Option<i64>,
    pub max_time_per_day_seconds: Option<i64>,
    pub is_enabled: bool,
    pub require_claim: bool,
    pub auto_claim_interval_seconds: Option<i64>,
    /// Opaque snippet the panel injects into the AFK page.
    pub javascript_injection: String,
    pub accrual_mode: AccrualMode,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            credits_per_minute: DEFAULT_CREDITS_PER_MINUTE,
            minutes_per_credit: None,
            reward_interval_seconds: DEFAULT_REWARD_INTERVAL_SECONDS,
            max_credits_per_session: None,
            max_session_duration_seconds: None,
            max_credits_per_day: None,
            max_sessions_per_day: None,
            max_time_per_day_seconds: None,
            is_enabled: true,
            require_claim: true,
            auto_claim_interval_seconds: None,
            javascript_injection: String::new(),
            accrual_mode: AccrualMode::Tick,
        }
    }
}

/// Settings keys understood by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    CreditsPerMinute,
    MinutesPerCredit,
    RewardInterval,
    MaxCreditsPerSession,
    MaxSessionDuration,
    MaxCreditsPerDay,
    MaxSessionsPerDay,
    MaxTimePerDay,
    IsEnabled,
    RequireClaim,
    AutoClaimInterval,
    JavascriptInjection,
    AccrualMode,
}

impl SettingKey {
    pub const ALL: [Self; 13] = [
        Self::CreditsPerMinute,
        Self::MinutesPerCredit,
        Self::RewardInterval,
        Self::MaxCreditsPerSession,
        Self::MaxSessionDuration,
        Self::MaxCreditsPerDay,
        Self::MaxSessionsPerDay,
        Self::MaxTimePerDay,
        Self::IsEnabled,
        Self::RequireClaim,
        Self::AutoClaimInterval,
        Self::JavascriptInjection,
        Self::AccrualMode,
    ];

    /// Key name in the settings store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreditsPerMinute => "credits_per_minute",
            Self::MinutesPerCredit => "minutes_per_credit",
            Self::RewardInterval => "reward_interval",
            Self::MaxCreditsPerSession => "max_credits_per_session",
            Self::MaxSessionDuration => "max_session_duration",
            Self::MaxCreditsPerDay => "max_credits_per_day",
            Self::MaxSessionsPerDay => "max_sessions_per_day",
            Self::MaxTimePerDay => "max_time_per_day",
            Self::IsEnabled => "is_enabled",
            Self::RequireClaim => "require_claim",
            Self::AutoClaimInterval => "auto_claim_interval",
            Self::JavascriptInjection => "javascript_injection",
            Self::AccrualMode => "accrual_mode",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSetting { key: s.to_string() })
    }
}

/// Errors from resolving or updating settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] PortError),
}

/// Reads and writes [`RewardConfig`] through a [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct SettingsResolver {
    plugin_id: String,
}

impl SettingsResolver {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Resolves the current configuration, applying defaults.
    ///
    /// Only a store failure is an error; malformed values fall back.
    pub fn resolve(&self, store: &dyn SettingsStore) -> Result<RewardConfig, PortError> {
        let mut raw = RawSettings::default();
        for key in SettingKey::ALL {
            raw.set(key, store.get(&self.plugin_id, key.as_str())?);
        }
        Ok(raw.into_config())
    }

    /// Validates and stores a single setting, returning the normalized value written.
    pub fn update(
        &self,
        store: &dyn SettingsStore,
        key: &str,
        value: &str,
    ) -> Result<String, SettingsError> {
        let key: SettingKey = key.parse()?;
        let normalized = normalize_setting(key, value)?;
        store.set(&self.plugin_id, key.as_str(), &normalized)?;
        tracing::info!(plugin_id = %self.plugin_id, key = %key, value = %normalized, "updated setting");
        Ok(normalized)
    }
}

#[derive(Debug, Default)]
struct RawSettings {
    values: Vec<(SettingKey, String)>,
}

impl RawSettings {
    fn set(&mut self, key: SettingKey, value: Option<String>) {
        if let Some(value) = value {
            self.values.push((key, value));
        }
    }

    fn get(&self, key: SettingKey) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn into_config(self) -> RewardConfig {
        let defaults = RewardConfig::default();

        let credits_per_minute = self
            .get(SettingKey::CreditsPerMinute)
            .and_then(parse_f64)
            .map_or(defaults.credits_per_minute, |rate| {
                rate.clamp(0.0, MAX_CREDITS_PER_MINUTE)
            });

        RewardConfig {
            credits_per_minute,
            minutes_per_credit: self
                .get(SettingKey::MinutesPerCredit)
                .and_then(parse_f64)
                .filter(|value| *value > 0.0)
                .map(|value| value.max(MIN_MINUTES_PER_CREDIT)),
            reward_interval_seconds: self
                .get(SettingKey::RewardInterval)
                .and_then(parse_positive_int)
                .unwrap_or(defaults.reward_interval_seconds),
            max_credits_per_session: self
                .get(SettingKey::MaxCreditsPerSession)
                .and_then(parse_positive_int),
            max_session_duration_seconds: self
                .get(SettingKey::MaxSessionDuration)
                .and_then(parse_positive_int),
            max_credits_per_day: self
                .get(SettingKey::MaxCreditsPerDay)
                .and_then(parse_positive_int),
            max_sessions_per_day: self
                .get(SettingKey::MaxSessionsPerDay)
                .and_then(parse_positive_int),
            max_time_per_day_seconds: self
                .get(SettingKey::MaxTimePerDay)
                .and_then(parse_positive_int),
            is_enabled: self
                .get(SettingKey::IsEnabled)
                .and_then(parse_bool)
                .unwrap_or(defaults.is_enabled),
            require_claim: self
                .get(SettingKey::RequireClaim)
                .and_then(parse_bool)
                .unwrap_or(defaults.require_claim),
            auto_claim_interval_seconds: self
                .get(SettingKey::AutoClaimInterval)
                .and_then(parse_positive_int),
            javascript_injection: self
                .get(SettingKey::JavascriptInjection)
                .map(str::to_string)
                .unwrap_or_default(),
            accrual_mode: self
                .get(SettingKey::AccrualMode)
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.accrual_mode),
        }
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses an integer setting; fractional values truncate. Non-positive means unset.
#[expect(
    clippy::cast_possible_truncation,
    reason = "fractional seconds/credits in settings truncate toward zero"
)]
fn parse_positive_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(_) => parse_f64(trimmed)?.trunc() as i64,
    };
    (value > 0).then_some(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: SettingKey, value: &str, reason: &'static str) -> ValidationError {
    ValidationError::InvalidSetting {
        key: key.as_str(),
        value: value.to_string(),
        reason,
    }
}

fn normalize_setting(key: SettingKey, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    match key {
        SettingKey::CreditsPerMinute => {
            let rate = parse_f64(trimmed).ok_or_else(|| invalid(key, value, "not a number"))?;
            if rate < 0.0 {
                return Err(invalid(key, value, "must not be negative"));
            }
            if rate > MAX_CREDITS_PER_MINUTE {
                return Err(invalid(key, value, "exceeds 1000000 credits per minute"));
            }
            Ok(rate.to_string())
        }
        SettingKey::MinutesPerCredit => {
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            let minutes = parse_f64(trimmed).ok_or_else(|| invalid(key, value, "not a number"))?;
            if minutes <= 0.0 {
                return Err(invalid(key, value, "must be positive"));
            }
            if minutes < MIN_MINUTES_PER_CREDIT {
                return Err(invalid(key, value, "below one millionth of a minute"));
            }
            Ok(minutes.to_string())
        }
        SettingKey::RewardInterval => {
            let seconds = trimmed
                .parse::<i64>()
                .map_err(|_| invalid(key, value, "not an integer"))?;
            if seconds <= 0 {
                return Err(invalid(key, value, "must be positive"));
            }
            Ok(seconds.to_string())
        }
        SettingKey::MaxCreditsPerSession
        | SettingKey::MaxSessionDuration
        | SettingKey::MaxCreditsPerDay
        | SettingKey::MaxSessionsPerDay
        | SettingKey::MaxTimePerDay
        | SettingKey::AutoClaimInterval => {
            // Empty or zero clears the limit.
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            let limit = trimmed
                .parse::<i64>()
                .map_err(|_| invalid(key, value, "not an integer"))?;
            match limit {
                0 => Ok(String::new()),
                l if l < 0 => Err(invalid(key, value, "must not be negative")),
                l => Ok(l.to_string()),
            }
        }
        SettingKey::IsEnabled | SettingKey::RequireClaim => parse_bool(trimmed)
            .map(|flag| if flag { "1" } else { "0" }.to_string())
            .ok_or_else(|| invalid(key, value, "expected a boolean")),
        SettingKey::JavascriptInjection => Ok(value.to_string()),
        SettingKey::AccrualMode => Ok(trimmed.parse::<AccrualMode>()?.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<(String, String), String>>,
    }

    impl MapStore {
        fn with(pairs: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (key, value) in pairs {
                store.set("afk", key, value).unwrap();
            }
            store
        }
    }

    impl SettingsStore for MapStore {
        fn get(&self, plugin_id: &str, key: &str) -> Result<Option<String>, PortError> {
            let values = self.values.lock().unwrap();
            Ok(values.get(&(plugin_id.to_string(), key.to_string())).cloned())
        }

        fn set(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), PortError> {
            let mut values = self.values.lock().unwrap();
            values.insert((plugin_id.to_string(), key.to_string()), value.to_string());
            Ok(())
        }
    }

    struct DownStore;

    impl SettingsStore for DownStore {
        fn get(&self, _plugin_id: &str, _key: &str) -> Result<Option<String>, PortError> {
            Err(PortError::new("settings store", "offline"))
        }

        fn set(&self, _plugin_id: &str, _key: &str, _value: &str) -> Result<(), PortError> {
            Err(PortError::new("settings store", "offline"))
        }
    }

    fn resolve(pairs: &[(&str, &str)]) -> RewardConfig {
        SettingsResolver::new("afk")
            .resolve(&MapStore::with(pairs))
            .unwrap()
    }

    #[test]
    fn empty_store_resolves_to_defaults() {
        let config = resolve(&[]);
        assert_eq!(config, RewardConfig::default());
        assert!(config.is_enabled);
        assert!(config.require_claim);
        assert_eq!(config.reward_interval_seconds, 60);
        assert_eq!(config.accrual_mode, AccrualMode::Tick);
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for parsed literals"
    )]
    fn typed_coercion_of_string_values() {
        let config = resolve(&[
            ("credits_per_minute", " 2.5 "),
            ("minutes_per_credit", "3"),
            ("reward_interval", "90"),
            ("max_credits_per_day", "100"),
            ("max_sessions_per_day", "4"),
            ("max_time_per_day", "3600"),
            ("max_session_duration", "1800.9"),
            ("is_enabled", "yes"),
            ("require_claim", "0"),
            ("accrual_mode", "session"),
            ("javascript_injection", "<script>1</script>"),
        ]);
        assert_eq!(config.credits_per_minute, 2.5);
        assert_eq!(config.minutes_per_credit, Some(3.0));
        assert_eq!(config.reward_interval_seconds, 90);
        assert_eq!(config.max_credits_per_day, Some(100));
        assert_eq!(config.max_sessions_per_day, Some(4));
        assert_eq!(config.max_time_per_day_seconds, Some(3600));
        assert_eq!(config.max_session_duration_seconds, Some(1800));
        assert!(config.is_enabled);
        assert!(!config.require_claim);
        assert_eq!(config.accrual_mode, AccrualMode::Session);
        assert_eq!(config.javascript_injection, "<script>1</script>");
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for fallback values"
    )]
    fn malformed_values_fall_back() {
        let config = resolve(&[
            ("credits_per_minute", "lots"),
            ("reward_interval", "-5"),
            ("max_credits_per_day", "0"),
            ("max_sessions_per_day", ""),
            ("is_enabled", "maybe"),
            ("require_claim", ""),
            ("accrual_mode", "hourly"),
        ]);
        assert_eq!(config.credits_per_minute, 1.0);
        assert_eq!(config.reward_interval_seconds, 60);
        assert_eq!(config.max_credits_per_day, None);
        assert_eq!(config.max_sessions_per_day, None);
        assert!(config.is_enabled);
        assert!(config.require_claim);
        assert_eq!(config.accrual_mode, AccrualMode::Tick);
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for clamped values"
    )]
    fn negative_rate_clamps_to_zero_and_explicit_zero_is_kept() {
        assert_eq!(resolve(&[("credits_per_minute", "-2")]).credits_per_minute, 0.0);
        let config = resolve(&[("credits_per_minute", "0"), ("minutes_per_credit", "-1")]);
        assert_eq!(config.credits_per_minute, 0.0);
        assert_eq!(config.minutes_per_credit, None);
    }

    #[test]
    fn disabled_only_when_explicit() {
        assert!(!resolve(&[("is_enabled", "false")]).is_enabled);
        assert!(!resolve(&[("is_enabled", "OFF")]).is_enabled);
    }

    #[test]
    fn store_failure_propagates() {
        let err = SettingsResolver::new("afk").resolve(&DownStore).unwrap_err();
        assert_eq!(err.collaborator, "settings store");
    }

    #[test]
    fn update_normalizes_and_persists() {
        let store = MapStore::default();
        let resolver = SettingsResolver::new("afk");
        assert_eq!(resolver.update(&store, "is_enabled", "No").unwrap(), "0");
        assert_eq!(resolver.update(&store, "max_credits_per_day", " 25 ").unwrap(), "25");
        assert_eq!(resolver.update(&store, "max_time_per_day", "0").unwrap(), "");
        assert_eq!(resolver.update(&store, "accrual_mode", "Session").unwrap(), "session");

        let config = resolver.resolve(&store).unwrap();
        assert!(!config.is_enabled);
        assert_eq!(config.max_credits_per_day, Some(25));
        assert_eq!(config.max_time_per_day_seconds, None);
        assert_eq!(config.accrual_mode, AccrualMode::Session);
    }

    #[test]
    fn update_rejects_bad_input() {
        let store = MapStore::default();
        let resolver = SettingsResolver::new("afk");

        let err = resolver.update(&store, "colour", "blue").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Validation(ValidationError::UnknownSetting { .. })
        ));
        assert!(resolver.update(&store, "credits_per_minute", "-1").is_err());
        assert!(resolver.update(&store, "reward_interval", "0").is_err());
        assert!(resolver.update(&store, "max_sessions_per_day", "-3").is_err());
        assert!(resolver.update(&store, "require_claim", "perhaps").is_err());
        assert!(resolver.update(&store, "accrual_mode", "daily").is_err());
        assert!(store.values.lock().unwrap().is_empty());
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "bounds are exact constants"
    )]
    fn absurd_rates_are_bounded() {
        let config = resolve(&[("credits_per_minute", "1e300"), ("minutes_per_credit", "1e-300")]);
        assert_eq!(config.credits_per_minute, MAX_CREDITS_PER_MINUTE);
        assert_eq!(config.minutes_per_credit, Some(MIN_MINUTES_PER_CREDIT));

        let store = MapStore::default();
        let resolver = SettingsResolver::new("afk");
        assert!(resolver.update(&store, "credits_per_minute", "1e300").is_err());
        assert!(resolver.update(&store, "minutes_per_credit", "1e-300").is_err());
        assert_eq!(
            resolver.update(&store, "credits_per_minute", "1000000").unwrap(),
            "1000000"
        );
    }

    #[test]
    fn setting_keys_roundtrip() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().unwrap(), key);
        }
    }
}
