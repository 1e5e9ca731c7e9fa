//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `evnex.toml` in the working directory. Everything but the
//! account credentials has a default, so the file is optional when the
//! credentials come from the environment. Environment variables take
//! precedence over file values.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use evnex_bridge_adapter_cloud::{CloudConfig, Credentials};
use evnex_bridge_app::services::evnex_integration::EvnexSettings;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    /// Vendor endpoints.
    pub cloud: CloudConfig,
    pub integration: IntegrationConfig,
    pub logging: LoggingConfig,
}

/// Evnex account credentials.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Polling and persistence settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Directory holding the token file.
    pub config_dir: PathBuf,
    /// Key of this account in the token file.
    pub entry_id: String,
    pub poll_interval_secs: u64,
    /// Day window of the organisation insight fetch.
    pub insight_days: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `evnex.toml` (if present), then apply
    /// environment-variable overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("evnex.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("EVNEX_USERNAME") {
            self.account.username = val;
        }
        if let Some(val) = var("EVNEX_PASSWORD") {
            self.account.password = val;
        }
        if let Some(val) = var("EVNEX_CONFIG_DIR") {
            self.integration.config_dir = PathBuf::from(val);
        }
        if let Some(val) = var("EVNEX_ENTRY_ID") {
            self.integration.entry_id = val;
        }
        if let Some(secs) = var("EVNEX_POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.integration.poll_interval_secs = secs;
        }
        if let Some(val) = var("EVNEX_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.account.username.trim().is_empty() {
            return Err(ConfigError::Validation("username must not be empty".to_string()));
        }
        if self.account.password.is_empty() {
            return Err(ConfigError::Validation("password must not be empty".to_string()));
        }
        if self.integration.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.integration.insight_days == 0 {
            return Err(ConfigError::Validation(
                "insight days must be non-zero".to_string(),
            ));
        }
        if self.cloud.timeout_secs == 0 {
            return Err(ConfigError::Validation("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.account.username.trim().to_string(),
            password: self.account.password.clone(),
        }
    }

    #[must_use]
    pub fn evnex_settings(&self) -> EvnexSettings {
        EvnexSettings {
            entry_id: self.integration.entry_id.clone(),
            poll_interval: Duration::from_secs(self.integration.poll_interval_secs),
            insight_days: self.integration.insight_days,
        }
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            entry_id: "default".to_string(),
            poll_interval_secs: 180,
            insight_days: 7,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "evnexd=info,evnex_bridge=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn with_account() -> Config {
        let mut config = Config::default();
        config.account.username = "sam@example.com".to_string();
        config.account.password = "hunter2".to_string();
        config
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.integration.poll_interval_secs, 180);
        assert_eq!(config.integration.insight_days, 7);
        assert_eq!(config.integration.entry_id, "default");
        assert_eq!(config.cloud.api_base_url, "https://client-api.evnex.io");
        assert_eq!(config.logging.filter, "evnexd=info,evnex_bridge=info");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [account]
            username = 'sam@example.com'
            password = 'hunter2'

            [cloud]
            api_base_url = 'http://localhost:9000'
            timeout_secs = 5

            [integration]
            config_dir = '/var/lib/evnex'
            entry_id = 'home'
            poll_interval_secs = 60

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.account.username, "sam@example.com");
        assert_eq!(config.cloud.api_base_url, "http://localhost:9000");
        assert_eq!(config.cloud.timeout_secs, 5);
        assert_eq!(config.integration.config_dir, PathBuf::from("/var/lib/evnex"));
        assert_eq!(config.integration.entry_id, "home");
        assert_eq!(config.integration.poll_interval_secs, 60);
        assert_eq!(config.integration.insight_days, 7);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.integration.poll_interval_secs, 180);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evnex.toml");
        std::fs::write(&path, "invalid {{{").unwrap();

        let result = Config::from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn should_apply_environment_overrides() {
        let env = HashMap::from([
            ("EVNEX_USERNAME", "env@example.com"),
            ("EVNEX_PASSWORD", "secret"),
            ("EVNEX_CONFIG_DIR", "/tmp/evnex"),
            ("EVNEX_POLL_INTERVAL_SECS", "30"),
            ("EVNEX_LOG", "evnexd=debug"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(ToString::to_string));

        assert_eq!(config.account.username, "env@example.com");
        assert_eq!(config.integration.config_dir, PathBuf::from("/tmp/evnex"));
        assert_eq!(config.integration.poll_interval_secs, 30);
        assert_eq!(config.logging.filter, "evnexd=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_prefer_rust_log_over_evnex_log() {
        let env = HashMap::from([("EVNEX_LOG", "info"), ("RUST_LOG", "trace")]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(ToString::to_string));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_interval() {
        let env = HashMap::from([("EVNEX_POLL_INTERVAL_SECS", "soon")]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(ToString::to_string));
        assert_eq!(config.integration.poll_interval_secs, 180);
    }

    #[test]
    fn should_reject_missing_credentials() {
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn should_reject_zero_interval() {
        let mut config = with_account();
        config.integration.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_trim_username_in_credentials() {
        let mut config = with_account();
        config.account.username = "  sam@example.com ".to_string();
        assert_eq!(config.credentials().username, "sam@example.com");
    }

    #[test]
    fn should_not_print_password() {
        let config = with_account();
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn should_build_integration_settings() {
        let settings = with_account().evnex_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(180));
        assert_eq!(settings.entry_id, "default");
    }
}
