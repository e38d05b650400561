//! Monitor configuration structures

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::detect::DEFAULT_THRESHOLD_MINUTES;

pub const DEFAULT_MONITOR_URL: &str = "https://regtest.luminex.pages.dev/spark/pulse";
pub const DEFAULT_API_URL: &str = "https://brc20-api.luminex.io/regtest/spark/pulse";

/// Upper bound for the poll interval (one week)
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// Upper bound for the first-run window (one hundred years)
pub const MAX_THRESHOLD_MINUTES: i64 = 100 * 365 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Minutes between feed polls
    pub check_interval_minutes: u64,
    /// Pulse page, sent as Referer
    pub monitor_url: String,
    /// Pulse API endpoint
    pub api_url: String,
    /// Category requested from the pulse API
    pub pulse_category: String,
    /// First-run "newly created" window
    pub new_token_threshold_minutes: i64,
    pub request_timeout_secs: u64,
    /// Offset used when printing times on the console
    pub timezone_offset_hours: i32,
    /// Bark push endpoint, e.g. `https://api.day.app/<key>`; empty disables pushes
    pub bark_endpoint: String,
    pub bark_push_on_startup: bool,
    /// Token blocks printed per report before summarising the rest
    pub display_limit: usize,
    /// Latest tokens shown on first run when none are recent
    pub startup_preview: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval_minutes: 5,
            monitor_url: DEFAULT_MONITOR_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            pulse_category: "new".to_string(),
            new_token_threshold_minutes: DEFAULT_THRESHOLD_MINUTES,
            request_timeout_secs: 10,
            timezone_offset_hours: 8,
            bark_endpoint: String::new(),
            bark_push_on_startup: true,
            display_limit: 5,
            startup_preview: 3,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Defaults, then the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CHECK_INTERVAL_MINUTES") {
            self.check_interval_minutes = parse_number("CHECK_INTERVAL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("MONITOR_URL") {
            self.monitor_url = v;
        }
        if let Some(v) = lookup("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("PULSE_CATEGORY") {
            self.pulse_category = v;
        }
        if let Some(v) = lookup("NEW_TOKEN_THRESHOLD_MINUTES") {
            self.new_token_threshold_minutes = parse_number("NEW_TOKEN_THRESHOLD_MINUTES", &v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("TIMEZONE_OFFSET_HOURS") {
            self.timezone_offset_hours = parse_number("TIMEZONE_OFFSET_HOURS", &v)?;
        }
        if let Some(v) = lookup("BARK_ENDPOINT") {
            self.bark_endpoint = v;
        }
        if let Some(v) = lookup("BARK_PUSH_ON_STARTUP") {
            self.bark_push_on_startup = v.to_lowercase() == "true";
        }
        if let Some(v) = lookup("DISPLAY_LIMIT") {
            self.display_limit = parse_number("DISPLAY_LIMIT", &v)?;
        }
        if let Some(v) = lookup("STARTUP_PREVIEW") {
            self.startup_preview = parse_number("STARTUP_PREVIEW", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&self.check_interval_minutes) {
            return Err(ConfigError::Invalid(format!(
                "check_interval_minutes must be between 1 and {}: {}",
                MAX_CHECK_INTERVAL_MINUTES, self.check_interval_minutes
            )));
        }
        if !(1..=MAX_THRESHOLD_MINUTES).contains(&self.new_token_threshold_minutes) {
            return Err(ConfigError::Invalid(format!(
                "new_token_threshold_minutes must be between 1 and {}: {}",
                MAX_THRESHOLD_MINUTES, self.new_token_threshold_minutes
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is empty".into()));
        }
        if !(-23..=23).contains(&self.timezone_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "timezone_offset_hours out of range: {}",
                self.timezone_offset_hours
            )));
        }
        Ok(())
    }

    pub fn bark_enabled(&self) -> bool {
        !self.bark_endpoint.trim().is_empty()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} is not a valid number: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.check_interval_minutes, 5);
        assert_eq!(config.new_token_threshold_minutes, 30);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.bark_enabled());
        assert!(config.bark_push_on_startup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("CHECK_INTERVAL_MINUTES", "2"),
                ("BARK_ENDPOINT", "https://api.day.app/key"),
                ("BARK_PUSH_ON_STARTUP", "FALSE"),
                ("NEW_TOKEN_THRESHOLD_MINUTES", "45"),
            ]))
            .unwrap();

        assert_eq!(config.check_interval_minutes, 2);
        assert_eq!(config.new_token_threshold_minutes, 45);
        assert!(config.bark_enabled());
        assert!(!config.bark_push_on_startup);
    }

    #[test]
    fn test_env_bool_only_true_enables() {
        let mut config = Config::default();
        config.apply_env(env(&[("BARK_PUSH_ON_STARTUP", "yes")])).unwrap();
        assert!(!config.bark_push_on_startup);

        config.apply_env(env(&[("BARK_PUSH_ON_STARTUP", "True")])).unwrap();
        assert!(config.bark_push_on_startup);
    }

    #[test]
    fn test_env_bad_number() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("CHECK_INTERVAL_MINUTES", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "check_interval_minutes = 1").unwrap();
        writeln!(file, "bark_endpoint = \"https://api.day.app/abc\"").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.check_interval_minutes, 1);
        assert_eq!(config.bark_endpoint, "https://api.day.app/abc");
        assert_eq!(config.display_limit, 5);
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "check_interval_minutes = \"five").unwrap();
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from_file("/nonexistent/sparkwatch.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = Config::default();
        config.check_interval_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.new_token_threshold_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timezone_offset_hours = 30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api_url = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_threshold() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("NEW_TOKEN_THRESHOLD_MINUTES", "200000000000000000")]))
            .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.new_token_threshold_minutes = MAX_THRESHOLD_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_interval() {
        let mut config = Config::default();
        config.check_interval_minutes = u64::MAX / 10;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.check_interval_minutes = MAX_CHECK_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());
    }
}
