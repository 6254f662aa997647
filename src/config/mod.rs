//! Persisted configuration and usage record.
//!
//! The whole record lives in one JSON file. Every field has a default so a
//! partial or older file still loads.

mod store;
mod usage;

use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AssistError;

pub use store::{ConfigStore, JsonFileStore, MemoryStore};
pub use usage::{RateLimiter, UsageRecord, DAILY_RETENTION_DAYS};

/// Overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "RUSTY_ASSIST_CONFIG";
/// Used when no key is saved in the record.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const APP_DIR: &str = "rusty-assist";
const CONFIG_FILE: &str = "config.json";

/// Accepted range for calls per window.
const RATE_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 10..=120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRecord {
    /// Empty when no key is saved.
    pub api_key: String,
    pub auto_execute: bool,
    /// Shell used to run commands; detected when unset.
    pub preferred_shell: Option<String>,
    pub model: String,
    pub api_base: String,
    pub rate_limit_calls: u32,
    pub rate_limit_window_minutes: u32,
    pub daily_limit: Option<u64>,
    /// Ask the model for a corrected command when one fails.
    pub auto_fix: bool,
    pub command_timeout_secs: u64,
    pub usage: UsageRecord,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auto_execute: false,
            preferred_shell: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            rate_limit_calls: 60,
            rate_limit_window_minutes: 1,
            daily_limit: None,
            auto_fix: true,
            command_timeout_secs: 30,
            usage: UsageRecord::default(),
        }
    }
}

/// Where the API key in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Saved,
    Environment,
}

impl ConfigRecord {
    pub fn rate_limiter(&self) -> RateLimiter {
        let calls = self
            .rate_limit_calls
            .clamp(*RATE_LIMIT_RANGE.start(), *RATE_LIMIT_RANGE.end());
        let minutes = self.rate_limit_window_minutes.max(1);
        RateLimiter::new(calls, chrono::Duration::minutes(i64::from(minutes)), self.daily_limit)
    }

    /// The saved key wins over the environment.
    pub fn resolve_api_key(&self, env_key: Option<&str>) -> Option<(String, KeySource)> {
        let saved = self.api_key.trim();
        if !saved.is_empty() {
            return Some((saved.to_string(), KeySource::Saved));
        }
        env_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| (k.to_string(), KeySource::Environment))
    }

    pub fn require_api_key(&self, env_key: Option<&str>) -> Result<String, AssistError> {
        self.resolve_api_key(env_key).map(|(key, _)| key).ok_or_else(|| {
            AssistError::Configuration(format!(
                "no API key configured; run with --api-key <KEY> or set {}",
                API_KEY_ENV
            ))
        })
    }
}

/// Resolve the configuration file path.
pub fn config_path(env_override: Option<OsString>) -> Result<PathBuf, AssistError> {
    if let Some(path) = env_override.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| {
            AssistError::Configuration(format!(
                "cannot determine a configuration directory; set {}",
                CONFIG_PATH_ENV
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let record = ConfigRecord::default();
        assert!(record.api_key.is_empty());
        assert!(!record.auto_execute);
        assert!(record.auto_fix);
        assert_eq!(record.model, DEFAULT_MODEL);
        assert_eq!(record.usage, UsageRecord::default());
    }

    #[test]
    fn test_partial_record_loads_with_defaults() {
        let record: ConfigRecord = serde_json::from_str(r#"{"auto_execute": true, "usage": {"runs": 4}}"#).unwrap();
        assert!(record.auto_execute);
        assert_eq!(record.usage.runs, 4);
        assert_eq!(record.usage.total_requests, 0);
        assert_eq!(record.rate_limit_calls, 60);
    }

    #[test]
    fn test_rate_limit_is_clamped() {
        let mut record = ConfigRecord {
            rate_limit_calls: 500,
            rate_limit_window_minutes: 0,
            ..Default::default()
        };
        let limiter = record.rate_limiter();
        assert_eq!(limiter.max_calls, 120);
        assert_eq!(limiter.window, chrono::Duration::minutes(1));

        record.rate_limit_calls = 1;
        assert_eq!(record.rate_limiter().max_calls, 10);
    }

    #[test]
    fn test_saved_key_wins_over_environment() {
        let mut record = ConfigRecord::default();
        assert_eq!(record.resolve_api_key(None), None);
        assert_eq!(record.resolve_api_key(Some("  ")), None);
        assert_eq!(
            record.resolve_api_key(Some("AIenv")),
            Some(("AIenv".to_string(), KeySource::Environment))
        );

        record.api_key = "AIsaved".into();
        assert_eq!(
            record.resolve_api_key(Some("AIenv")),
            Some(("AIsaved".to_string(), KeySource::Saved))
        );
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = ConfigRecord::default().require_api_key(None).unwrap_err();
        assert!(matches!(err, AssistError::Configuration(_)));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_config_path_override() {
        let path = config_path(Some(OsString::from("/tmp/custom.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.json"));
    }
}
