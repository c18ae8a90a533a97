//! Per-feed scheduling defaults.
//!
//! # Responsibility
//! - Hold the initial interval, growth factors and period used when a note is
//!   first bound to a strategy.
//! - Load overrides from JSON; absent fields keep their defaults.
//!
//! # Invariants
//! - `init_interval` and `period` are at least one day.
//! - Every factor is finite and greater than zero.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Scheduling defaults for one feed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedDefaults {
    pub init_interval: i64,
    pub factor: f64,
    pub factor_short: f64,
    pub factor_long: f64,
    /// Day count used by the periodic strategy.
    pub period: i64,
}

impl Default for FeedDefaults {
    fn default() -> Self {
        Self {
            init_interval: 2,
            factor: 3.0,
            factor_short: 2.0,
            factor_long: 3.0,
            period: 7,
        }
    }
}

impl FeedDefaults {
    /// Validates value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.init_interval < 1 {
            return Err(ConfigError::Invalid(format!(
                "init_interval must be at least 1, got {}",
                self.init_interval
            )));
        }
        if self.period < 1 {
            return Err(ConfigError::Invalid(format!(
                "period must be at least 1, got {}",
                self.period
            )));
        }
        for (name, value) in [
            ("factor", self.factor),
            ("factor_short", self.factor_short),
            ("factor_long", self.factor_long),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Defaults for every feed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrbitConfig {
    pub to_review: FeedDefaults,
    pub to_think: FeedDefaults,
}

impl OrbitConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_review.validate()?;
        self.to_think.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, FeedDefaults, OrbitConfig};

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = OrbitConfig::from_json_str(r#"{"to_think": {"factor": 2.5}}"#).unwrap();
        assert_eq!(config.to_review, FeedDefaults::default());
        assert_eq!(config.to_think.factor, 2.5);
        assert_eq!(config.to_think.init_interval, 2);
    }

    #[test]
    fn rejects_non_positive_values() {
        let err = OrbitConfig::from_json_str(r#"{"to_review": {"init_interval": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = OrbitConfig::from_json_str(r#"{"to_review": {"factor": -1.0}}"#).unwrap_err();
        assert!(err.to_string().contains("factor"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = OrbitConfig::from_json_str(r#"{"to_skim": {}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
