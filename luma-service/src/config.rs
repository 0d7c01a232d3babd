//! Configuration for the recommendation service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use luma_core::ScoringWeights;

use crate::repository::StateScale;

/// Error types for configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// YAML could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },

    /// Builder was not given a collaborator
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Configuration for LUMA.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LumaConfig {
    /// Collaborator read policy
    pub fetch: FetchConfig,
    /// Audit trail settings
    pub audit: AuditConfig,
    /// Scoring weights
    pub weights: ScoringWeights,
    /// Scale the state repository reports on
    pub state_scale: StateScale,
}

impl LumaConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch.timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.fetch.retries > 1 {
            return Err(ConfigError::Invalid {
                key: "fetch.retries",
                message: format!("at most one retry is allowed, got {}", self.fetch.retries),
            });
        }
        if self.fetch.event_limit < self.weights.recency_window {
            return Err(ConfigError::Invalid {
                key: "fetch.event_limit",
                message: format!(
                    "must cover the recency window of {} events",
                    self.weights.recency_window
                ),
            });
        }
        if !self.weights.is_valid() {
            return Err(ConfigError::Invalid {
                key: "weights",
                message: "weights must be finite and non-negative".to_string(),
            });
        }
        if self.audit.max_entries == 0 {
            return Err(ConfigError::Invalid {
                key: "audit.max_entries",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Collaborator read policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Bound on each collaborator call (ms)
    pub timeout_ms: u64,
    /// Extra attempts after a failed read (0 or 1)
    pub retries: u32,
    /// How many recent events to load
    pub event_limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            retries: 0,
            event_limit: 10,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Write a `block_assigned` entry per recommendation
    pub enabled: bool,
    /// Write on a spawned task instead of awaiting inline
    pub detached: bool,
    /// Entries kept by in-memory logs
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detached: true,
            max_entries: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LumaConfig::default();
        assert_eq!(config.fetch.timeout_ms, 2_000);
        assert_eq!(config.fetch.event_limit, 10);
        assert_eq!(config.fetch.retries, 0);
        assert!(config.audit.enabled);
        assert!(config.audit.detached);
        assert_eq!(config.state_scale, StateScale::OneToTen);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = LumaConfig::default();
        config.state_scale = StateScale::Percent;
        config.weights.recency_penalty = 50.0;

        let yaml = config.to_yaml().unwrap();
        let parsed = LumaConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.state_scale, StateScale::Percent);
        assert_eq!(parsed.weights.recency_penalty, 50.0);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "fetch:\n  timeout_ms: 500\nstate_scale: percent\n";
        let config = LumaConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.fetch.timeout_ms, 500);
        assert_eq!(config.fetch.event_limit, 10);
        assert_eq!(config.weights.phase_fit, 25.0);
        assert_eq!(config.state_scale, StateScale::Percent);
    }

    #[test]
    fn test_invalid_values() {
        let err = LumaConfig::from_yaml("fetch:\n  retries: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "fetch.retries", .. }));

        let err = LumaConfig::from_yaml("fetch:\n  event_limit: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "fetch.event_limit", .. }));

        let err = LumaConfig::from_yaml("fetch: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
