//! # Configuration
//!
//! Startup sizing for subscriptions and views. Loaded once; every field has
//! a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! entity_capacity = 65536
//! view_capacity = 1024
//! change_queue_capacity = 4096
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sizing knobs for the subscription layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Pre-size of id-indexed storage (bitsets, component columns).
    pub entity_capacity: usize,
    /// Initial id array capacity of each view.
    pub view_capacity: usize,
    /// Initial capacity of the presence-change queue.
    pub change_queue_capacity: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 1024,
            view_capacity: 256,
            change_queue_capacity: 1024,
        }
    }
}

impl SubscriptionConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, or
    /// [`ConfigError::Invalid`] if a capacity is zero.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SubscriptionConfig::from_toml_str`].
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded subscription config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Checks that every capacity is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first zero field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("entity_capacity", self.entity_capacity),
            ("view_capacity", self.view_capacity),
            ("change_queue_capacity", self.change_queue_capacity),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SubscriptionConfig::default();
        assert_eq!(config.entity_capacity, 1024);
        assert_eq!(config.view_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SubscriptionConfig::from_toml_str("entity_capacity = 4096").unwrap();
        assert_eq!(config.entity_capacity, 4096);
        assert_eq!(config.change_queue_capacity, 1024);

        let empty = SubscriptionConfig::from_toml_str("").unwrap();
        assert_eq!(empty, SubscriptionConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = SubscriptionConfig::from_toml_str("view_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("view_capacity")));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SubscriptionConfig::from_toml_str("entity_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SubscriptionConfig::from_toml_file("/nonexistent/cohort.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SubscriptionConfig {
            entity_capacity: 10,
            view_capacity: 20,
            change_queue_capacity: 30,
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(SubscriptionConfig::from_toml_str(&text).unwrap(), config);
    }
}
