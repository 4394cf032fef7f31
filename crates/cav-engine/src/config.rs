//! Engine configuration.
//!
//! The public declared bound on submitted attributes, the batch cap for
//! multi-range and multi-peer checks, and the backend policy mode. Defaults
//! match an age attribute. Override via environment variables, a JSON
//! document, or explicit construction for tests.

use cav_core::AttributeSlot;
use cav_fhe::{BackendPolicy, InputConstraint, PolicyMode};
use serde::Deserialize;

/// Configuration for a [`VerificationEngine`](crate::VerificationEngine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slot the engine verifies. Default: `age`.
    pub attribute_slot: AttributeSlot,
    /// Inclusive lower public bound on submitted values. Default: 1.
    pub attribute_min: u8,
    /// Inclusive upper public bound on submitted values. Default: 120.
    pub attribute_max: u8,
    /// Maximum entries in a batch check. Default: 10.
    pub max_batch: usize,
    /// Backend policy mode. Default: from the build profile.
    pub policy_mode: PolicyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attribute_slot: AttributeSlot::age(),
            attribute_min: 1,
            attribute_max: 120,
            max_batch: 10,
            policy_mode: BackendPolicy::from_environment().mode(),
        }
    }
}

impl EngineConfig {
    /// Development configuration with default bounds. Accepts the mock backend.
    pub fn development() -> Self {
        Self {
            policy_mode: PolicyMode::Development,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CAV_ATTRIBUTE_SLOT` (default: `age`)
    /// - `CAV_ATTRIBUTE_MIN` (default: 1)
    /// - `CAV_ATTRIBUTE_MAX` (default: 120)
    /// - `CAV_MAX_BATCH` (default: 10)
    /// - `CAV_POLICY_MODE` (default: from the build profile)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let attribute_slot = match std::env::var("CAV_ATTRIBUTE_SLOT") {
            Ok(raw) => AttributeSlot::new(raw)
                .map_err(|e| ConfigError::InvalidValue("CAV_ATTRIBUTE_SLOT".into(), e.to_string()))?,
            Err(_) => defaults.attribute_slot,
        };
        let config = Self {
            attribute_slot,
            attribute_min: env_parse("CAV_ATTRIBUTE_MIN", defaults.attribute_min)?,
            attribute_max: env_parse("CAV_ATTRIBUTE_MAX", defaults.attribute_max)?,
            max_batch: env_parse("CAV_MAX_BATCH", defaults.max_batch)?,
            policy_mode: env_parse("CAV_POLICY_MODE", defaults.policy_mode)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document. Missing fields
    /// take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the bound and batch cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attribute_min > self.attribute_max {
            return Err(ConfigError::InvertedBound {
                min: self.attribute_min,
                max: self.attribute_max,
            });
        }
        if self.max_batch == 0 {
            return Err(ConfigError::InvalidValue(
                "max_batch".into(),
                "must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The public bound handed to the coprocessor on submission.
    pub fn constraint(&self) -> InputConstraint {
        InputConstraint {
            min: self.attribute_min,
            max: self.attribute_max,
        }
    }

    /// The backend policy this configuration selects.
    pub fn policy(&self) -> BackendPolicy {
        BackendPolicy::new(self.policy_mode)
    }
}

fn env_parse<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A setting failed to parse or is out of range. Carries the setting
    /// name and the reason.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
    /// The public attribute bound has `min` above `max`.
    #[error("attribute bound is inverted: min {min} > max {max}")]
    InvertedBound {
        /// Configured lower bound.
        min: u8,
        /// Configured upper bound.
        max: u8,
    },
    /// The JSON document could not be deserialized.
    #[error("malformed configuration: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_age() {
        let c = EngineConfig::development();
        assert_eq!(c.attribute_slot, AttributeSlot::age());
        assert_eq!(c.constraint(), InputConstraint { min: 1, max: 120 });
        assert_eq!(c.max_batch, 10);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn inverted_bound_rejected() {
        let c = EngineConfig {
            attribute_min: 50,
            attribute_max: 10,
            ..EngineConfig::development()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::InvertedBound { min: 50, max: 10 })
        );
    }

    #[test]
    fn zero_batch_rejected() {
        let c = EngineConfig {
            max_batch: 0,
            ..EngineConfig::development()
        };
        assert!(matches!(c.validate(), Err(ConfigError::InvalidValue(..))));
    }

    #[test]
    fn json_fills_missing_fields() {
        let c = EngineConfig::from_json(r#"{"max_batch": 4, "policy_mode": "development"}"#)
            .unwrap();
        assert_eq!(c.max_batch, 4);
        assert_eq!(c.attribute_max, 120);
        assert_eq!(c.policy_mode, PolicyMode::Development);
    }

    #[test]
    fn json_rejects_bad_slot_and_bound() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"attribute_slot": "Not A Slot"}"#),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"attribute_min": 9, "attribute_max": 3}"#),
            Err(ConfigError::InvertedBound { .. })
        ));
    }

    #[test]
    fn env_parse_falls_back_and_reports() {
        assert_eq!(env_parse("CAV_TEST_UNSET_VARIABLE_XYZ", 7u8), Ok(7));
    }
}
