//! # Coprocessor Backend Policy
//!
//! The mock coprocessor keeps plaintexts in a table anyone holding the
//! backend can read. A deployment that accepts it provides no
//! confidentiality at all, so production mode rejects it outright.
//!
//! ## Configuration
//!
//! The mode is chosen by, in order:
//! 1. `CAV_POLICY_MODE` (`production` | `development`)
//! 2. the build profile: release builds default to `Production`, debug
//!    builds to `Development`.
//!
//! ## Backends
//!
//! Only [`CoprocessorBackend::Mock`] ships with this crate.
//! [`CoprocessorBackend::Tfhe`] is reserved for a TFHE coprocessor that is
//! not yet integrated, so a production-mode engine cannot be constructed
//! until that backend lands. Release builds that run against the mock must
//! select `development` explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from backend policy enforcement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Mock backend rejected in production mode.
    #[error("backend {backend} rejected: production mode requires a real coprocessor")]
    MockBackendRejected {
        /// The rejected backend's name.
        backend: String,
    },
}

/// The kind of coprocessor behind a [`Coprocessor`](crate::Coprocessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoprocessorBackend {
    /// Deterministic plaintext table. No confidentiality.
    Mock,
    /// TFHE-based coprocessor. Reserved: no implementation ships yet, and
    /// the sealed [`Coprocessor`](crate::Coprocessor) trait admits none
    /// outside this crate.
    Tfhe,
}

impl CoprocessorBackend {
    /// Whether this backend provides real confidentiality.
    pub fn is_real(self) -> bool {
        matches!(self, Self::Tfhe)
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mock => "mock-plaintext",
            Self::Tfhe => "tfhe",
        }
    }
}

/// Policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Reject the mock backend unconditionally.
    Production,
    /// Accept any backend (tests and local development only).
    Development,
}

impl std::str::FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown policy mode {other:?}")),
        }
    }
}

/// Runtime policy deciding whether a backend may serve this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendPolicy {
    mode: PolicyMode,
}

impl BackendPolicy {
    /// Create a policy with the given mode.
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    /// Production policy (rejects the mock backend).
    pub fn production() -> Self {
        Self::new(PolicyMode::Production)
    }

    /// Development policy (accepts every backend).
    pub fn development() -> Self {
        Self::new(PolicyMode::Development)
    }

    /// Policy from `CAV_POLICY_MODE`, falling back to the build profile.
    pub fn from_environment() -> Self {
        if let Ok(val) = std::env::var("CAV_POLICY_MODE") {
            if let Ok(mode) = val.parse() {
                return Self::new(mode);
            }
            tracing::warn!(value = %val, "unrecognised CAV_POLICY_MODE, using build default");
        }
        if cfg!(not(debug_assertions)) {
            Self::production()
        } else {
            Self::development()
        }
    }

    /// Validate whether `backend` is acceptable under this policy.
    ///
    /// # Errors
    ///
    /// [`PolicyError::MockBackendRejected`] for the mock backend in production.
    pub fn validate(&self, backend: CoprocessorBackend) -> Result<(), PolicyError> {
        match self.mode {
            PolicyMode::Production if !backend.is_real() => {
                Err(PolicyError::MockBackendRejected {
                    backend: backend.name().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Current policy mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_rejects_mock() {
        let err = BackendPolicy::production()
            .validate(CoprocessorBackend::Mock)
            .unwrap_err();
        assert!(err.to_string().contains("mock-plaintext"));
    }

    #[test]
    fn production_accepts_tfhe() {
        assert!(BackendPolicy::production()
            .validate(CoprocessorBackend::Tfhe)
            .is_ok());
    }

    #[test]
    fn development_accepts_everything() {
        let policy = BackendPolicy::development();
        assert!(policy.validate(CoprocessorBackend::Mock).is_ok());
        assert!(policy.validate(CoprocessorBackend::Tfhe).is_ok());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("PROD".parse::<PolicyMode>(), Ok(PolicyMode::Production));
        assert_eq!("dev".parse::<PolicyMode>(), Ok(PolicyMode::Development));
        assert!("staging".parse::<PolicyMode>().is_err());
    }

    #[test]
    fn mode_serde() {
        let json = serde_json::to_string(&PolicyMode::Production).unwrap();
        assert_eq!(json, "\"production\"");
        let back: PolicyMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PolicyMode::Production);
    }
}
