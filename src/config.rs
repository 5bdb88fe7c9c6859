//! Probe configuration
//!
//! Defines the knobs a probe run honours:
//! - Per-call HTTP timeout and inter-step delay
//! - Scheme and user agent used against the target host
//! - Well-known capability path and agent payment protocol ids
//! - Revenue baseline table per merchant category
//!
//! Loaded from a TOML file; every field has a default.

use crate::probe::revenue::RevenueBaselines;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a probe run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Timeout for every individual HTTP call, in milliseconds
    pub request_timeout_ms: u64,

    /// Pause before each non-skipped step after the first, in milliseconds
    pub step_delay_ms: u64,

    /// Scheme used to build the base URL from the domain
    pub scheme: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Maximum candidate product URLs kept by discovery
    pub max_candidates: usize,

    /// Well-known agent-payment capability path
    pub well_known_path: String,

    /// Agent payment protocol identifiers that count as detected
    pub agent_protocols: Vec<String>,

    /// Revenue baseline table
    pub baselines: RevenueBaselines,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 8_000,
            step_delay_ms: 1_000,
            scheme: "https".to_string(),
            user_agent: "StorefrontProbe/0.1 (+agent-readiness)".to_string(),
            max_candidates: 25,
            well_known_path: "/.well-known/ucp".to_string(),
            agent_protocols: [
                "ucp",
                "acp",
                "ap2",
                "x402",
                "visa_intelligent_commerce",
                "mastercard_agent_pay",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            baselines: RevenueBaselines::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded probe configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: ProbeConfig = toml::from_str(content)?;
        config.baselines.normalize_keys();
        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: no inter-step delay, short timeout
    pub fn for_tests() -> Self {
        Self {
            request_timeout_ms: 1_000,
            step_delay_ms: 0,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(ConfigError::Invalid(format!(
                "scheme must be http or https, got '{}'",
                self.scheme
            )));
        }
        if !self.well_known_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "well_known_path must start with '/'".to_string(),
            ));
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "max_candidates must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
