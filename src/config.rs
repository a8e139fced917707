//! Registry configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::waitlist::{DEFAULT_MAX_WAITLIST_SIZE, DEFAULT_URGENT_CUTOFF};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_waitlist_size must be at least 1")]
    ZeroWaitlistSize,
}

/// Tunables of a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Bound on each course's waitlist (default: 50)
    #[serde(default = "default_max_waitlist_size")]
    pub max_waitlist_size: usize,

    /// Requests with a priority at or below this value are urgent (default: 2)
    #[serde(default = "default_urgent_priority_cutoff")]
    pub urgent_priority_cutoff: u32,
}

fn default_max_waitlist_size() -> usize {
    DEFAULT_MAX_WAITLIST_SIZE
}

fn default_urgent_priority_cutoff() -> u32 {
    DEFAULT_URGENT_CUTOFF
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_waitlist_size: default_max_waitlist_size(),
            urgent_priority_cutoff: default_urgent_priority_cutoff(),
        }
    }
}

impl RegistryConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_waitlist_size == 0 {
            return Err(ConfigError::ZeroWaitlistSize);
        }
        Ok(self)
    }
}
