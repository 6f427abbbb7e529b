//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const PRESET_NAMES: [&str; 3] = ["fast", "balanced", "strict"];

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Interactive use: shallow resolution, small hot tier, short timeouts
    ///
    /// - Resolver: max_depth=50, registration-order tie-break
    /// - Cache: 256 hot entries, 50ms durable timeout
    Fast,

    /// Default: fewest-wildcards tie-break, moderate hot tier
    ///
    /// - Resolver: max_depth=100
    /// - Cache: 1024 hot entries, 250ms durable timeout
    #[default]
    Balanced,

    /// Batch/audit: ambiguity is an error, deep resolution
    ///
    /// - Resolver: max_depth=1000, strict ambiguity
    /// - Cache: 1024 hot entries, 1s durable timeout
    Strict,
}

impl Preset {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "strict" => Ok(Self::Strict),
            _ => Err(ConfigError::unknown_preset(s, &PRESET_NAMES)),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
