//! Engine configuration
//!
//! ```rust,ignore
//! let config = EngineConfig::preset(Preset::Balanced)
//!     .resolver(|c| c.max_depth(200))
//!     .cache(|c| c.hot_max_entries(4096))
//!     .build()?;
//! ```

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, ConfigOverrides};
use super::preset::Preset;
use super::validation::{check_range, Validatable};
use crate::features::resolution::domain::{AmbiguityMode, TieBreakPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SUPPORTED_VERSIONS: [u32; 1] = [1];

// ============================================================================
// Resolver
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum recursion depth (1..=10000)
    pub max_depth: usize,

    /// Behaviour when several candidates fully resolve
    pub ambiguity: AmbiguityMode,

    /// Candidate ordering
    pub tie_break: TieBreakPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::for_preset(Preset::Balanced)
    }
}

impl ResolverConfig {
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                max_depth: 50,
                ambiguity: AmbiguityMode::Deterministic,
                tie_break: TieBreakPolicy::RegistrationOrder,
            },
            Preset::Balanced => Self {
                max_depth: 100,
                ambiguity: AmbiguityMode::Deterministic,
                tie_break: TieBreakPolicy::FewestWildcards,
            },
            Preset::Strict => Self {
                max_depth: 1000,
                ambiguity: AmbiguityMode::Strict,
                tie_break: TieBreakPolicy::FewestWildcards,
            },
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn ambiguity(mut self, ambiguity: AmbiguityMode) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    pub fn tie_break(mut self, tie_break: TieBreakPolicy) -> Self {
        self.tie_break = tie_break;
        self
    }
}

impl Validatable for ResolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "resolver.max_depth",
            self.max_depth,
            1,
            10_000,
            "Resolution depth must be at least 1",
        )
    }

    fn config_name(&self) -> &'static str {
        "ResolverConfig"
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Hot tier entry bound (1..=1_000_000)
    pub hot_max_entries: u64,

    /// Hot tier weight bound in estimated bytes
    pub hot_max_bytes: u64,

    /// Hot tier time-to-live
    pub hot_ttl_secs: u64,

    /// Durable tier operation timeout (1..=60000)
    pub durable_timeout_ms: u64,

    /// Validity window of views compiled against a LATEST data version
    pub view_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::for_preset(Preset::Balanced)
    }
}

impl CacheConfig {
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                hot_max_entries: 256,
                hot_max_bytes: 64 * 1024 * 1024,
                hot_ttl_secs: 300,
                durable_timeout_ms: 50,
                view_ttl_secs: 30,
            },
            Preset::Balanced => Self {
                hot_max_entries: 1024,
                hot_max_bytes: 256 * 1024 * 1024,
                hot_ttl_secs: 3600,
                durable_timeout_ms: 250,
                view_ttl_secs: 60,
            },
            Preset::Strict => Self {
                hot_max_entries: 1024,
                hot_max_bytes: 256 * 1024 * 1024,
                hot_ttl_secs: 3600,
                durable_timeout_ms: 1000,
                view_ttl_secs: 60,
            },
        }
    }

    pub fn hot_max_entries(mut self, entries: u64) -> Self {
        self.hot_max_entries = entries;
        self
    }

    pub fn hot_max_bytes(mut self, bytes: u64) -> Self {
        self.hot_max_bytes = bytes;
        self
    }

    pub fn hot_ttl_secs(mut self, secs: u64) -> Self {
        self.hot_ttl_secs = secs;
        self
    }

    pub fn durable_timeout_ms(mut self, ms: u64) -> Self {
        self.durable_timeout_ms = ms;
        self
    }

    pub fn view_ttl_secs(mut self, secs: u64) -> Self {
        self.view_ttl_secs = secs;
        self
    }

    pub fn hot_ttl(&self) -> Duration {
        Duration::from_secs(self.hot_ttl_secs)
    }

    pub fn durable_timeout(&self) -> Duration {
        Duration::from_millis(self.durable_timeout_ms)
    }

    pub fn view_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.view_ttl_secs).unwrap_or(i64::MAX))
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "cache.hot_max_entries",
            self.hot_max_entries,
            1,
            1_000_000,
            "The hot tier must hold at least one view",
        )?;
        check_range(
            "cache.hot_max_bytes",
            self.hot_max_bytes,
            1024,
            64 * 1024 * 1024 * 1024,
            "Weight bound is in estimated bytes",
        )?;
        check_range(
            "cache.hot_ttl_secs",
            self.hot_ttl_secs,
            1,
            7 * 24 * 3600,
            "Hot entries must expire within a week",
        )?;
        check_range(
            "cache.durable_timeout_ms",
            self.durable_timeout_ms,
            1,
            60_000,
            "Durable operations degrade to a miss after this timeout",
        )?;
        check_range(
            "cache.view_ttl_secs",
            self.view_ttl_secs,
            1,
            24 * 3600,
            "LATEST-based views must expire within a day",
        )
    }

    fn config_name(&self) -> &'static str {
        "CacheConfig"
    }
}

// ============================================================================
// Worker pool
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Graph-builder threads; 0 = number of CPUs
    pub threads: usize,
}

impl WorkerConfig {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Effective thread count
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

impl Validatable for WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "worker.threads",
            self.threads,
            0,
            1024,
            "Use 0 to size the pool from the CPU count",
        )
    }

    fn config_name(&self) -> &'static str {
        "WorkerConfig"
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub preset: Preset,
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
    pub worker: WorkerConfig,
}

impl EngineConfig {
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            resolver: ResolverConfig::for_preset(preset),
            cache: CacheConfig::for_preset(preset),
            worker: WorkerConfig::default(),
        }
    }

    pub fn resolver(mut self, f: impl FnOnce(ResolverConfig) -> ResolverConfig) -> Self {
        self.resolver = f(self.resolver);
        self
    }

    pub fn cache(mut self, f: impl FnOnce(CacheConfig) -> CacheConfig) -> Self {
        self.cache = f(self.cache);
        self
    }

    pub fn worker(mut self, f: impl FnOnce(WorkerConfig) -> WorkerConfig) -> Self {
        self.worker = f(self.worker);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Load from a YAML file (v1 schema)
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML text (v1 schema)
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset: Preset = match &export.preset {
            Some(name) => name.parse()?,
            None => Preset::default(),
        };
        let mut config = Self::preset(preset);

        if let Some(overrides) = export.overrides {
            if let Some(resolver) = overrides.resolver {
                config.resolver = resolver;
            }
            if let Some(cache) = overrides.cache {
                config.cache = cache;
            }
            if let Some(worker) = overrides.worker {
                config.worker = worker;
            }
        }

        config.build()
    }

    /// Export as YAML (v1 schema)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(SUPPORTED_VERSIONS[0]),
            preset: Some(self.preset.as_str().to_string()),
            overrides: Some(ConfigOverrides {
                resolver: Some(self.resolver.clone()),
                cache: Some(self.cache.clone()),
                worker: Some(self.worker.clone()),
            }),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}

impl Validatable for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.resolver.validate()?;
        self.cache.validate()?;
        self.worker.validate()
    }

    fn config_name(&self) -> &'static str {
        "EngineConfig"
    }
}
