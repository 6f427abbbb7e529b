//! Engine configuration
//!
//! Three levels, as elsewhere in the workspace:
//! - Preset: `EngineConfig::preset(Preset::Fast)`
//! - Section override: `.resolver(|c| c.max_depth(50))`
//! - YAML (v1 schema): `EngineConfig::from_yaml("engine.yaml")`
//!
//! ```rust,ignore
//! use viewgraph_engine::config::{EngineConfig, Preset};
//!
//! let config = EngineConfig::preset(Preset::Balanced)
//!     .cache(|c| c.hot_max_entries(4096))
//!     .build()?;
//! ```

pub mod engine_config;
pub mod error;
pub mod io;
pub mod preset;
pub mod validation;

pub use engine_config::{
    CacheConfig, EngineConfig, ResolverConfig, WorkerConfig, SUPPORTED_VERSIONS,
};
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use preset::Preset;
pub use validation::Validatable;
