//! Error types for viewgraph-engine
//!
//! Feature errors stay local (`CompileError`, `CacheError`, ...); `EngineError`
//! is the crate-level union used by construction and the integration surface.

use crate::config::ConfigError;
use crate::features::cache::CacheError;
use crate::features::graph_builder::{CompileError, ExecutionError};
use thiserror::Error;
use viewgraph_storage::StorageError;

/// Main error type for viewgraph-engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Metric registration or collector creation
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl EngineError {
    /// True when retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Compile(CompileError::Cancelled | CompileError::WorkerPool(_))
                | EngineError::Cache(CacheError::Timeout { .. })
                | EngineError::Storage(_)
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
