//! Error types for the compiled-view cache
//!
//! Durable-tier errors never reach callers of `ViewCache`; the tiered cache
//! logs them and answers with a miss.

use thiserror::Error;
use viewgraph_storage::StorageError;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Durable record format {found} is not supported (expected {expected})")]
    FormatMismatch { found: u32, expected: u32 },

    #[error("Durable record for '{found}' stored under the key of '{expected}'")]
    KeyMismatch { expected: String, found: String },

    #[error("Durable record references unregistered function '{0}'")]
    UnknownFunction(String),

    #[error("Durable {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

pub type CacheResult<T> = Result<T, CacheError>;
