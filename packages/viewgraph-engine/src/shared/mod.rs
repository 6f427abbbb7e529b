//! Shared module - Common types used across all features
//!
//! Computation targets and data-version tokens. No dependencies on features.

pub mod models;

// Re-exports for convenience
pub use models::*;
