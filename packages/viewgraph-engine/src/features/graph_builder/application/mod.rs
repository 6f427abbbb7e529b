//! Graph Builder application layer

pub mod executor;

pub use executor::{ExecutionResults, GraphExecutor};
