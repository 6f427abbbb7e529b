//! Compilation and execution errors

use crate::features::function_catalog::{FunctionError, FunctionId};
use crate::features::resolution::domain::{NodeId, ResolutionError};
use crate::features::value_model::{ValueRequirement, ValueSpecification};
use crate::shared::models::{TargetSpec, VersionCorrection};
use std::fmt;
use thiserror::Error;

/// A required output that failed to resolve
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredFailure {
    pub calculation_configuration: String,
    pub requirement: ValueRequirement,
    pub error: ResolutionError,
}

impl fmt::Display for RequiredFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.calculation_configuration, self.error)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("{} required output(s) unresolved: {}", failures.len(), summarize(failures))]
    Unresolved { failures: Vec<RequiredFailure> },

    #[error("View definition '{0}' not found")]
    ViewNotFound(String),

    #[error("Portfolio '{id}' not found at {version_correction}")]
    PortfolioNotFound {
        id: String,
        version_correction: VersionCorrection,
    },

    #[error("Compilation cancelled")]
    Cancelled,

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Cyclic dependency graph in calculation configuration '{0}'")]
    CyclicGraph(String),
}

fn summarize(failures: &[RequiredFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("No market data for {spec} (node {node})")]
    MissingMarketData {
        node: NodeId,
        spec: ValueSpecification,
    },

    #[error("Function {function} is not in the catalog (node {node})")]
    UnknownFunction { node: NodeId, function: FunctionId },

    #[error("Target {target} cannot be resolved (node {node})")]
    UnknownTarget { node: NodeId, target: TargetSpec },

    #[error("Node {node} failed: {source}")]
    FunctionFailed {
        node: NodeId,
        #[source]
        source: FunctionError,
    },

    #[error("Graph has no topological order")]
    CyclicGraph,
}
