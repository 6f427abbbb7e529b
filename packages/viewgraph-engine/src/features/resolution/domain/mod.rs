//! Resolution domain
//!
//! - `DependencyNode`: one function application or market-data leaf
//! - `ResolutionError`: why a requirement could not be resolved, with the
//!   chain of rejected candidates
//! - `ResolutionStats`: per-pass instrumentation

mod candidate;

pub use candidate::{
    AmbiguityMode, Candidate, CandidateComparator, FewestWildcards, RegistrationOrder,
    TieBreakPolicy,
};

use crate::features::function_catalog::FunctionId;
use crate::features::value_model::{ValueRequirement, ValueSpecification};
use crate::shared::models::TargetSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use thiserror::Error;

/// Index of a node within its arena (resolution context or graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Directly observable value
    MarketData,
    Function(FunctionId),
}

/// One vertex of a dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub kind: NodeKind,
    pub target: TargetSpec,
    /// Producing nodes, parallel to `input_specifications`
    pub inputs: Vec<NodeId>,
    pub input_specifications: Vec<ValueSpecification>,
    pub output: ValueSpecification,
}

impl DependencyNode {
    pub fn market_data(requirement: &ValueRequirement) -> Self {
        Self {
            kind: NodeKind::MarketData,
            target: requirement.target.clone(),
            inputs: Vec::new(),
            input_specifications: Vec::new(),
            output: ValueSpecification::market_data(requirement),
        }
    }

    pub fn is_market_data(&self) -> bool {
        matches!(self.kind, NodeKind::MarketData)
    }

    pub fn function_id(&self) -> Option<&FunctionId> {
        match &self.kind {
            NodeKind::Function(id) => Some(id),
            NodeKind::MarketData => None,
        }
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::MarketData => write!(f, "MarketData[{}]", self.output),
            NodeKind::Function(id) => write!(f, "{}[{}]", id, self.output),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// `can_apply_to` refused the target
    NotApplicable,
    /// No output template with the requested value name
    NoMatchingOutput,
    /// Templates exist but none composes with the constraints
    IncompatibleProperties,
    /// `requirements` returned `None`
    RequirementsUnavailable,
    /// The (function, target) pair is already being resolved
    CycleDetected,
    InputFailed(Box<ResolutionError>),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NotApplicable => f.write_str("not applicable to target"),
            RejectionReason::NoMatchingOutput => f.write_str("no matching output"),
            RejectionReason::IncompatibleProperties => f.write_str("incompatible properties"),
            RejectionReason::RequirementsUnavailable => f.write_str("requirements unavailable"),
            RejectionReason::CycleDetected => f.write_str("already on the resolution stack"),
            RejectionReason::InputFailed(error) => write!(f, "input failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub function: FunctionId,
    pub reason: RejectionReason,
}

impl RejectedCandidate {
    pub fn new(function: FunctionId, reason: RejectionReason) -> Self {
        Self { function, reason }
    }
}

/// A requirement no candidate could satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub requirement: ValueRequirement,
    pub rejected: Vec<RejectedCandidate>,
    /// Caused (somewhere below) by the cycle guard or depth bound
    pub contextual: bool,
}

impl ResolutionFailure {
    /// Indented rejection tree
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        let _ = writeln!(out, "{}unresolved {}", pad, self.requirement);
        if self.rejected.is_empty() {
            let _ = writeln!(out, "{}  no candidates", pad);
        }
        for candidate in &self.rejected {
            match &candidate.reason {
                RejectionReason::InputFailed(error) => {
                    let _ = writeln!(out, "{}  {}: input failed", pad, candidate.function);
                    match error.as_ref() {
                        ResolutionError::Unresolved(inner) => inner.explain_into(out, indent + 2),
                        other => {
                            let _ = writeln!(out, "{}    {}", pad, other);
                        }
                    }
                }
                reason => {
                    let _ = writeln!(out, "{}  {}: {}", pad, candidate.function, reason);
                }
            }
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to resolve {} ({} candidates rejected)",
            self.requirement,
            self.rejected.len()
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("{0}")]
    Unresolved(ResolutionFailure),

    #[error("Ambiguous resolution of {requirement}: {candidates:?}")]
    Ambiguous {
        requirement: ValueRequirement,
        candidates: Vec<FunctionId>,
    },

    #[error("Cycle detected resolving {requirement}")]
    CycleDetected {
        requirement: ValueRequirement,
        path: Vec<ValueRequirement>,
    },

    #[error("Depth limit {limit} exceeded resolving {requirement}")]
    DepthExceeded {
        requirement: ValueRequirement,
        limit: usize,
    },

    #[error("Unknown target {0}")]
    UnknownTarget(TargetSpec),
}

impl ResolutionError {
    /// True if the failure depends on the recursion stack it happened under
    ///
    /// Contextual failures must not be memoized.
    pub fn is_contextual(&self) -> bool {
        match self {
            ResolutionError::CycleDetected { .. } | ResolutionError::DepthExceeded { .. } => true,
            ResolutionError::Unresolved(failure) => failure.contextual,
            ResolutionError::Ambiguous { .. } | ResolutionError::UnknownTarget(_) => false,
        }
    }

    pub fn requirement(&self) -> Option<&ValueRequirement> {
        match self {
            ResolutionError::Unresolved(failure) => Some(&failure.requirement),
            ResolutionError::Ambiguous { requirement, .. }
            | ResolutionError::CycleDetected { requirement, .. }
            | ResolutionError::DepthExceeded { requirement, .. } => Some(requirement),
            ResolutionError::UnknownTarget(_) => None,
        }
    }
}

/// Counters for one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Calls to `resolve`, memo hits included
    pub requirements: u64,
    pub memo_hits: u64,
    pub market_data_leaves: u64,
    pub function_nodes: u64,
    pub candidates_rejected: u64,
    pub cycle_rejections: u64,
}
