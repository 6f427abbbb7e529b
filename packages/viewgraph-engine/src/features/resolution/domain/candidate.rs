//! Candidate ordering
//!
//! Several functions may produce a requirement. The resolver tries compatible
//! candidates in comparator order; in strict mode a second fully resolved
//! candidate is an ambiguity error instead.

use crate::features::function_catalog::{FunctionDefinition, FunctionId};
use crate::features::value_model::ValueSpecification;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A compatible candidate function for one requirement
#[derive(Debug, Clone)]
pub struct Candidate {
    pub definition: Arc<dyn FunctionDefinition>,
    /// Position in catalog lookup order (priority, then registration)
    pub rank: usize,
    pub priority: i32,
    /// Output template composed with the requested constraints
    pub output: ValueSpecification,
}

impl Candidate {
    pub fn id(&self) -> &FunctionId {
        self.definition.id()
    }

    pub fn residual_wildcards(&self) -> usize {
        self.output.properties.wildcard_count()
    }
}

pub trait CandidateComparator: Send + Sync + fmt::Debug {
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering;
}

/// Most specific output first, then catalog order
#[derive(Debug, Clone, Copy, Default)]
pub struct FewestWildcards;

impl CandidateComparator for FewestWildcards {
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        a.residual_wildcards()
            .cmp(&b.residual_wildcards())
            .then_with(|| a.rank.cmp(&b.rank))
    }
}

/// Catalog order only
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationOrder;

impl CandidateComparator for RegistrationOrder {
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        a.rank.cmp(&b.rank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    #[default]
    FewestWildcards,
    RegistrationOrder,
}

impl TieBreakPolicy {
    pub fn comparator(&self) -> Arc<dyn CandidateComparator> {
        match self {
            TieBreakPolicy::FewestWildcards => Arc::new(FewestWildcards),
            TieBreakPolicy::RegistrationOrder => Arc::new(RegistrationOrder),
        }
    }
}

/// What to do when more than one candidate fully resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityMode {
    /// Take the first in comparator order
    #[default]
    Deterministic,
    /// Fail with `ResolutionError::Ambiguous`
    Strict,
}
