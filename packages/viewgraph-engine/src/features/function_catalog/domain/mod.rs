//! Function Catalog domain
//!
//! A `FunctionDefinition` declares which target type it accepts, which values
//! it can produce for a target, and which further values it needs to produce
//! one of them. Dispatch is a single trait over the `ComputationTarget` union.

use crate::features::value_model::{ValueRequirement, ValueSpecification};
use crate::shared::models::{ComputationTarget, TargetType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable function identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FunctionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionError {
    #[error("Missing input {0}")]
    MissingInput(String),

    #[error("Function {function} failed: {message}")]
    Failed { function: FunctionId, message: String },

    #[error("Function {0} has no executor")]
    NotExecutable(FunctionId),
}

pub type FunctionResult<T> = std::result::Result<T, FunctionError>;

/// Computed input values handed to `execute`, in requirement order
#[derive(Debug, Clone, Default)]
pub struct FunctionInputs {
    values: Vec<(ValueSpecification, serde_json::Value)>,
}

impl FunctionInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: ValueSpecification, value: serde_json::Value) {
        self.values.push((spec, value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ValueSpecification, serde_json::Value)> {
        self.values.iter()
    }

    /// First input satisfying `requirement`
    pub fn get(&self, requirement: &ValueRequirement) -> Option<&serde_json::Value> {
        self.values
            .iter()
            .find(|(spec, _)| requirement.is_satisfied_by(spec))
            .map(|(_, value)| value)
    }

    /// First input named `value_name`, any target
    pub fn by_name(&self, value_name: &str) -> Option<&serde_json::Value> {
        self.values
            .iter()
            .find(|(spec, _)| spec.value_name == value_name)
            .map(|(_, value)| value)
    }

    /// Like `by_name`, but a typed error when absent
    pub fn require(&self, value_name: &str) -> FunctionResult<&serde_json::Value> {
        self.by_name(value_name)
            .ok_or_else(|| FunctionError::MissingInput(value_name.to_string()))
    }

    /// Every input named `value_name`, in order
    pub fn all(&self, value_name: &str) -> Vec<&serde_json::Value> {
        self.values
            .iter()
            .filter(|(spec, _)| spec.value_name == value_name)
            .map(|(_, value)| value)
            .collect()
    }
}

/// A calculation the engine can plan with
///
/// Implementations must be deterministic: the same target and desired value
/// always yield the same results and requirements.
pub trait FunctionDefinition: Send + Sync + fmt::Debug {
    fn id(&self) -> &FunctionId;

    /// Declared target type (subtypes are accepted too)
    fn target_type(&self) -> TargetType;

    fn can_apply_to(&self, _target: &ComputationTarget) -> bool {
        true
    }

    /// Output templates this function can produce for `target`
    fn results(&self, target: &ComputationTarget) -> Vec<ValueSpecification>;

    /// Inputs needed to produce `desired`, or `None` if it cannot
    fn requirements(
        &self,
        target: &ComputationTarget,
        desired: &ValueRequirement,
    ) -> Option<Vec<ValueRequirement>>;

    /// Compute the value described by `output` (opaque to the engine)
    fn execute(
        &self,
        target: &ComputationTarget,
        inputs: &FunctionInputs,
        output: &ValueSpecification,
    ) -> FunctionResult<serde_json::Value>;
}
