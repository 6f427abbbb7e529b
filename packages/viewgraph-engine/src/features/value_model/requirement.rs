//! Value requirements and specifications

use super::properties::{PropertyConstraint, PropertyConstraintSet};
use crate::shared::models::TargetSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property naming the function that produced a value
pub const FUNCTION_PROPERTY: &str = "Function";

/// Function id carried by market-data leaves
pub const MARKET_DATA_FUNCTION: &str = "MarketData";

/// A request for a named value on a target under constraints
///
/// Structurally hashable and ordered; the resolver memoizes on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueRequirement {
    pub value_name: String,
    pub target: TargetSpec,
    pub constraints: PropertyConstraintSet,
}

impl ValueRequirement {
    pub fn new(
        value_name: impl Into<String>,
        target: TargetSpec,
        constraints: PropertyConstraintSet,
    ) -> Self {
        Self {
            value_name: value_name.into(),
            target,
            constraints,
        }
    }

    /// Requirement with no constraints
    pub fn unconstrained(value_name: impl Into<String>, target: TargetSpec) -> Self {
        Self::new(value_name, target, PropertyConstraintSet::empty())
    }

    /// Same value name and constraints against another target
    pub fn retarget(&self, target: TargetSpec) -> Self {
        Self {
            value_name: self.value_name.clone(),
            target,
            constraints: self.constraints.clone(),
        }
    }

    /// Does `spec` answer this requirement?
    pub fn is_satisfied_by(&self, spec: &ValueSpecification) -> bool {
        self.value_name == spec.value_name
            && self.target == spec.target
            && self.constraints.is_satisfied_by(&spec.properties)
    }
}

impl fmt::Display for ValueRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value_name, self.target)?;
        if !self.constraints.is_empty() {
            write!(f, " {}", self.constraints)?;
        }
        Ok(())
    }
}

/// A value a function can or does produce
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueSpecification {
    pub value_name: String,
    pub target: TargetSpec,
    pub properties: PropertyConstraintSet,
}

impl ValueSpecification {
    pub fn new(
        value_name: impl Into<String>,
        target: TargetSpec,
        properties: PropertyConstraintSet,
    ) -> Self {
        Self {
            value_name: value_name.into(),
            target,
            properties,
        }
    }

    /// Copy tagged with the producing function id
    pub fn with_function(&self, function_id: &str) -> Self {
        Self {
            value_name: self.value_name.clone(),
            target: self.target.clone(),
            properties: self
                .properties
                .with(FUNCTION_PROPERTY, PropertyConstraint::one_of([function_id])),
        }
    }

    /// Id of the producing function, if tagged
    pub fn function_id(&self) -> Option<&str> {
        self.properties
            .values(FUNCTION_PROPERTY)
            .and_then(|values| values.iter().next())
            .map(String::as_str)
    }

    pub fn is_market_data(&self) -> bool {
        self.function_id() == Some(MARKET_DATA_FUNCTION)
    }

    /// Market-data leaf answering `requirement`
    pub fn market_data(requirement: &ValueRequirement) -> Self {
        Self::new(
            requirement.value_name.clone(),
            requirement.target.clone(),
            requirement.constraints.clone(),
        )
        .with_function(MARKET_DATA_FUNCTION)
    }
}

impl fmt::Display for ValueSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.value_name, self.target, self.properties)
    }
}
