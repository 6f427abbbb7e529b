//! View definitions
//!
//! A view names the outputs wanted from a portfolio, grouped into calculation
//! configurations. Each configuration compiles to its own dependency graph.

use crate::features::value_model::{PropertyConstraintSet, ValueRequirement};
use crate::shared::models::{ComputationTarget, TargetType};
use serde::{Deserialize, Serialize};

/// An output requested for every matching target in the portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioRequirement {
    pub target_type: TargetType,
    /// Only targets whose (underlying) security has this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_type: Option<String>,
    pub value_name: String,
    #[serde(default)]
    pub constraints: PropertyConstraintSet,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl PortfolioRequirement {
    pub fn new(target_type: TargetType, value_name: impl Into<String>) -> Self {
        Self {
            target_type,
            security_type: None,
            value_name: value_name.into(),
            constraints: PropertyConstraintSet::empty(),
            required: true,
        }
    }

    pub fn with_constraints(mut self, constraints: PropertyConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn for_security_type(mut self, security_type: impl Into<String>) -> Self {
        self.security_type = Some(security_type.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn matches(&self, target: &ComputationTarget) -> bool {
        if target.target_type() != self.target_type {
            return false;
        }
        match &self.security_type {
            None => true,
            Some(wanted) => target
                .security_type()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
        }
    }

    pub fn requirement_for(&self, target: &ComputationTarget) -> ValueRequirement {
        ValueRequirement::new(self.value_name.clone(), target.spec(), self.constraints.clone())
    }
}

/// An output requested for one explicit target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificRequirement {
    pub requirement: ValueRequirement,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl SpecificRequirement {
    pub fn required(requirement: ValueRequirement) -> Self {
        Self {
            requirement,
            required: true,
        }
    }

    pub fn optional(requirement: ValueRequirement) -> Self {
        Self {
            requirement,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationConfiguration {
    pub name: String,
    #[serde(default)]
    pub portfolio_requirements: Vec<PortfolioRequirement>,
    #[serde(default)]
    pub specific_requirements: Vec<SpecificRequirement>,
}

impl CalculationConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            portfolio_requirements: Vec::new(),
            specific_requirements: Vec::new(),
        }
    }

    pub fn with_portfolio_requirement(mut self, requirement: PortfolioRequirement) -> Self {
        self.portfolio_requirements.push(requirement);
        self
    }

    pub fn with_specific_requirement(mut self, requirement: SpecificRequirement) -> Self {
        self.specific_requirements.push(requirement);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub id: String,
    pub name: String,
    pub calculation_configurations: Vec<CalculationConfiguration>,
}

impl ViewDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            calculation_configurations: Vec::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: CalculationConfiguration) -> Self {
        self.calculation_configurations.push(configuration);
        self
    }

    pub fn configuration(&self, name: &str) -> Option<&CalculationConfiguration> {
        self.calculation_configurations
            .iter()
            .find(|c| c.name == name)
    }
}
