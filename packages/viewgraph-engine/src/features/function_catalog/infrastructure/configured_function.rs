//! Builder-configured function definitions
//!
//! Most functions are "produce these outputs for this target type from these
//! inputs". `ConfiguredFunction` captures that shape as plain data plus an
//! opaque executor closure.
//!
//! ```text
//! let pv = ConfiguredFunction::builder("PV", TargetType::Security)
//!     .output("PRESENT_VALUE", PropertyConstraintSet::builder().with_value("Currency", "USD").build())
//!     .input("MARKET_VALUE", InputTarget::SameTarget, PropertyConstraintSet::empty())
//!     .executor(|_, inputs, _| Ok(inputs.require("MARKET_VALUE")?.clone()))
//!     .build();
//! ```

use crate::features::function_catalog::domain::{
    FunctionDefinition, FunctionError, FunctionId, FunctionInputs, FunctionResult,
};
use crate::features::value_model::{
    PropertyConstraintSet, PropertyName, ValueRequirement, ValueSpecification,
};
use crate::shared::models::{ComputationTarget, TargetSpec, TargetType};
use std::fmt;
use std::sync::Arc;

pub type Executor = Arc<
    dyn Fn(&ComputationTarget, &FunctionInputs, &ValueSpecification) -> FunctionResult<serde_json::Value>
        + Send
        + Sync,
>;

/// Where a declared input is requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    /// The function's own target
    SameTarget,
    /// The underlying security of a position or trade
    Security,
    /// Each member: positions and child nodes of a node, members of an aggregate
    Members,
    /// The target-less context
    NoTarget,
    Fixed(TargetSpec),
}

#[derive(Debug, Clone)]
pub struct InputDeclaration {
    pub value_name: String,
    pub target: InputTarget,
    pub constraints: PropertyConstraintSet,
}

pub struct ConfiguredFunction {
    id: FunctionId,
    target_type: TargetType,
    outputs: Vec<(String, PropertyConstraintSet)>,
    inputs: Vec<InputDeclaration>,
    propagated: Vec<PropertyName>,
    security_types: Vec<String>,
    executor: Option<Executor>,
}

impl fmt::Debug for ConfiguredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredFunction")
            .field("id", &self.id)
            .field("target_type", &self.target_type)
            .field("outputs", &self.outputs)
            .field("inputs", &self.inputs)
            .field("propagated", &self.propagated)
            .field("security_types", &self.security_types)
            .field("executable", &self.executor.is_some())
            .finish()
    }
}

impl ConfiguredFunction {
    pub fn builder(id: impl Into<FunctionId>, target_type: TargetType) -> ConfiguredFunctionBuilder {
        ConfiguredFunctionBuilder {
            function: ConfiguredFunction {
                id: id.into(),
                target_type,
                outputs: Vec::new(),
                inputs: Vec::new(),
                propagated: Vec::new(),
                security_types: Vec::new(),
                executor: None,
            },
        }
    }

    fn input_targets(&self, input: &InputTarget, target: &ComputationTarget) -> Option<Vec<TargetSpec>> {
        match input {
            InputTarget::SameTarget => Some(vec![target.spec()]),
            InputTarget::Security => target.security_id().map(|id| vec![TargetSpec::security(id)]),
            InputTarget::Members => Some(target.members()),
            InputTarget::NoTarget => Some(vec![TargetSpec::none()]),
            InputTarget::Fixed(spec) => Some(vec![spec.clone()]),
        }
    }

    /// Input constraints with propagated properties copied from `desired`
    fn input_constraints(&self, declared: &PropertyConstraintSet, desired: &ValueRequirement) -> PropertyConstraintSet {
        self.propagated.iter().fold(declared.clone(), |acc, name| {
            match desired.constraints.get(name.as_str()) {
                Some(constraint) => acc.with(name.clone(), constraint.clone()),
                None => acc,
            }
        })
    }
}

impl FunctionDefinition for ConfiguredFunction {
    fn id(&self) -> &FunctionId {
        &self.id
    }

    fn target_type(&self) -> TargetType {
        self.target_type
    }

    fn can_apply_to(&self, target: &ComputationTarget) -> bool {
        if self.security_types.is_empty() {
            return true;
        }
        target.security_type().is_some_and(|security_type| {
            self.security_types
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(security_type))
        })
    }

    fn results(&self, target: &ComputationTarget) -> Vec<ValueSpecification> {
        let spec = target.spec();
        self.outputs
            .iter()
            .map(|(name, properties)| ValueSpecification::new(name.clone(), spec.clone(), properties.clone()))
            .collect()
    }

    fn requirements(
        &self,
        target: &ComputationTarget,
        desired: &ValueRequirement,
    ) -> Option<Vec<ValueRequirement>> {
        let mut requirements = Vec::new();
        for input in &self.inputs {
            let constraints = self.input_constraints(&input.constraints, desired);
            for spec in self.input_targets(&input.target, target)? {
                requirements.push(ValueRequirement::new(
                    input.value_name.clone(),
                    spec,
                    constraints.clone(),
                ));
            }
        }
        Some(requirements)
    }

    fn execute(
        &self,
        target: &ComputationTarget,
        inputs: &FunctionInputs,
        output: &ValueSpecification,
    ) -> FunctionResult<serde_json::Value> {
        match &self.executor {
            Some(executor) => executor(target, inputs, output),
            None => Err(FunctionError::NotExecutable(self.id.clone())),
        }
    }
}

pub struct ConfiguredFunctionBuilder {
    function: ConfiguredFunction,
}

impl ConfiguredFunctionBuilder {
    /// Declare an output template
    pub fn output(mut self, value_name: impl Into<String>, properties: PropertyConstraintSet) -> Self {
        self.function.outputs.push((value_name.into(), properties));
        self
    }

    /// Declare an input
    pub fn input(
        mut self,
        value_name: impl Into<String>,
        target: InputTarget,
        constraints: PropertyConstraintSet,
    ) -> Self {
        self.function.inputs.push(InputDeclaration {
            value_name: value_name.into(),
            target,
            constraints,
        });
        self
    }

    /// Copy the desired constraint on `name` onto every input
    pub fn propagate(mut self, name: impl Into<PropertyName>) -> Self {
        self.function.propagated.push(name.into());
        self
    }

    /// Only apply to targets whose (underlying) security has one of these types
    pub fn security_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function.security_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn executor<F>(mut self, executor: F) -> Self
    where
        F: Fn(&ComputationTarget, &FunctionInputs, &ValueSpecification) -> FunctionResult<serde_json::Value>
            + Send
            + Sync
            + 'static,
    {
        self.function.executor = Some(Arc::new(executor));
        self
    }

    pub fn build(self) -> ConfiguredFunction {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{PortfolioNodeTarget, Position, Security};
    use serde_json::json;

    fn position() -> ComputationTarget {
        ComputationTarget::Position(Position {
            id: "p1".into(),
            security_id: "42".into(),
            security_type: Some("EQUITY".into()),
            quantity: 10.0,
            parent_node_id: None,
            trade_ids: vec![],
        })
    }

    #[test]
    fn test_security_input_retargets() {
        let function = ConfiguredFunction::builder("POS_PV", TargetType::Position)
            .output("PRESENT_VALUE", PropertyConstraintSet::empty())
            .input("PRESENT_VALUE", InputTarget::Security, PropertyConstraintSet::empty())
            .input("FX_RATES", InputTarget::NoTarget, PropertyConstraintSet::empty())
            .build();

        let desired = ValueRequirement::unconstrained("PRESENT_VALUE", TargetSpec::position("p1"));
        let requirements = function.requirements(&position(), &desired).unwrap();

        assert_eq!(
            requirements,
            vec![
                ValueRequirement::unconstrained("PRESENT_VALUE", TargetSpec::security("42")),
                ValueRequirement::unconstrained("FX_RATES", TargetSpec::none()),
            ]
        );
    }

    #[test]
    fn test_security_input_on_node_is_unavailable() {
        let function = ConfiguredFunction::builder("F", TargetType::PortfolioNode)
            .input("PRESENT_VALUE", InputTarget::Security, PropertyConstraintSet::empty())
            .build();
        let node = ComputationTarget::PortfolioNode(PortfolioNodeTarget {
            id: "root".into(),
            name: "Root".into(),
            parent_id: None,
            child_ids: vec![],
            position_ids: vec![],
        });

        let desired = ValueRequirement::unconstrained("X", node.spec());
        assert!(function.requirements(&node, &desired).is_none());
    }

    #[test]
    fn test_propagated_properties() {
        let function = ConfiguredFunction::builder("SUM", TargetType::Position)
            .output("PRESENT_VALUE", PropertyConstraintSet::builder().with_any("Currency").build())
            .input("PRESENT_VALUE", InputTarget::Security, PropertyConstraintSet::empty())
            .propagate("currency")
            .build();

        let desired = ValueRequirement::new(
            "PRESENT_VALUE",
            TargetSpec::position("p1"),
            PropertyConstraintSet::builder().with_value("Currency", "EUR").build(),
        );
        let requirements = function.requirements(&position(), &desired).unwrap();

        assert_eq!(
            requirements[0].constraints,
            PropertyConstraintSet::builder().with_value("Currency", "EUR").build()
        );
    }

    #[test]
    fn test_security_type_filter() {
        let function = ConfiguredFunction::builder("BOND_PV", TargetType::Security)
            .security_types(["BOND"])
            .build();

        assert!(function.can_apply_to(&ComputationTarget::Security(Security::new("1", "bond", "UST 10Y"))));
        assert!(!function.can_apply_to(&ComputationTarget::Security(Security::new("2", "EQUITY", "ACME"))));
        assert!(!function.can_apply_to(&position()));
    }

    #[test]
    fn test_execute_without_executor() {
        let function = ConfiguredFunction::builder("F", TargetType::Security).build();
        let target = ComputationTarget::Security(Security::new("1", "EQUITY", "ACME"));
        let output = ValueSpecification::new("X", target.spec(), PropertyConstraintSet::empty());

        assert_eq!(
            function.execute(&target, &FunctionInputs::new(), &output),
            Err(FunctionError::NotExecutable(FunctionId::new("F")))
        );

        let doubling = ConfiguredFunction::builder("DOUBLE", TargetType::Security)
            .executor(|_, inputs, _| {
                let value = inputs.require("X")?.as_f64().unwrap_or_default();
                Ok(json!(value * 2.0))
            })
            .build();
        let mut inputs = FunctionInputs::new();
        inputs.push(output.clone(), json!(21.0));
        assert_eq!(doubling.execute(&target, &inputs, &output), Ok(json!(42.0)));
    }
}
