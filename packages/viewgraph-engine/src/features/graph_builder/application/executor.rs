//! Graph execution
//!
//! Evaluates a compiled `DependencyGraph` in topological order: market-data
//! leaves read from a `MarketDataProvider`, function nodes call `execute` on
//! the catalog entry with their inputs' values in declaration order.

use crate::features::function_catalog::{CatalogSnapshot, FunctionInputs};
use crate::features::graph_builder::domain::{DependencyGraph, ExecutionError};
use crate::features::graph_builder::ports::MarketDataProvider;
use crate::features::resolution::{NodeId, NodeKind, TargetResolver};
use crate::features::value_model::ValueRequirement;
use std::time::Instant;
use tracing::debug;

/// Computed values of one graph, indexed by node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResults {
    values: Vec<Option<serde_json::Value>>,
    terminals: Vec<(ValueRequirement, NodeId)>,
}

impl ExecutionResults {
    pub fn value_of(&self, node: NodeId) -> Option<&serde_json::Value> {
        self.values.get(node.index()).and_then(Option::as_ref)
    }

    /// Value of a requested output
    pub fn value_for(&self, requirement: &ValueRequirement) -> Option<&serde_json::Value> {
        self.terminals
            .iter()
            .find(|(r, _)| r == requirement)
            .and_then(|(_, node)| self.value_of(*node))
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct GraphExecutor<'a> {
    catalog: &'a CatalogSnapshot,
    targets: &'a dyn TargetResolver,
    market_data: &'a dyn MarketDataProvider,
}

impl<'a> GraphExecutor<'a> {
    pub fn new(
        catalog: &'a CatalogSnapshot,
        targets: &'a dyn TargetResolver,
        market_data: &'a dyn MarketDataProvider,
    ) -> Self {
        Self {
            catalog,
            targets,
            market_data,
        }
    }

    pub fn execute(&self, graph: &DependencyGraph) -> Result<ExecutionResults, ExecutionError> {
        let start = Instant::now();
        let order = graph
            .topological_order()
            .ok_or(ExecutionError::CyclicGraph)?;
        let mut values: Vec<Option<serde_json::Value>> = vec![None; graph.len()];

        for id in order {
            let Some(node) = graph.node(id) else {
                continue;
            };

            let value = match &node.kind {
                NodeKind::MarketData => self
                    .market_data
                    .value(&node.target, &node.output.value_name)
                    .ok_or_else(|| ExecutionError::MissingMarketData {
                        node: id,
                        spec: node.output.clone(),
                    })?,
                NodeKind::Function(function) => {
                    let entry = self.catalog.get(function.as_str()).ok_or_else(|| {
                        ExecutionError::UnknownFunction {
                            node: id,
                            function: function.clone(),
                        }
                    })?;
                    let target = self.targets.resolve(&node.target).ok_or_else(|| {
                        ExecutionError::UnknownTarget {
                            node: id,
                            target: node.target.clone(),
                        }
                    })?;

                    let mut inputs = FunctionInputs::new();
                    for (input, spec) in node.inputs.iter().zip(&node.input_specifications) {
                        // Topological order guarantees inputs ran first
                        if let Some(value) = values.get(input.index()).and_then(Option::as_ref) {
                            inputs.push(spec.clone(), value.clone());
                        }
                    }

                    entry
                        .definition
                        .execute(&target, &inputs, &node.output)
                        .map_err(|source| ExecutionError::FunctionFailed { node: id, source })?
                }
            };
            values[id.index()] = Some(value);
        }

        debug!(
            configuration = %graph.calculation_configuration,
            nodes = graph.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Graph executed"
        );

        Ok(ExecutionResults {
            values,
            terminals: graph
                .terminal_outputs()
                .iter()
                .map(|t| (t.requirement.clone(), t.node))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::features::function_catalog::{ConfiguredFunction, FunctionCatalog, InputTarget};
    use crate::features::graph_builder::domain::{
        CalculationConfiguration, Portfolio, PortfolioPosition, PortfolioRequirement,
        PortfolioTreeNode, TargetUniverse, ViewDefinition,
    };
    use crate::features::graph_builder::infrastructure::{GraphBuilder, StaticMarketData};
    use crate::features::value_model::PropertyConstraintSet;
    use crate::shared::models::{ComputationTarget, Security, TargetSpec, TargetType};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> FunctionCatalog {
        let catalog = FunctionCatalog::new();
        catalog.register(Arc::new(
            ConfiguredFunction::builder("POS_MV", TargetType::Position)
                .output("POSITION_VALUE", PropertyConstraintSet::empty())
                .input("PRICE", InputTarget::Security, PropertyConstraintSet::empty())
                .executor(|target, inputs, _| {
                    let quantity = match target {
                        ComputationTarget::Position(p) => p.quantity,
                        _ => 0.0,
                    };
                    let price = inputs.require("PRICE")?.as_f64().unwrap_or_default();
                    Ok(json!(price * quantity))
                })
                .build(),
        ));
        catalog.register(Arc::new(
            ConfiguredFunction::builder("NODE_SUM", TargetType::PortfolioNode)
                .output("POSITION_VALUE", PropertyConstraintSet::empty())
                .input("POSITION_VALUE", InputTarget::Members, PropertyConstraintSet::empty())
                .executor(|_, inputs, _| {
                    let total: f64 = inputs
                        .all("POSITION_VALUE")
                        .iter()
                        .filter_map(|v| v.as_f64())
                        .sum();
                    Ok(json!(total))
                })
                .build(),
        ));
        catalog
    }

    fn universe() -> TargetUniverse {
        let root = PortfolioTreeNode::new("root", "Root")
            .with_position(PortfolioPosition::new("p1", "s1", 10.0))
            .with_position(PortfolioPosition::new("p2", "s2", 4.0));
        TargetUniverse::from_portfolio(
            &Portfolio::new("pf", "Portfolio", root)
                .with_security(Security::new("s1", "EQUITY", "ACME"))
                .with_security(Security::new("s2", "EQUITY", "INIT")),
        )
    }

    fn view() -> ViewDefinition {
        ViewDefinition::new("v", "View").with_configuration(
            CalculationConfiguration::new("Default").with_portfolio_requirement(
                PortfolioRequirement::new(TargetType::PortfolioNode, "POSITION_VALUE"),
            ),
        )
    }

    #[test]
    fn test_execute_aggregates_positions() {
        let catalog = catalog();
        let snapshot = catalog.snapshot();
        let universe = universe();
        let market_data = StaticMarketData::new()
            .with(TargetSpec::security("s1"), "PRICE", json!(2.5))
            .with(TargetSpec::security("s2"), "PRICE", json!(10.0));
        let config = ResolverConfig::default();

        let output = GraphBuilder::new(&snapshot, &market_data, &config)
            .build(&view(), &universe)
            .unwrap();
        let graph = &output.graphs[0];

        let results = GraphExecutor::new(&snapshot, &universe, &market_data)
            .execute(graph)
            .unwrap();

        let root = ValueRequirement::unconstrained("POSITION_VALUE", TargetSpec::portfolio_node("root"));
        assert_eq!(results.value_for(&root), Some(&json!(65.0)));
        assert_eq!(results.len(), graph.len());
    }

    #[test]
    fn test_missing_market_data() {
        let catalog = catalog();
        let snapshot = catalog.snapshot();
        let universe = universe();
        let planned = StaticMarketData::new()
            .with(TargetSpec::security("s1"), "PRICE", json!(2.5))
            .with(TargetSpec::security("s2"), "PRICE", json!(10.0));
        let config = ResolverConfig::default();
        let graph = GraphBuilder::new(&snapshot, &planned, &config)
            .build(&view(), &universe)
            .unwrap()
            .graphs
            .remove(0);

        let observed = StaticMarketData::new().with(TargetSpec::security("s1"), "PRICE", json!(2.5));
        let err = GraphExecutor::new(&snapshot, &universe, &observed)
            .execute(&graph)
            .unwrap_err();

        assert!(matches!(err, ExecutionError::MissingMarketData { ref spec, .. } if spec.target == TargetSpec::security("s2")));
    }

    #[test]
    fn test_unexecutable_function() {
        let catalog = FunctionCatalog::new();
        catalog.register(Arc::new(
            ConfiguredFunction::builder("PLAN_ONLY", TargetType::Security)
                .output("PV", PropertyConstraintSet::empty())
                .build(),
        ));
        let snapshot = catalog.snapshot();
        let universe = universe();
        let market_data = StaticMarketData::new();
        let config = ResolverConfig::default();
        let view = ViewDefinition::new("v", "View").with_configuration(
            CalculationConfiguration::new("Default")
                .with_portfolio_requirement(PortfolioRequirement::new(TargetType::Security, "PV")),
        );

        let graph = GraphBuilder::new(&snapshot, &market_data, &config)
            .build(&view, &universe)
            .unwrap()
            .graphs
            .remove(0);
        let err = GraphExecutor::new(&snapshot, &universe, &market_data)
            .execute(&graph)
            .unwrap_err();

        assert!(matches!(err, ExecutionError::FunctionFailed { .. }));
    }
}
