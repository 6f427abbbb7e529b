//! End-to-end compile scenarios over the pricing fixtures

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use viewgraph_engine::features::graph_builder::{
    CalculationConfiguration, CompileError, GraphExecutor, PortfolioRequirement, SpecificRequirement,
    TargetUniverse, ViewDefinition,
};
use viewgraph_engine::features::value_model::ValueRequirement;
use viewgraph_engine::shared::models::{TargetSpec, TargetType, VersionCorrection};

#[tokio::test]
async fn test_risk_view_compiles_one_graph_per_configuration() {
    let h = harness();

    let view = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();

    let names: Vec<_> = view.graphs.iter().map(|g| g.calculation_configuration.as_str()).collect();
    assert_eq!(names, vec!["Default", "Equities"]);
    for graph in &view.graphs {
        assert_acyclic(graph);
        assert_unique_leaves(graph);
        assert!(graph.unresolved().is_empty());
    }
    assert_eq!(
        view.function_ids().into_iter().collect::<Vec<_>>(),
        vec!["NODE_PV".to_string(), "POS_PV".to_string(), "PV_USD".to_string()]
    );
}

#[tokio::test]
async fn test_shared_market_value_is_one_leaf() {
    let h = harness();
    let view = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();
    let default = view.graph("Default").unwrap();

    // p1, p3 and the security terminal all consume s1's market value
    assert_eq!(leaf_count(default, &TargetSpec::security("s1"), "MARKET_VALUE"), 1);
    assert_eq!(leaf_count(default, &TargetSpec::security("s2"), "MARKET_VALUE"), 1);

    // Equity positions only: p1 and p3, both over s1
    let equities = view.graph("Equities").unwrap();
    assert_eq!(equities.terminal_outputs().len(), 2);
    assert_eq!(leaf_count(equities, &TargetSpec::security("s2"), "MARKET_VALUE"), 0);
}

#[tokio::test]
async fn test_terminal_carries_composed_currency() {
    let h = harness();
    let view = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();
    let default = view.graph("Default").unwrap();

    let requirement = ValueRequirement::new("PRESENT_VALUE", TargetSpec::security("s1"), any_currency());
    let node = default.terminal_node(&requirement).unwrap();

    assert_eq!(node.function_id().map(|f| f.as_str()), Some("PV_USD"));
    let currencies: Vec<_> = node
        .output
        .properties
        .values("Currency")
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(currencies, vec!["USD".to_string()]);
    assert!(default.node(node.inputs[0]).unwrap().is_market_data());
}

#[tokio::test]
async fn test_compiled_graph_executes() {
    let h = harness();
    let view = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();
    let snapshot = h.catalog.snapshot();
    let universe = TargetUniverse::from_portfolio(&book_portfolio());
    let market_data = market_data();

    let results = GraphExecutor::new(&snapshot, &universe, &market_data)
        .execute(view.graph("Default").unwrap())
        .unwrap();

    assert_eq!(results.value_for(&node_pv(BOOK)), Some(&json!(70.0)));
    assert_eq!(results.value_for(&node_pv("desk")), Some(&json!(5.0)));
}

#[tokio::test]
async fn test_recompile_is_deterministic() {
    let h = harness();
    let first = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();

    h.compiler.clear().await;
    let second = h.compiler.compile(RISK_VIEW, BOOK, VersionCorrection::LATEST).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.graphs, second.graphs);
}

#[tokio::test]
async fn test_required_failure_lists_every_unresolved_output() {
    let h = harness();
    h.views.insert(unresolvable_view("broken"));

    let err = h.compiler.compile("broken", BOOK, VersionCorrection::LATEST).await.unwrap_err();

    match err {
        CompileError::Unresolved { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].calculation_configuration, "Default");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Failures are not cached
    assert!(h.compiler.compile("broken", BOOK, VersionCorrection::LATEST).await.is_err());
    assert_eq!(h.compiler.stats().builder_invocations, 2);
}

#[tokio::test]
async fn test_optional_failure_does_not_block_other_outputs() {
    let h = harness();
    h.views.insert(
        ViewDefinition::new("partial", "Partial").with_configuration(
            CalculationConfiguration::new("Default")
                .with_portfolio_requirement(PortfolioRequirement::new(TargetType::PortfolioNode, "POSITION_PV"))
                .with_specific_requirement(SpecificRequirement::optional(ValueRequirement::unconstrained(
                    "YIELD",
                    TargetSpec::security("s2"),
                ))),
        ),
    );

    let view = h.compiler.compile("partial", BOOK, VersionCorrection::LATEST).await.unwrap();
    let graph = view.graph("Default").unwrap();

    assert_eq!(graph.unresolved().len(), 1);
    assert_eq!(graph.unresolved()[0].requirement.value_name, "YIELD");
    assert!(graph.terminal_for(&node_pv(BOOK)).is_some());
}

#[tokio::test]
async fn test_portfolio_version_as_of() {
    use chrono::{TimeZone, Utc};
    use viewgraph_engine::features::graph_builder::{Portfolio, PortfolioPosition, PortfolioTreeNode};
    use viewgraph_engine::shared::models::Security;

    fn versioned(positions: &[(&str, f64)]) -> Portfolio {
        let root = positions.iter().fold(PortfolioTreeNode::new("vroot", "Root"), |node, (id, qty)| {
            node.with_position(PortfolioPosition::new(*id, "s1", *qty))
        });
        Portfolio::new("versioned", "Versioned", root).with_security(Security::new("s1", "EQUITY", "ACME"))
    }

    let h = harness();
    let at = |y, m| Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).unwrap();
    h.portfolios.insert_version(versioned(&[("q1", 1.0)]), at(2024, 1));
    h.portfolios.insert_version(versioned(&[("q1", 1.0), ("q2", 3.0)]), at(2024, 6));

    let march = VersionCorrection::of(Some(at(2024, 3)), Some(at(2024, 7)));
    let view = h.compiler.compile(RISK_VIEW, "versioned", march).await.unwrap();
    assert_eq!(view.graph("Equities").unwrap().terminal_outputs().len(), 1);
    // Fully pinned: never expires
    assert!(view.valid_to.is_none());

    let latest = h.compiler.compile(RISK_VIEW, "versioned", VersionCorrection::LATEST).await.unwrap();
    assert_eq!(latest.graph("Equities").unwrap().terminal_outputs().len(), 2);
    assert!(latest.valid_to.is_some());

    let before = VersionCorrection::of_version_as_of(at(2023, 1));
    assert!(matches!(
        h.compiler.compile(RISK_VIEW, "versioned", before).await,
        Err(CompileError::PortfolioNotFound { .. })
    ));
}
