//! Test fixtures
//!
//! A small pricing setup:
//!
//! ```text
//! book (root)                 securities
//! ├── p1: 10 x s1             s1  EQUITY  MARKET_VALUE 2.5
//! ├── p2:  4 x s2             s2  BOND    MARKET_VALUE 10.0
//! └── desk
//!     └── p3: 2 x s1
//! ```
//!
//! `POSITION_PV` of the root node is 10*2.5 + 4*10 + 2*2.5 = 70.

use serde_json::json;
use std::sync::Arc;
use viewgraph_engine::features::function_catalog::{ConfiguredFunction, FunctionCatalog, InputTarget};
use viewgraph_engine::features::graph_builder::{
    CalculationConfiguration, Portfolio, PortfolioPosition, PortfolioRequirement, PortfolioTreeNode,
    SpecificRequirement, StaticMarketData, ViewDefinition,
};
use viewgraph_engine::features::value_model::{PropertyConstraintSet, ValueRequirement};
use viewgraph_engine::shared::models::{ComputationTarget, Security, TargetSpec, TargetType};

pub const RISK_VIEW: &str = "risk";
pub const BOOK: &str = "book";

pub fn usd() -> PropertyConstraintSet {
    PropertyConstraintSet::builder().with_value("Currency", "USD").build()
}

pub fn any_currency() -> PropertyConstraintSet {
    PropertyConstraintSet::builder().with_any("Currency").build()
}

/// PV_USD (security) <- MARKET_VALUE, POS_PV (position) <- PRESENT_VALUE,
/// NODE_PV (node) <- POSITION_PV of members
pub fn pricing_catalog() -> Arc<FunctionCatalog> {
    let catalog = Arc::new(FunctionCatalog::new());
    catalog.register(Arc::new(
        ConfiguredFunction::builder("PV_USD", TargetType::Security)
            .output("PRESENT_VALUE", usd())
            .input("MARKET_VALUE", InputTarget::SameTarget, PropertyConstraintSet::empty())
            .executor(|_, inputs, _| Ok(inputs.require("MARKET_VALUE")?.clone()))
            .build(),
    ));
    catalog.register(Arc::new(
        ConfiguredFunction::builder("POS_PV", TargetType::Position)
            .output("POSITION_PV", PropertyConstraintSet::empty())
            .input("PRESENT_VALUE", InputTarget::Security, PropertyConstraintSet::empty())
            .executor(|target, inputs, _| {
                let quantity = match target {
                    ComputationTarget::Position(p) => p.quantity,
                    _ => 0.0,
                };
                let pv = inputs.require("PRESENT_VALUE")?.as_f64().unwrap_or_default();
                Ok(json!(quantity * pv))
            })
            .build(),
    ));
    catalog.register(Arc::new(
        ConfiguredFunction::builder("NODE_PV", TargetType::PortfolioNode)
            .output("POSITION_PV", PropertyConstraintSet::empty())
            .input("POSITION_PV", InputTarget::Members, PropertyConstraintSet::empty())
            .executor(|_, inputs, _| {
                let total: f64 = inputs
                    .all("POSITION_PV")
                    .iter()
                    .filter_map(|v| v.as_f64())
                    .sum();
                Ok(json!(total))
            })
            .build(),
    ));
    catalog
}

pub fn book_portfolio() -> Portfolio {
    let desk = PortfolioTreeNode::new("desk", "Desk").with_position(PortfolioPosition::new("p3", "s1", 2.0));
    let root = PortfolioTreeNode::new(BOOK, "Book")
        .with_position(PortfolioPosition::new("p1", "s1", 10.0))
        .with_position(PortfolioPosition::new("p2", "s2", 4.0))
        .with_child(desk);

    Portfolio::new(BOOK, "Book", root)
        .with_security(Security::new("s1", "EQUITY", "ACME"))
        .with_security(Security::new("s2", "BOND", "ACME 5% 2030"))
}

pub fn market_data() -> StaticMarketData {
    StaticMarketData::new()
        .with(TargetSpec::security("s1"), "MARKET_VALUE", json!(2.5))
        .with(TargetSpec::security("s2"), "MARKET_VALUE", json!(10.0))
}

/// "Default": node totals plus security PVs; "Equities": equity position PVs
pub fn risk_view() -> ViewDefinition {
    ViewDefinition::new(RISK_VIEW, "Risk")
        .with_configuration(
            CalculationConfiguration::new("Default")
                .with_portfolio_requirement(PortfolioRequirement::new(TargetType::PortfolioNode, "POSITION_PV"))
                .with_portfolio_requirement(
                    PortfolioRequirement::new(TargetType::Security, "PRESENT_VALUE")
                        .with_constraints(any_currency()),
                ),
        )
        .with_configuration(
            CalculationConfiguration::new("Equities").with_portfolio_requirement(
                PortfolioRequirement::new(TargetType::Position, "POSITION_PV").for_security_type("EQUITY"),
            ),
        )
}

/// View whose only output is a required value nothing can produce
pub fn unresolvable_view(id: &str) -> ViewDefinition {
    ViewDefinition::new(id, "Broken").with_configuration(
        CalculationConfiguration::new("Default").with_specific_requirement(SpecificRequirement::required(
            ValueRequirement::unconstrained("YIELD", TargetSpec::security("s1")),
        )),
    )
}

pub fn node_pv(node: &str) -> ValueRequirement {
    ValueRequirement::new("POSITION_PV", TargetSpec::portfolio_node(node), PropertyConstraintSet::empty())
}
