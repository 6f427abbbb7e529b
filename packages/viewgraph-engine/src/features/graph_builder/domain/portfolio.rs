//! Portfolio trees and the target universe
//!
//! The universe is the ordered set of computation targets a view's portfolio
//! requirements are applied to: pre-order over the tree (node, its positions
//! each followed by their trades, then child nodes), then the referenced
//! securities in first-seen order.

use crate::features::resolution::ports::TargetResolver;
use crate::shared::models::{
    ComputationTarget, PortfolioNodeTarget, Position, Security, TargetSpec, Trade,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTrade {
    pub id: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub id: String,
    pub security_id: String,
    pub quantity: f64,
    #[serde(default)]
    pub trades: Vec<PortfolioTrade>,
}

impl PortfolioPosition {
    pub fn new(id: impl Into<String>, security_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: id.into(),
            security_id: security_id.into(),
            quantity,
            trades: Vec::new(),
        }
    }

    pub fn with_trade(mut self, id: impl Into<String>, quantity: f64) -> Self {
        self.trades.push(PortfolioTrade {
            id: id.into(),
            quantity,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTreeNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub positions: Vec<PortfolioPosition>,
    #[serde(default)]
    pub children: Vec<PortfolioTreeNode>,
}

impl PortfolioTreeNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            positions: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: PortfolioPosition) -> Self {
        self.positions.push(position);
        self
    }

    pub fn with_child(mut self, child: PortfolioTreeNode) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub root: PortfolioTreeNode,
    #[serde(default)]
    pub securities: Vec<Security>,
}

impl Portfolio {
    pub fn new(id: impl Into<String>, name: impl Into<String>, root: PortfolioTreeNode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            root,
            securities: Vec::new(),
        }
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.securities.push(security);
        self
    }
}

/// Ordered, resolvable set of a portfolio's targets
#[derive(Debug, Clone, Default)]
pub struct TargetUniverse {
    order: Vec<TargetSpec>,
    targets: HashMap<TargetSpec, ComputationTarget>,
}

impl TargetUniverse {
    pub fn from_portfolio(portfolio: &Portfolio) -> Self {
        let securities: HashMap<&str, &Security> = portfolio
            .securities
            .iter()
            .map(|s| (s.id.as_str(), s))
            .collect();

        let mut universe = Self::default();
        let mut referenced: Vec<&str> = Vec::new();
        universe.visit(&portfolio.root, None, &securities, &mut referenced);

        for security_id in referenced {
            if let Some(security) = securities.get(security_id) {
                universe.push(ComputationTarget::Security((*security).clone()));
            }
        }
        universe
    }

    fn visit<'p>(
        &mut self,
        node: &'p PortfolioTreeNode,
        parent_id: Option<&str>,
        securities: &HashMap<&str, &Security>,
        referenced: &mut Vec<&'p str>,
    ) {
        self.push(ComputationTarget::PortfolioNode(PortfolioNodeTarget {
            id: node.id.clone(),
            name: node.name.clone(),
            parent_id: parent_id.map(String::from),
            child_ids: node.children.iter().map(|c| c.id.clone()).collect(),
            position_ids: node.positions.iter().map(|p| p.id.clone()).collect(),
        }));

        for position in &node.positions {
            let security_type = securities
                .get(position.security_id.as_str())
                .map(|s| s.security_type.clone());
            if !referenced.contains(&position.security_id.as_str()) {
                referenced.push(position.security_id.as_str());
            }

            self.push(ComputationTarget::Position(Position {
                id: position.id.clone(),
                security_id: position.security_id.clone(),
                security_type: security_type.clone(),
                quantity: position.quantity,
                parent_node_id: Some(node.id.clone()),
                trade_ids: position.trades.iter().map(|t| t.id.clone()).collect(),
            }));
            for trade in &position.trades {
                self.push(ComputationTarget::Trade(Trade {
                    id: trade.id.clone(),
                    position_id: position.id.clone(),
                    security_id: position.security_id.clone(),
                    security_type: security_type.clone(),
                    quantity: trade.quantity,
                }));
            }
        }

        for child in &node.children {
            self.visit(child, Some(node.id.as_str()), securities, referenced);
        }
    }

    /// Add a target; the first target with a given spec wins
    pub fn push(&mut self, target: ComputationTarget) {
        let spec = target.spec();
        if self.targets.contains_key(&spec) {
            return;
        }
        self.order.push(spec.clone());
        self.targets.insert(spec, target);
    }

    pub fn with_target(mut self, target: ComputationTarget) -> Self {
        self.push(target);
        self
    }

    /// Targets in enumeration order
    pub fn targets(&self) -> impl Iterator<Item = &ComputationTarget> {
        self.order.iter().filter_map(|spec| self.targets.get(spec))
    }

    pub fn get(&self, spec: &TargetSpec) -> Option<&ComputationTarget> {
        self.targets.get(spec)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl TargetResolver for TargetUniverse {
    fn resolve(&self, spec: &TargetSpec) -> Option<ComputationTarget> {
        if spec.target_type == crate::shared::models::TargetType::None {
            return Some(ComputationTarget::None);
        }
        self.targets.get(spec).cloned()
    }
}
