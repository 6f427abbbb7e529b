//! Computation targets
//!
//! A computation target is the entity a calculation runs against. Targets are a
//! closed tagged union; functions declare the `TargetType` they accept and the
//! catalog dispatches on it (including declared supertypes).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Target variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    PortfolioNode,
    Position,
    Trade,
    Security,
    Aggregate,
    /// Target-less calculations (curves, surfaces, global settings)
    None,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::PortfolioNode => "PortfolioNode",
            TargetType::Position => "Position",
            TargetType::Trade => "Trade",
            TargetType::Security => "Security",
            TargetType::Aggregate => "Aggregate",
            TargetType::None => "None",
        }
    }

    /// Declared supertypes, nearest first
    ///
    /// A trade can stand in wherever a position is expected, and an aggregate
    /// wherever a portfolio node is.
    pub fn supertypes(&self) -> &'static [TargetType] {
        match self {
            TargetType::Trade => &[TargetType::Position],
            TargetType::Aggregate => &[TargetType::PortfolioNode],
            _ => &[],
        }
    }

    /// True if a function declared for `declared` accepts targets of this type
    pub fn is_assignable_to(&self, declared: TargetType) -> bool {
        *self == declared || self.supertypes().contains(&declared)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hashable reference to a target: (type, id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetSpec {
    pub target_type: TargetType,
    pub id: String,
}

impl TargetSpec {
    pub fn new(target_type: TargetType, id: impl Into<String>) -> Self {
        Self {
            target_type,
            id: id.into(),
        }
    }

    pub fn security(id: impl Into<String>) -> Self {
        Self::new(TargetType::Security, id)
    }

    pub fn position(id: impl Into<String>) -> Self {
        Self::new(TargetType::Position, id)
    }

    pub fn trade(id: impl Into<String>) -> Self {
        Self::new(TargetType::Trade, id)
    }

    pub fn portfolio_node(id: impl Into<String>) -> Self {
        Self::new(TargetType::PortfolioNode, id)
    }

    pub fn aggregate(id: impl Into<String>) -> Self {
        Self::new(TargetType::Aggregate, id)
    }

    /// The target of target-less calculations
    pub fn none() -> Self {
        Self::new(TargetType::None, "")
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target_type == TargetType::None {
            f.write_str("None")
        } else {
            write!(f, "{}#{}", self.target_type, self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub id: String,
    /// Security type used for requirement filtering ("EQUITY", "SWAP", ...)
    pub security_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Security {
    pub fn new(
        id: impl Into<String>,
        security_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            security_type: security_type.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub security_id: String,
    pub security_type: Option<String>,
    pub quantity: f64,
    pub parent_node_id: Option<String>,
    pub trade_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub position_id: String,
    pub security_id: String,
    pub security_type: Option<String>,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioNodeTarget {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub position_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: String,
    pub name: String,
    pub members: Vec<TargetSpec>,
}

/// A resolved computation target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComputationTarget {
    Security(Security),
    Position(Position),
    Trade(Trade),
    PortfolioNode(PortfolioNodeTarget),
    Aggregate(Aggregate),
    None,
}

impl ComputationTarget {
    pub fn target_type(&self) -> TargetType {
        match self {
            ComputationTarget::Security(_) => TargetType::Security,
            ComputationTarget::Position(_) => TargetType::Position,
            ComputationTarget::Trade(_) => TargetType::Trade,
            ComputationTarget::PortfolioNode(_) => TargetType::PortfolioNode,
            ComputationTarget::Aggregate(_) => TargetType::Aggregate,
            ComputationTarget::None => TargetType::None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ComputationTarget::Security(s) => &s.id,
            ComputationTarget::Position(p) => &p.id,
            ComputationTarget::Trade(t) => &t.id,
            ComputationTarget::PortfolioNode(n) => &n.id,
            ComputationTarget::Aggregate(a) => &a.id,
            ComputationTarget::None => "",
        }
    }

    pub fn spec(&self) -> TargetSpec {
        TargetSpec::new(self.target_type(), self.id())
    }

    /// Underlying security id for security-bearing targets
    pub fn security_id(&self) -> Option<&str> {
        match self {
            ComputationTarget::Security(s) => Some(&s.id),
            ComputationTarget::Position(p) => Some(&p.security_id),
            ComputationTarget::Trade(t) => Some(&t.security_id),
            _ => None,
        }
    }

    /// Security type of the target or its underlying security, when known
    pub fn security_type(&self) -> Option<&str> {
        match self {
            ComputationTarget::Security(s) => Some(&s.security_type),
            ComputationTarget::Position(p) => p.security_type.as_deref(),
            ComputationTarget::Trade(t) => t.security_type.as_deref(),
            _ => None,
        }
    }

    /// Child targets whose values roll up into this one
    pub fn members(&self) -> Vec<TargetSpec> {
        match self {
            ComputationTarget::PortfolioNode(node) => node
                .position_ids
                .iter()
                .map(TargetSpec::position)
                .chain(node.child_ids.iter().map(TargetSpec::portfolio_node))
                .collect(),
            ComputationTarget::Aggregate(aggregate) => aggregate.members.clone(),
            ComputationTarget::Position(position) => {
                position.trade_ids.iter().map(TargetSpec::trade).collect()
            }
            _ => Vec::new(),
        }
    }
}
