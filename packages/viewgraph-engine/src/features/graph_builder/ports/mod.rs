//! Graph Builder ports
//!
//! Sources of view definitions, portfolios and (for execution) market data.

use crate::features::graph_builder::domain::{Portfolio, ViewDefinition};
use crate::shared::models::{TargetSpec, VersionCorrection};
use std::sync::Arc;

pub trait ViewDefinitionSource: Send + Sync {
    fn view_definition(&self, id: &str) -> Option<Arc<ViewDefinition>>;
}

pub trait PortfolioSource: Send + Sync {
    /// Portfolio as of `version_correction`
    fn portfolio(&self, id: &str, version_correction: &VersionCorrection) -> Option<Arc<Portfolio>>;
}

/// Observed values for market-data leaves
pub trait MarketDataProvider: Send + Sync {
    fn value(&self, target: &TargetSpec, value_name: &str) -> Option<serde_json::Value>;
}
