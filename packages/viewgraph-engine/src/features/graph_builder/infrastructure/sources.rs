//! In-memory sources
//!
//! DashMap-backed view definition and portfolio sources, plus a static
//! market-data map usable both as availability oracle and value provider.

use crate::features::graph_builder::domain::{Portfolio, ViewDefinition};
use crate::features::graph_builder::ports::{
    MarketDataProvider, PortfolioSource, ViewDefinitionSource,
};
use crate::features::resolution::MarketDataAvailability;
use crate::shared::models::{TargetSpec, VersionCorrection};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct InMemoryViewDefinitionSource {
    views: DashMap<String, Arc<ViewDefinition>>,
}

impl InMemoryViewDefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a view definition
    pub fn insert(&self, view: ViewDefinition) {
        self.views.insert(view.id.clone(), Arc::new(view));
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ViewDefinition>> {
        self.views.remove(id).map(|(_, view)| view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl ViewDefinitionSource for InMemoryViewDefinitionSource {
    fn view_definition(&self, id: &str) -> Option<Arc<ViewDefinition>> {
        self.views.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

#[derive(Debug, Clone)]
struct PortfolioVersion {
    valid_from: Option<DateTime<Utc>>,
    portfolio: Arc<Portfolio>,
}

/// Portfolios with a version history
///
/// Unversioned inserts are valid from the beginning of time. A lookup
/// with an open "as of" returns the newest version; otherwise the last
/// version whose `valid_from` is at or before the instant.
#[derive(Debug, Default)]
pub struct InMemoryPortfolioSource {
    portfolios: DashMap<String, Vec<PortfolioVersion>>,
}

impl InMemoryPortfolioSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, portfolio: Portfolio) {
        self.push_version(None, portfolio);
    }

    pub fn insert_version(&self, portfolio: Portfolio, valid_from: DateTime<Utc>) {
        self.push_version(Some(valid_from), portfolio);
    }

    fn push_version(&self, valid_from: Option<DateTime<Utc>>, portfolio: Portfolio) {
        let mut versions = self.portfolios.entry(portfolio.id.clone()).or_default();
        versions.push(PortfolioVersion {
            valid_from,
            portfolio: Arc::new(portfolio),
        });
        // None sorts first
        versions.sort_by_key(|v| v.valid_from);
    }

    pub fn versions(&self, id: &str) -> usize {
        self.portfolios.get(id).map_or(0, |v| v.len())
    }
}

impl PortfolioSource for InMemoryPortfolioSource {
    fn portfolio(&self, id: &str, version_correction: &VersionCorrection) -> Option<Arc<Portfolio>> {
        let versions = self.portfolios.get(id)?;
        let chosen = match version_correction.version_as_of {
            None => versions.last(),
            Some(as_of) => versions
                .iter()
                .rev()
                .find(|v| v.valid_from.map_or(true, |from| from <= as_of)),
        };
        chosen.map(|v| Arc::clone(&v.portfolio))
    }
}

/// Fixed market data
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    values: HashMap<(TargetSpec, String), serde_json::Value>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: TargetSpec, value_name: impl Into<String>, value: serde_json::Value) -> Self {
        self.insert(target, value_name, value);
        self
    }

    pub fn insert(&mut self, target: TargetSpec, value_name: impl Into<String>, value: serde_json::Value) {
        self.values.insert((target, value_name.into()), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl MarketDataProvider for StaticMarketData {
    fn value(&self, target: &TargetSpec, value_name: &str) -> Option<serde_json::Value> {
        self.values
            .get(&(target.clone(), value_name.to_string()))
            .cloned()
    }
}

impl MarketDataAvailability for StaticMarketData {
    fn is_available(&self, target: &TargetSpec, value_name: &str) -> bool {
        self.values
            .contains_key(&(target.clone(), value_name.to_string()))
    }
}
