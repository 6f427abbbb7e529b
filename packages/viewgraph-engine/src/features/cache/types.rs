//! Core types for the compiled-view cache

use crate::features::graph_builder::DependencyGraph;
use crate::features::resolution::DependencyNode;
use crate::features::value_model::{PropertyValue, ValueSpecification};
use crate::shared::models::VersionCorrection;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::mem::size_of;

/// Identity of a compiled view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub view_id: String,
    pub portfolio_id: String,
    pub version_correction: VersionCorrection,
}

impl CacheKey {
    pub fn new(
        view_id: impl Into<String>,
        portfolio_id: impl Into<String>,
        version_correction: VersionCorrection,
    ) -> Self {
        Self {
            view_id: view_id.into(),
            portfolio_id: portfolio_id.into(),
            version_correction,
        }
    }

    /// Stable blake3 digest, lowercase hex; the durable-tier storage key
    pub fn fingerprint(&self) -> String {
        let version_as_of = self.version_correction.version_as_of_string();
        let corrected_to = self.version_correction.corrected_to_string();

        let mut hasher = blake3::Hasher::new();
        for part in [
            self.view_id.as_str(),
            self.portfolio_id.as_str(),
            version_as_of.as_str(),
            corrected_to.as_str(),
        ] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.view_id, self.portfolio_id, self.version_correction)
    }
}

/// Trait for estimating object size
pub trait EstimateSize {
    fn estimated_size_bytes(&self) -> usize;
}

/// Dependency graphs of a view compiled for one key
///
/// Immutable once built; a pure function of its key and the catalog epoch
/// it was built at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledView {
    pub key: CacheKey,
    pub graphs: Vec<DependencyGraph>,
    /// Catalog epoch the graphs were resolved against
    pub catalog_epoch: u64,
    pub valid_from: DateTime<Utc>,
    /// Open for fully pinned data versions
    pub valid_to: Option<DateTime<Utc>>,
}

impl CompiledView {
    /// Views keyed on a LATEST data version expire after `latest_ttl`
    pub fn new(
        key: CacheKey,
        graphs: Vec<DependencyGraph>,
        catalog_epoch: u64,
        compiled_at: DateTime<Utc>,
        latest_ttl: Duration,
    ) -> Self {
        let valid_to = key
            .version_correction
            .contains_latest()
            .then(|| compiled_at + latest_ttl);
        Self {
            key,
            graphs,
            catalog_epoch,
            valid_from: compiled_at,
            valid_to,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && self.valid_to.map_or(true, |to| now < to)
    }

    /// Present in a cache and safe to hand out
    pub fn is_servable(&self, live_epoch: u64, now: DateTime<Utc>) -> bool {
        self.catalog_epoch == live_epoch && self.is_valid_at(now)
    }

    pub fn graph(&self, calculation_configuration: &str) -> Option<&DependencyGraph> {
        self.graphs
            .iter()
            .find(|g| g.calculation_configuration == calculation_configuration)
    }

    /// Every function id referenced by any graph
    pub fn function_ids(&self) -> BTreeSet<String> {
        self.graphs
            .iter()
            .flat_map(|g| g.function_ids())
            .map(|id| id.as_str().to_string())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graphs.iter().map(DependencyGraph::len).sum()
    }
}

fn spec_size(spec: &ValueSpecification) -> usize {
    size_of::<ValueSpecification>()
        + spec.value_name.len()
        + spec.target.id.len()
        + spec
            .properties
            .iter()
            .map(|(name, constraint)| {
                let values = match &constraint.value {
                    PropertyValue::Any => 0,
                    PropertyValue::OneOf(values) => values.iter().map(String::len).sum::<usize>(),
                };
                name.as_str().len() + values + 32
            })
            .sum::<usize>()
}

fn node_size(node: &DependencyNode) -> usize {
    size_of::<DependencyNode>()
        + spec_size(&node.output)
        + node.inputs.len() * size_of::<usize>()
        + node.input_specifications.iter().map(spec_size).sum::<usize>()
}

impl EstimateSize for CompiledView {
    fn estimated_size_bytes(&self) -> usize {
        size_of::<Self>()
            + self
                .graphs
                .iter()
                .map(|g| g.nodes().iter().map(node_size).sum::<usize>() + 64)
                .sum::<usize>()
    }
}

/// Result of offering a view to a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Stored,
    /// The catalog moved on while the view was being built
    Discarded { view_epoch: u64, live_epoch: u64 },
    /// Backend never stores
    Disabled,
}

impl SetOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, SetOutcome::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pinned() -> VersionCorrection {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        VersionCorrection::of(Some(t), Some(t))
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = CacheKey::new("v1", "pf", VersionCorrection::LATEST);
        let b = CacheKey::new("v1", "pf", pinned());
        let c = CacheKey::new("v1p", "f", VersionCorrection::LATEST);

        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_latest_views_expire() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let view = CompiledView::new(
            CacheKey::new("v1", "pf", VersionCorrection::LATEST),
            vec![],
            3,
            now,
            Duration::seconds(60),
        );

        assert_eq!(view.valid_to, Some(now + Duration::seconds(60)));
        assert!(view.is_servable(3, now + Duration::seconds(59)));
        assert!(!view.is_servable(3, now + Duration::seconds(60)));
        assert!(!view.is_servable(4, now));
        assert!(!view.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_pinned_views_never_expire() {
        let now = Utc::now();
        let view = CompiledView::new(CacheKey::new("v1", "pf", pinned()), vec![], 0, now, Duration::seconds(1));

        assert_eq!(view.valid_to, None);
        assert!(view.is_servable(0, now + Duration::days(365)));
        assert!(view.estimated_size_bytes() >= size_of::<CompiledView>());
    }
}
