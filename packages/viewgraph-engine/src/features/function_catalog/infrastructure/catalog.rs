//! Epoch-versioned function catalog
//!
//! Copy-on-write: writers build a new `CatalogSnapshot` under the lock and swap
//! it in; readers clone the current `Arc` and never block each other. Every
//! mutation bumps the epoch. Compiled views record the epoch they were built
//! at, so a bump makes them stale.

use crate::features::function_catalog::domain::{FunctionDefinition, FunctionId};
use crate::shared::models::TargetType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default registration priority
pub const DEFAULT_PRIORITY: i32 = 0;

/// Live-epoch view consulted by the compiled-view caches
pub trait CatalogState: Send + Sync {
    fn current_epoch(&self) -> u64;

    fn has_function(&self, id: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub definition: Arc<dyn FunctionDefinition>,
    pub priority: i32,
    /// Registration sequence, the final tie-break
    pub sequence: u64,
}

/// Immutable catalog contents at one epoch
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    epoch: u64,
    entries: Arc<Vec<CatalogEntry>>,
    by_id: Arc<HashMap<FunctionId, usize>>,
}

impl CatalogSnapshot {
    fn from_entries(epoch: u64, mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.definition.id().clone(), i))
            .collect();
        Self {
            epoch,
            entries: Arc::new(entries),
            by_id: Arc::new(by_id),
        }
    }

    fn at_epoch(&self, epoch: u64) -> Self {
        Self {
            epoch,
            entries: Arc::clone(&self.entries),
            by_id: Arc::clone(&self.by_id),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidates for `target_type` or any of its supertypes
    ///
    /// Ordered by priority (highest first), then registration order.
    pub fn lookup(&self, target_type: TargetType) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| target_type.is_assignable_to(entry.definition.target_type()))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id
            .get(&FunctionId::new(id))
            .and_then(|&i| self.entries.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(&FunctionId::new(id))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

/// Registry of function definitions
#[derive(Debug)]
pub struct FunctionCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    epoch: AtomicU64,
    sequence: AtomicU64,
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
            epoch: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register at default priority; returns the new epoch
    pub fn register(&self, definition: Arc<dyn FunctionDefinition>) -> u64 {
        self.register_with_priority(definition, DEFAULT_PRIORITY)
    }

    /// Register (or replace a definition with the same id); returns the new epoch
    pub fn register_with_priority(
        &self,
        definition: Arc<dyn FunctionDefinition>,
        priority: i32,
    ) -> u64 {
        let mut current = self.current.write();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        let mut entries: Vec<CatalogEntry> = current
            .entries
            .iter()
            .filter(|entry| entry.definition.id() != definition.id())
            .cloned()
            .collect();
        debug!(function = %definition.id(), priority, "Registering function");
        entries.push(CatalogEntry {
            definition,
            priority,
            sequence,
        });

        let epoch = current.epoch + 1;
        *current = Arc::new(CatalogSnapshot::from_entries(epoch, entries));
        self.epoch.store(epoch, Ordering::Release);
        epoch
    }

    /// Remove a definition; returns the new epoch, or `None` if it was absent
    pub fn deregister(&self, id: &str) -> Option<u64> {
        let mut current = self.current.write();
        if !current.contains(id) {
            return None;
        }

        let entries: Vec<CatalogEntry> = current
            .entries
            .iter()
            .filter(|entry| entry.definition.id().as_str() != id)
            .cloned()
            .collect();
        debug!(function = id, "Deregistering function");

        let epoch = current.epoch + 1;
        *current = Arc::new(CatalogSnapshot::from_entries(epoch, entries));
        self.epoch.store(epoch, Ordering::Release);
        Some(epoch)
    }

    /// Advance the epoch without changing contents
    pub fn bump_epoch(&self) -> u64 {
        self.advance_epoch_to(0)
    }

    /// Set the epoch to `max(current + 1, epoch)`; returns the new epoch
    pub fn advance_epoch_to(&self, epoch: u64) -> u64 {
        let mut current = self.current.write();
        let next = (current.epoch + 1).max(epoch);
        *current = Arc::new(current.at_epoch(next));
        self.epoch.store(next, Ordering::Release);
        debug!(epoch = next, "Catalog epoch advanced");
        next
    }

    /// Immutable view of the current contents
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogState for FunctionCatalog {
    fn current_epoch(&self) -> u64 {
        self.epoch()
    }

    fn has_function(&self, id: &str) -> bool {
        self.current.read().contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::function_catalog::infrastructure::ConfiguredFunction;
    use crate::features::value_model::PropertyConstraintSet;

    fn function(id: &str, target_type: TargetType) -> Arc<dyn FunctionDefinition> {
        Arc::new(
            ConfiguredFunction::builder(id, target_type)
                .output("PRESENT_VALUE", PropertyConstraintSet::empty())
                .build(),
        )
    }

    fn ids(entries: &[&CatalogEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.definition.id().to_string())
            .collect()
    }

    #[test]
    fn test_lookup_orders_by_priority_then_registration() {
        let catalog = FunctionCatalog::new();
        catalog.register(function("first", TargetType::Security));
        catalog.register(function("second", TargetType::Security));
        catalog.register_with_priority(function("preferred", TargetType::Security), 10);
        catalog.register(function("position", TargetType::Position));

        let snapshot = catalog.snapshot();
        assert_eq!(
            ids(&snapshot.lookup(TargetType::Security)),
            vec!["preferred", "first", "second"]
        );
    }

    #[test]
    fn test_lookup_includes_supertypes() {
        let catalog = FunctionCatalog::new();
        catalog.register(function("position", TargetType::Position));
        catalog.register(function("trade", TargetType::Trade));

        let snapshot = catalog.snapshot();
        assert_eq!(ids(&snapshot.lookup(TargetType::Trade)), vec!["position", "trade"]);
        assert_eq!(ids(&snapshot.lookup(TargetType::Position)), vec!["position"]);
    }

    #[test]
    fn test_every_mutation_bumps_epoch() {
        let catalog = FunctionCatalog::new();
        assert_eq!(catalog.epoch(), 0);

        assert_eq!(catalog.register(function("a", TargetType::Security)), 1);
        assert_eq!(catalog.deregister("a"), Some(2));
        assert_eq!(catalog.deregister("a"), None);
        assert_eq!(catalog.bump_epoch(), 3);
        assert_eq!(catalog.advance_epoch_to(10), 10);
        assert_eq!(catalog.advance_epoch_to(4), 11);
        assert_eq!(catalog.snapshot().epoch(), 11);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let catalog = FunctionCatalog::new();
        catalog.register(function("a", TargetType::Security));
        let before = catalog.snapshot();

        catalog.register(function("b", TargetType::Security));

        assert_eq!(before.len(), 1);
        assert!(!before.contains("b"));
        assert!(catalog.has_function("b"));
    }

    #[test]
    fn test_reregistration_replaces() {
        let catalog = FunctionCatalog::new();
        catalog.register(function("a", TargetType::Security));
        catalog.register(function("a", TargetType::Position));

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("a").map(|e| e.definition.target_type()),
            Some(TargetType::Position)
        );
    }
}
