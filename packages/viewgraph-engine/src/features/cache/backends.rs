//! Cache port and the simple backends

use crate::features::cache::{CacheKey, CompiledView, SetOutcome};
use crate::features::function_catalog::CatalogState;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache of compiled views
///
/// # Implementations
///
/// - `NoOpViewCache`: never stores
/// - `InMemoryViewCache`: unbounded `DashMap`
/// - `TieredViewCache`: moka hot tier over a durable `ViewStore`
#[async_trait]
pub trait ViewCache: Send + Sync {
    /// A view only if present, inside its validity window and built at the
    /// live catalog epoch
    async fn get(&self, key: &CacheKey) -> Option<Arc<CompiledView>>;

    /// Install a freshly built view, unless the catalog epoch moved on
    async fn set(&self, key: &CacheKey, view: Arc<CompiledView>) -> SetOutcome;

    async fn clear(&self);

    fn name(&self) -> &'static str;
}

/// Compare a built view against the live epoch
pub(crate) fn check_epoch(view: &CompiledView, catalog: &dyn CatalogState) -> Result<(), SetOutcome> {
    let live_epoch = catalog.current_epoch();
    if view.catalog_epoch == live_epoch {
        Ok(())
    } else {
        warn!(
            key = %view.key,
            view_epoch = view.catalog_epoch,
            live_epoch,
            "Discarding view compiled against a stale catalog"
        );
        Err(SetOutcome::Discarded {
            view_epoch: view.catalog_epoch,
            live_epoch,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpViewCache;

#[async_trait]
impl ViewCache for NoOpViewCache {
    async fn get(&self, _key: &CacheKey) -> Option<Arc<CompiledView>> {
        None
    }

    async fn set(&self, _key: &CacheKey, _view: Arc<CompiledView>) -> SetOutcome {
        SetOutcome::Disabled
    }

    async fn clear(&self) {}

    fn name(&self) -> &'static str {
        "noop"
    }
}

pub struct InMemoryViewCache {
    views: DashMap<CacheKey, Arc<CompiledView>>,
    catalog: Arc<dyn CatalogState>,
}

impl InMemoryViewCache {
    pub fn new(catalog: Arc<dyn CatalogState>) -> Self {
        Self {
            views: DashMap::new(),
            catalog,
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[async_trait]
impl ViewCache for InMemoryViewCache {
    async fn get(&self, key: &CacheKey) -> Option<Arc<CompiledView>> {
        let view = self.views.get(key).map(|entry| Arc::clone(entry.value()))?;
        if view.is_servable(self.catalog.current_epoch(), Utc::now()) {
            return Some(view);
        }

        // Only drop the exact entry observed; a concurrent set may have replaced it
        self.views.remove_if(key, |_, current| Arc::ptr_eq(current, &view));
        debug!(key = %key, "Evicted stale view");
        None
    }

    async fn set(&self, key: &CacheKey, view: Arc<CompiledView>) -> SetOutcome {
        if let Err(outcome) = check_epoch(&view, self.catalog.as_ref()) {
            return outcome;
        }
        self.views.insert(key.clone(), view);
        SetOutcome::Stored
    }

    async fn clear(&self) {
        self.views.clear();
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
