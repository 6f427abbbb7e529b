//! Tiered Cache: hot → durable facade with promotion
//!
//! - **Read**: hot → durable → miss; a durable hit repopulates hot
//! - **Write**: hot, then durable; stale-epoch views are discarded
//! - **Clear**: hot first, then durable
//!
//! Durable-tier failures and timeouts are logged and answered as misses.
//! A generation counter keeps a read that raced `clear()` from repopulating
//! hot with a view loaded before the clear.

use crate::config::CacheConfig;
use crate::features::cache::backends::{check_epoch, ViewCache};
use crate::features::cache::durable_tier::DurableTier;
use crate::features::cache::hot_tier::HotTier;
use crate::features::cache::metrics::TieredCacheMetrics;
use crate::features::cache::{CacheKey, CompiledView, SetOutcome};
use crate::features::function_catalog::CatalogState;
use async_trait::async_trait;
use chrono::Utc;
use prometheus::Registry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use viewgraph_storage::ViewStore;

pub struct TieredViewCache {
    hot: HotTier,
    durable: DurableTier,
    catalog: Arc<dyn CatalogState>,
    generation: AtomicU64,
    metrics: Arc<TieredCacheMetrics>,
}

impl TieredViewCache {
    pub fn new(
        config: &CacheConfig,
        store: Arc<dyn ViewStore>,
        catalog: Arc<dyn CatalogState>,
        registry: &Registry,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            hot: HotTier::new(config, registry)?,
            durable: DurableTier::new(store, config.durable_timeout(), registry)?,
            catalog,
            generation: AtomicU64::new(0),
            metrics: Arc::new(TieredCacheMetrics::new(registry)?),
        })
    }

    pub fn hot(&self) -> &HotTier {
        &self.hot
    }

    pub fn durable(&self) -> &DurableTier {
        &self.durable
    }

    pub fn metrics(&self) -> Arc<TieredCacheMetrics> {
        Arc::clone(&self.metrics)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Arc<CompiledView>> {
        let live_epoch = self.catalog.current_epoch();

        if let Some(view) = self.hot.get(key).await {
            if view.is_servable(live_epoch, Utc::now()) {
                self.metrics.hot_hits.inc();
                return Some(view);
            }
            debug!(key = %key, "Hot tier held a stale view");
            self.hot.invalidate(key).await;
        }

        let generation = self.generation.load(Ordering::Acquire);
        let view = match self.durable.load(key, self.catalog.as_ref()).await {
            Ok(Some(view)) => view,
            Ok(None) => return None,
            Err(error) => {
                warn!(key = %key, %error, "Durable tier read failed; treating as miss");
                return None;
            }
        };

        if !view.is_servable(live_epoch, Utc::now()) {
            debug!(key = %key, epoch = view.catalog_epoch, "Durable tier held a stale view");
            return None;
        }

        let view = Arc::new(view);
        self.promote(key, Arc::clone(&view), generation).await;
        self.metrics.durable_hits.inc();
        Some(view)
    }

    /// Copy a durable hit into hot, unless a `clear()` started after
    /// `generation` was read
    async fn promote(&self, key: &CacheKey, view: Arc<CompiledView>, generation: u64) {
        self.hot.insert(key.clone(), view).await;
        if self.generation.load(Ordering::Acquire) != generation {
            self.hot.invalidate(key).await;
            debug!(key = %key, "Dropped promotion that raced a clear");
        }
    }
}

#[async_trait]
impl ViewCache for TieredViewCache {
    async fn get(&self, key: &CacheKey) -> Option<Arc<CompiledView>> {
        let start = Instant::now();
        let result = self.lookup(key).await;
        if result.is_none() {
            self.metrics.misses.inc();
        }
        self.metrics
            .total_latency
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn set(&self, key: &CacheKey, view: Arc<CompiledView>) -> SetOutcome {
        if let Err(outcome) = check_epoch(&view, self.catalog.as_ref()) {
            self.metrics.discarded_sets.inc();
            return outcome;
        }

        self.hot.insert(key.clone(), Arc::clone(&view)).await;
        if let Err(error) = self.durable.store(key, &view).await {
            warn!(key = %key, %error, "Durable tier write failed; view cached in hot tier only");
        }
        SetOutcome::Stored
    }

    async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.metrics.clears.inc();
        self.hot.clear().await;
        if let Err(error) = self.durable.clear().await {
            warn!(%error, "Durable tier clear failed");
        }
    }

    fn name(&self) -> &'static str {
        "tiered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::function_catalog::FunctionCatalog;
    use crate::shared::models::VersionCorrection;
    use chrono::Duration;
    use viewgraph_storage::InMemoryViewStore;

    struct Fixture {
        catalog: Arc<FunctionCatalog>,
        store: Arc<InMemoryViewStore>,
        cache: TieredViewCache,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(FunctionCatalog::new());
        let store = Arc::new(InMemoryViewStore::new());
        let cache = TieredViewCache::new(
            &CacheConfig::default(),
            store.clone(),
            catalog.clone(),
            &Registry::new(),
        )
        .unwrap();
        Fixture { catalog, store, cache }
    }

    fn compiled(epoch: u64) -> Arc<CompiledView> {
        Arc::new(CompiledView::new(
            CacheKey::new("v1", "pf", VersionCorrection::LATEST),
            vec![],
            epoch,
            Utc::now(),
            Duration::seconds(60),
        ))
    }

    #[tokio::test]
    async fn test_set_writes_both_tiers() {
        let f = fixture();
        let view = compiled(0);

        assert_eq!(f.cache.set(&view.key, Arc::clone(&view)).await, SetOutcome::Stored);

        assert!(Arc::ptr_eq(&f.cache.get(&view.key).await.unwrap(), &view));
        assert_eq!(f.store.len().await.unwrap(), 1);
        assert_eq!(f.cache.metrics().hot_hits.get(), 1);
    }

    #[tokio::test]
    async fn test_durable_hit_repopulates_hot() {
        let f = fixture();
        let view = compiled(0);
        f.cache.set(&view.key, Arc::clone(&view)).await;
        f.cache.hot().clear().await;

        let loaded = f.cache.get(&view.key).await.unwrap();
        assert_eq!(*loaded, *view);
        assert_eq!(f.cache.metrics().durable_hits.get(), 1);

        f.cache.get(&view.key).await.unwrap();
        assert_eq!(f.cache.metrics().hot_hits.get(), 1);
    }

    #[tokio::test]
    async fn test_stale_set_is_discarded() {
        let f = fixture();
        let view = compiled(0);
        f.catalog.bump_epoch();

        let outcome = f.cache.set(&view.key, Arc::clone(&view)).await;

        assert_eq!(outcome, SetOutcome::Discarded { view_epoch: 0, live_epoch: 1 });
        assert!(f.cache.get(&view.key).await.is_none());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert_eq!(f.cache.metrics().discarded_sets.get(), 1);
    }

    #[tokio::test]
    async fn test_epoch_bump_makes_entries_stale() {
        let f = fixture();
        let view = compiled(0);
        f.cache.set(&view.key, Arc::clone(&view)).await;

        f.catalog.bump_epoch();

        assert!(f.cache.get(&view.key).await.is_none());
        assert_eq!(f.cache.metrics().misses.get(), 1);
    }

    #[tokio::test]
    async fn test_promotion_racing_clear_is_dropped() {
        let f = fixture();
        let view = compiled(0);
        let generation = f.cache.generation.load(Ordering::Acquire);

        f.cache.clear().await;
        f.cache.promote(&view.key, Arc::clone(&view), generation).await;

        assert!(f.cache.hot().get(&view.key).await.is_none());

        let generation = f.cache.generation.load(Ordering::Acquire);
        f.cache.promote(&view.key, Arc::clone(&view), generation).await;
        assert!(f.cache.hot().get(&view.key).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let f = fixture();
        let view = compiled(0);
        f.cache.set(&view.key, Arc::clone(&view)).await;

        f.cache.clear().await;

        assert!(f.cache.get(&view.key).await.is_none());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert_eq!(f.cache.name(), "tiered");
    }
}
