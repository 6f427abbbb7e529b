//! Hot tier: bounded in-process cache of compiled views
//!
//! moka future cache, bounded by total estimated bytes and TTL. Each entry
//! weighs at least an equal share of the byte budget, which also caps the
//! entry count at `hot_max_entries`.

use crate::config::CacheConfig;
use crate::features::cache::metrics::HotTierMetrics;
use crate::features::cache::{CacheKey, CompiledView, EstimateSize};
use moka::future::Cache;
use prometheus::Registry;
use std::sync::Arc;
use tracing::debug;

pub struct HotTier {
    cache: Cache<CacheKey, Arc<CompiledView>>,
    metrics: Arc<HotTierMetrics>,
}

impl HotTier {
    pub fn new(config: &CacheConfig, registry: &Registry) -> prometheus::Result<Self> {
        let metrics = Arc::new(HotTierMetrics::new(registry)?);
        let min_weight = (config.hot_max_bytes / config.hot_max_entries.max(1)).max(1);

        let evictions = metrics.evictions.clone();
        let cache = Cache::builder()
            .max_capacity(config.hot_max_bytes)
            .weigher(move |_key: &CacheKey, view: &Arc<CompiledView>| {
                let bytes = view.estimated_size_bytes() as u64;
                u32::try_from(bytes.max(min_weight)).unwrap_or(u32::MAX)
            })
            .time_to_live(config.hot_ttl())
            .eviction_listener(move |key: Arc<CacheKey>, _view, cause| {
                if cause.was_evicted() {
                    evictions.inc();
                    debug!(key = %key, ?cause, "Hot tier evicted view");
                }
            })
            .build();

        Ok(Self { cache, metrics })
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CompiledView>> {
        let result = self.cache.get(key).await;
        if result.is_some() {
            self.metrics.hits.inc();
        } else {
            self.metrics.misses.inc();
        }
        result
    }

    pub async fn insert(&self, key: CacheKey, view: Arc<CompiledView>) {
        self.cache.insert(key, view).await;
        self.update_gauges();
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
        self.update_gauges();
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        self.metrics.entries.set(0);
        self.metrics.bytes.set(0);
    }

    /// Apply pending evictions and refresh counts
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
        self.update_gauges();
    }

    fn update_gauges(&self) {
        self.metrics.entries.set(self.cache.entry_count() as i64);
        self.metrics.bytes.set(self.cache.weighted_size() as i64);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn metrics(&self) -> Arc<HotTierMetrics> {
        Arc::clone(&self.metrics)
    }
}
