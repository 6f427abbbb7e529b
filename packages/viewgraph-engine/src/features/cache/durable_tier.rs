//! Durable tier: compiled views in a `ViewStore`
//!
//! Records are msgpack maps `{format_version, key, view}` stored under the
//! key's fingerprint. Loading verifies the embedded key and rehydrates the
//! view against the live catalog: every referenced function must still be
//! registered. Every store operation runs under a timeout.

use crate::features::cache::metrics::DurableTierMetrics;
use crate::features::cache::{CacheError, CacheKey, CacheResult, CompiledView};
use crate::features::function_catalog::CatalogState;
use prometheus::Registry;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use viewgraph_storage::{StoredView, ViewStore};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct RecordRef<'a> {
    format_version: u32,
    key: &'a CacheKey,
    view: &'a CompiledView,
}

#[derive(Deserialize)]
struct Record {
    format_version: u32,
    key: CacheKey,
    view: CompiledView,
}

pub fn encode(key: &CacheKey, view: &CompiledView) -> CacheResult<Vec<u8>> {
    rmp_serde::to_vec_named(&RecordRef {
        format_version: FORMAT_VERSION,
        key,
        view,
    })
    .map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Decode a record and check it against `key` and the live catalog
pub fn decode(key: &CacheKey, payload: &[u8], catalog: &dyn CatalogState) -> CacheResult<CompiledView> {
    let record: Record =
        rmp_serde::from_slice(payload).map_err(|e| CacheError::Deserialization(e.to_string()))?;

    if record.format_version != FORMAT_VERSION {
        return Err(CacheError::FormatMismatch {
            found: record.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if &record.key != key || record.view.key != record.key {
        return Err(CacheError::KeyMismatch {
            expected: key.to_string(),
            found: record.view.key.to_string(),
        });
    }
    if let Some(missing) = record
        .view
        .function_ids()
        .into_iter()
        .find(|id| !catalog.has_function(id))
    {
        return Err(CacheError::UnknownFunction(missing));
    }

    Ok(record.view)
}

pub struct DurableTier {
    store: Arc<dyn ViewStore>,
    timeout: Duration,
    metrics: Arc<DurableTierMetrics>,
}

impl DurableTier {
    pub fn new(store: Arc<dyn ViewStore>, timeout: Duration, registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            store,
            timeout,
            metrics: Arc::new(DurableTierMetrics::new(registry)?),
        })
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> CacheResult<T>
    where
        F: Future<Output = viewgraph_storage::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    pub async fn load(&self, key: &CacheKey, catalog: &dyn CatalogState) -> CacheResult<Option<CompiledView>> {
        let start = Instant::now();
        let fingerprint = key.fingerprint();
        let result = self.bounded("read", self.store.get(&fingerprint)).await;
        self.metrics.read_latency.observe(start.elapsed().as_secs_f64());

        let entry = match result {
            Ok(entry) => entry,
            Err(error) => {
                self.metrics.errors.inc();
                return Err(error);
            }
        };
        let Some(entry) = entry else {
            self.metrics.misses.inc();
            return Ok(None);
        };

        match decode(key, &entry.payload, catalog) {
            Ok(view) => {
                self.metrics.hits.inc();
                Ok(Some(view))
            }
            Err(error) => {
                self.metrics.errors.inc();
                Err(error)
            }
        }
    }

    pub async fn store(&self, key: &CacheKey, view: &CompiledView) -> CacheResult<()> {
        let start = Instant::now();
        let payload = encode(key, view)?;
        let entry = StoredView::with_metadata(
            key.fingerprint(),
            payload,
            serde_json::json!({
                "view_id": key.view_id,
                "portfolio_id": key.portfolio_id,
                "catalog_epoch": view.catalog_epoch,
            }),
        );
        let size = entry.size_bytes();

        let result = self.bounded("write", self.store.put(&entry)).await;
        self.metrics.write_latency.observe(start.elapsed().as_secs_f64());
        match result {
            Ok(()) => {
                self.metrics.writes.inc();
                debug!(key = %key, bytes = size, "Durable tier stored view");
                Ok(())
            }
            Err(error) => {
                self.metrics.errors.inc();
                Err(error)
            }
        }
    }

    pub async fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        self.bounded("remove", self.store.remove(&key.fingerprint())).await
    }

    pub async fn clear(&self) -> CacheResult<()> {
        self.bounded("clear", self.store.clear()).await
    }

    pub async fn len(&self) -> CacheResult<usize> {
        self.bounded("len", self.store.len()).await
    }

    pub fn metrics(&self) -> Arc<DurableTierMetrics> {
        Arc::clone(&self.metrics)
    }
}
