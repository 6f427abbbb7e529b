//! Prometheus metrics for the compiled-view cache
//!
//! Collectors register against a caller-supplied `Registry`. A registration
//! failure (typically a second cache sharing the registry) leaves the
//! collector working but unregistered.

use prometheus::core::Collector;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use tracing::warn;

pub(crate) fn register(registry: &Registry, name: &str, collector: Box<dyn Collector>) {
    if let Err(error) = registry.register(collector) {
        warn!(metric = name, %error, "Metric left unregistered");
    }
}

pub(crate) fn int_counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    register(registry, name, Box::new(counter.clone()));
    Ok(counter)
}

pub(crate) fn int_gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, help))?;
    register(registry, name, Box::new(gauge.clone()));
    Ok(gauge)
}

pub(crate) fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    buckets: Vec<f64>,
) -> prometheus::Result<Histogram> {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))?;
    register(registry, name, Box::new(histogram.clone()));
    Ok(histogram)
}

/// Hot Tier Metrics
#[derive(Clone)]
pub struct HotTierMetrics {
    pub hits: IntCounter,
    pub misses: IntCounter,
    pub entries: IntGauge,
    pub evictions: IntCounter,
    pub bytes: IntGauge,
}

impl HotTierMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            hits: int_counter(registry, "view_cache_hot_hits_total", "Hot tier hits")?,
            misses: int_counter(registry, "view_cache_hot_misses_total", "Hot tier misses")?,
            entries: int_gauge(registry, "view_cache_hot_entries", "Hot tier entry count")?,
            evictions: int_counter(registry, "view_cache_hot_evictions_total", "Hot tier evictions")?,
            bytes: int_gauge(registry, "view_cache_hot_bytes", "Hot tier estimated size in bytes")?,
        })
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.get() as f64;
        let total = hits + self.misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Durable Tier Metrics
#[derive(Clone)]
pub struct DurableTierMetrics {
    pub hits: IntCounter,
    pub misses: IntCounter,
    pub writes: IntCounter,
    pub errors: IntCounter,
    pub read_latency: Histogram,
    pub write_latency: Histogram,
}

impl DurableTierMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            hits: int_counter(registry, "view_cache_durable_hits_total", "Durable tier hits")?,
            misses: int_counter(registry, "view_cache_durable_misses_total", "Durable tier misses")?,
            writes: int_counter(registry, "view_cache_durable_writes_total", "Durable tier writes")?,
            errors: int_counter(
                registry,
                "view_cache_durable_errors_total",
                "Durable tier errors and timeouts, answered as misses",
            )?,
            read_latency: histogram(
                registry,
                "view_cache_durable_read_latency_seconds",
                "Durable tier read latency",
                vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5],
            )?,
            write_latency: histogram(
                registry,
                "view_cache_durable_write_latency_seconds",
                "Durable tier write latency",
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
            )?,
        })
    }
}

/// Tiered Cache Metrics (unified)
#[derive(Clone)]
pub struct TieredCacheMetrics {
    pub hot_hits: IntCounter,
    pub durable_hits: IntCounter,
    pub misses: IntCounter,
    pub discarded_sets: IntCounter,
    pub clears: IntCounter,
    pub total_latency: Histogram,
}

impl TieredCacheMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            hot_hits: int_counter(registry, "view_cache_tiered_hot_hits_total", "Tiered cache hot hits")?,
            durable_hits: int_counter(
                registry,
                "view_cache_tiered_durable_hits_total",
                "Tiered cache durable hits",
            )?,
            misses: int_counter(registry, "view_cache_tiered_misses_total", "Tiered cache total misses")?,
            discarded_sets: int_counter(
                registry,
                "view_cache_discarded_sets_total",
                "Views discarded because the catalog epoch advanced during compilation",
            )?,
            clears: int_counter(registry, "view_cache_clears_total", "Explicit cache clears")?,
            total_latency: histogram(
                registry,
                "view_cache_lookup_latency_seconds",
                "Total cache lookup latency",
                vec![0.000001, 0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0],
            )?,
        })
    }

    pub fn overall_hit_rate(&self) -> f64 {
        let hits = (self.hot_hits.get() + self.durable_hits.get()) as f64;
        let total = hits + self.misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}
