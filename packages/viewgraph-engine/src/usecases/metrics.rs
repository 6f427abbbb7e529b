//! Prometheus metrics for the view compiler

use crate::features::cache::{histogram, int_counter, int_gauge};
use prometheus::{Histogram, IntCounter, IntGauge, Registry};

#[derive(Clone)]
pub struct CompilerMetrics {
    pub requests: IntCounter,
    pub cache_hits: IntCounter,
    pub builder_invocations: IntCounter,
    pub single_flight_joins: IntCounter,
    pub failures: IntCounter,
    pub discarded: IntCounter,
    pub in_flight: IntGauge,
    pub compile_latency: Histogram,
}

impl CompilerMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            requests: int_counter(registry, "view_compile_requests_total", "compile() calls")?,
            cache_hits: int_counter(
                registry,
                "view_compile_cache_hits_total",
                "compile() calls answered from the cache",
            )?,
            builder_invocations: int_counter(
                registry,
                "view_compile_builder_invocations_total",
                "Graph builder runs",
            )?,
            single_flight_joins: int_counter(
                registry,
                "view_compile_single_flight_joins_total",
                "compile() calls that joined an in-flight compile",
            )?,
            failures: int_counter(registry, "view_compile_failures_total", "Failed compiles")?,
            discarded: int_counter(
                registry,
                "view_compile_discarded_total",
                "Compiled views not cached because the catalog epoch advanced",
            )?,
            in_flight: int_gauge(registry, "view_compile_in_flight", "Compiles in progress")?,
            compile_latency: histogram(
                registry,
                "view_compile_latency_seconds",
                "Source fetch + graph build latency",
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0],
            )?,
        })
    }
}
