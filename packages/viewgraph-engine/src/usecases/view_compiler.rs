//! View Compiler - entry points
//!
//! `compile` turns (view, portfolio, data version) into a `CompiledView`,
//! going through the cache and single-flight coordination; `invalidate`
//! advances the catalog epoch; `clear` empties the cache.
//!
//! ```text
//! compile(key)
//!   ├─ cache.get(key) ──────────────────────────────▶ hit
//!   └─ attach(key)
//!        ├─ follower: wait on the slot
//!        └─ leader: spawn task
//!             ├─ cache.get(key)              (a previous leader may have finished)
//!             ├─ view + portfolio sources
//!             ├─ catalog.snapshot()          (records the epoch)
//!             ├─ GraphBuilder on the rayon pool
//!             ├─ cache.set(key, view)        (discarded if the epoch moved)
//!             └─ publish to every waiter
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let compiler = ViewCompiler::builder(catalog, views, portfolios, availability)
//!     .config(EngineConfig::preset(Preset::Balanced))
//!     .registry(&registry)
//!     .build()?;
//!
//! let view = compiler.compile("risk", "book-1", VersionCorrection::LATEST).await?;
//! println!("{} nodes", view.node_count());
//! ```

use crate::config::{EngineConfig, Validatable};
use crate::errors::Result;
use crate::features::cache::{CacheKey, CompiledView, InMemoryViewCache, SetOutcome, ViewCache};
use crate::features::function_catalog::{CatalogSnapshot, FunctionCatalog};
use crate::features::graph_builder::{
    CompileError, DependencyGraph, GraphBuilder, Portfolio, PortfolioSource, TargetUniverse,
    ViewDefinition, ViewDefinitionSource,
};
use crate::features::resolution::MarketDataAvailability;
use crate::shared::models::VersionCorrection;
use crate::usecases::metrics::CompilerMetrics;
use crate::usecases::single_flight::{Attached, Completion, CompileOutcome, SingleFlight, WaiterGuard};
use chrono::Utc;
use prometheus::Registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Graph-builder worker stack; resolution recursion runs up to `max_depth` deep
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Instrumentation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub builder_invocations: u64,
    pub single_flight_joins: u64,
    pub failures: u64,
    pub discarded: u64,
}

/// One `compile` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub view_id: String,
    pub portfolio_id: String,
    pub version_correction: VersionCorrection,
}

impl CompileRequest {
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
}

struct Inner {
    config: EngineConfig,
    catalog: Arc<FunctionCatalog>,
    views: Arc<dyn ViewDefinitionSource>,
    portfolios: Arc<dyn PortfolioSource>,
    availability: Arc<dyn MarketDataAvailability>,
    cache: Arc<dyn ViewCache>,
    flights: Arc<SingleFlight>,
    pool: rayon::ThreadPool,
    metrics: CompilerMetrics,
}

#[derive(Clone)]
pub struct ViewCompiler {
    inner: Arc<Inner>,
}

pub struct ViewCompilerBuilder {
    config: EngineConfig,
    catalog: Arc<FunctionCatalog>,
    views: Arc<dyn ViewDefinitionSource>,
    portfolios: Arc<dyn PortfolioSource>,
    availability: Arc<dyn MarketDataAvailability>,
    cache: Option<Arc<dyn ViewCache>>,
    registry: Option<Registry>,
}

impl ViewCompilerBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to an `InMemoryViewCache` over the catalog
    pub fn cache(mut self, cache: Arc<dyn ViewCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registry for compiler metrics; a private one is used otherwise
    pub fn registry(mut self, registry: &Registry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn build(self) -> Result<ViewCompiler> {
        self.config.validate()?;

        let threads = self.config.worker.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .stack_size(WORKER_STACK_SIZE)
            .thread_name(|i| format!("viewgraph-build-{i}"))
            .build()
            .map_err(|e| CompileError::WorkerPool(e.to_string()))?;

        let registry = self.registry.unwrap_or_default();
        let metrics = CompilerMetrics::new(&registry)?;
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(InMemoryViewCache::new(self.catalog.clone())),
        };

        info!(
            threads,
            cache = cache.name(),
            preset = %self.config.preset,
            "View compiler ready"
        );

        Ok(ViewCompiler {
            inner: Arc::new(Inner {
                config: self.config,
                catalog: self.catalog,
                views: self.views,
                portfolios: self.portfolios,
                availability: self.availability,
                cache,
                flights: Arc::new(SingleFlight::new()),
                pool,
                metrics,
            }),
        })
    }
}

impl ViewCompiler {
    pub fn builder(
        catalog: Arc<FunctionCatalog>,
        views: Arc<dyn ViewDefinitionSource>,
        portfolios: Arc<dyn PortfolioSource>,
        availability: Arc<dyn MarketDataAvailability>,
    ) -> ViewCompilerBuilder {
        ViewCompilerBuilder {
            config: EngineConfig::default(),
            catalog,
            views,
            portfolios,
            availability,
            cache: None,
            registry: None,
        }
    }

    /// Compile a view, or return the cached compilation
    ///
    /// Concurrent calls for the same key share one compile and observe the
    /// same `Arc`. Dropping the returned future detaches the caller; the
    /// compile is cancelled only when no caller is left waiting.
    pub async fn compile(
        &self,
        view_id: &str,
        portfolio_id: &str,
        version_correction: VersionCorrection,
    ) -> std::result::Result<Arc<CompiledView>, CompileError> {
        let inner = &self.inner;
        let key = CacheKey::new(view_id, portfolio_id, version_correction);
        inner.metrics.requests.inc();

        if let Some(view) = inner.cache.get(&key).await {
            inner.metrics.cache_hits.inc();
            debug!(key = %key, "Compiled view served from cache");
            return Ok(view);
        }

        let attached = inner.flights.attach(&key);
        let flight = Arc::clone(attached.flight());
        let guard = WaiterGuard::new(Arc::clone(&inner.flights), key.clone(), Arc::clone(&flight));

        match attached {
            Attached::Leader(_) => {
                let inner = Arc::clone(inner);
                let completion = Completion::new(Arc::clone(&inner.flights), key.clone(), Arc::clone(&flight));
                let cancelled = flight.cancellation();
                tokio::spawn(async move {
                    inner.metrics.in_flight.inc();
                    let outcome = inner.run(&key, cancelled).await;
                    inner.metrics.in_flight.dec();
                    completion.finish(outcome);
                });
            }
            Attached::Follower(_) => {
                inner.metrics.single_flight_joins.inc();
                debug!(key = %key, "Joined in-flight compile");
            }
        }

        let outcome = flight.wait().await;
        drop(guard);
        outcome
    }

    /// Compile several keys concurrently; results are in request order
    pub async fn compile_many(
        &self,
        requests: Vec<CompileRequest>,
    ) -> Vec<std::result::Result<Arc<CompiledView>, CompileError>> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let compiler = self.clone();
                tokio::spawn(async move {
                    compiler
                        .compile(&request.view_id, &request.portfolio_id, request.version_correction)
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(CompileError::WorkerPool(e.to_string()))),
            );
        }
        results
    }

    /// Raise the catalog epoch to at least `epoch`; returns the new epoch
    ///
    /// Every cached view becomes stale. In-flight compiles finish, but their
    /// results are not cached.
    pub fn invalidate(&self, epoch: u64) -> u64 {
        let live = self.inner.catalog.advance_epoch_to(epoch);
        info!(requested = epoch, epoch = live, "Compiled views invalidated");
        live
    }

    pub async fn clear(&self) {
        self.inner.cache.clear().await;
        info!(cache = self.inner.cache.name(), "View cache cleared");
    }

    pub fn stats(&self) -> CompilerStats {
        let m = &self.inner.metrics;
        CompilerStats {
            requests: m.requests.get(),
            cache_hits: m.cache_hits.get(),
            builder_invocations: m.builder_invocations.get(),
            single_flight_joins: m.single_flight_joins.get(),
            failures: m.failures.get(),
            discarded: m.discarded.get(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.flights.in_flight()
    }

    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.inner.catalog
    }

    pub fn cache(&self) -> &Arc<dyn ViewCache> {
        &self.inner.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl Inner {
    async fn run(&self, key: &CacheKey, cancelled: Arc<AtomicBool>) -> CompileOutcome {
        if let Some(view) = self.cache.get(key).await {
            return Ok(view);
        }

        let start = Instant::now();
        let outcome = self.compile_uncached(key, cancelled).await;
        self.metrics
            .compile_latency
            .observe(start.elapsed().as_secs_f64());

        match &outcome {
            Ok(view) => info!(
                key = %key,
                epoch = view.catalog_epoch,
                graphs = view.graphs.len(),
                nodes = view.node_count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "View compiled"
            ),
            Err(error) => {
                self.metrics.failures.inc();
                info!(key = %key, %error, "View compilation failed");
            }
        }
        outcome
    }

    async fn compile_uncached(&self, key: &CacheKey, cancelled: Arc<AtomicBool>) -> CompileOutcome {
        let view = self
            .views
            .view_definition(&key.view_id)
            .ok_or_else(|| CompileError::ViewNotFound(key.view_id.clone()))?;
        let portfolio = self
            .portfolios
            .portfolio(&key.portfolio_id, &key.version_correction)
            .ok_or_else(|| CompileError::PortfolioNotFound {
                id: key.portfolio_id.clone(),
                version_correction: key.version_correction,
            })?;

        let snapshot = self.catalog.snapshot();
        let compiled_at = Utc::now();
        info!(key = %key, epoch = snapshot.epoch(), "Compiling view");

        let graphs = self
            .build_on_pool(view, portfolio, Arc::clone(&snapshot), cancelled)
            .await?;
        let compiled = Arc::new(CompiledView::new(
            key.clone(),
            graphs,
            snapshot.epoch(),
            compiled_at,
            self.config.cache.view_ttl(),
        ));

        if let SetOutcome::Discarded { view_epoch, live_epoch } =
            self.cache.set(key, Arc::clone(&compiled)).await
        {
            self.metrics.discarded.inc();
            debug!(key = %key, view_epoch, live_epoch, "Returning uncached view to waiters");
        }
        Ok(compiled)
    }

    async fn build_on_pool(
        &self,
        view: Arc<ViewDefinition>,
        portfolio: Arc<Portfolio>,
        snapshot: Arc<CatalogSnapshot>,
        cancelled: Arc<AtomicBool>,
    ) -> std::result::Result<Vec<DependencyGraph>, CompileError> {
        if cancelled.load(Ordering::Acquire) {
            return Err(CompileError::Cancelled);
        }

        let (tx, rx) = oneshot::channel();
        let availability = Arc::clone(&self.availability);
        let resolver_config = self.config.resolver.clone();
        self.metrics.builder_invocations.inc();

        self.pool.spawn(move || {
            let universe = TargetUniverse::from_portfolio(&portfolio);
            let result = GraphBuilder::new(&snapshot, availability.as_ref(), &resolver_config)
                .with_cancellation(&cancelled)
                .build(&view, &universe)
                .map(|output| output.graphs);
            // Receiver is gone only if the compile task was aborted
            let _ = tx.send(result);
        });

        rx.await
            .map_err(|_| CompileError::WorkerPool("graph builder dropped its result".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::features::function_catalog::{ConfiguredFunction, InputTarget};
    use crate::features::graph_builder::{
        CalculationConfiguration, InMemoryPortfolioSource, InMemoryViewDefinitionSource,
        PortfolioPosition, PortfolioRequirement, PortfolioTreeNode,
    };
    use crate::features::resolution::AvailabilitySet;
    use crate::features::value_model::PropertyConstraintSet;
    use crate::shared::models::{Security, TargetSpec, TargetType};

    fn compiler() -> ViewCompiler {
        let catalog = Arc::new(FunctionCatalog::new());
        catalog.register(Arc::new(
            ConfiguredFunction::builder("PV", TargetType::Security)
                .output("PRESENT_VALUE", PropertyConstraintSet::empty())
                .input("MARKET_VALUE", InputTarget::SameTarget, PropertyConstraintSet::empty())
                .build(),
        ));

        let views = Arc::new(InMemoryViewDefinitionSource::new());
        views.insert(ViewDefinition::new("v1", "View").with_configuration(
            CalculationConfiguration::new("Default").with_portfolio_requirement(
                PortfolioRequirement::new(TargetType::Security, "PRESENT_VALUE"),
            ),
        ));

        let portfolios = Arc::new(InMemoryPortfolioSource::new());
        portfolios.insert(
            Portfolio::new(
                "pf",
                "Portfolio",
                PortfolioTreeNode::new("root", "Root").with_position(PortfolioPosition::new("p1", "s1", 1.0)),
            )
            .with_security(Security::new("s1", "EQUITY", "ACME")),
        );

        let availability = AvailabilitySet::builder()
            .with(TargetSpec::security("s1"), "MARKET_VALUE")
            .build();

        ViewCompiler::builder(catalog, views, portfolios, Arc::new(availability))
            .config(EngineConfig::preset(Preset::Fast).worker(|w| w.threads(2)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_compile_then_cache_hit() {
        let compiler = compiler();

        let first = compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();
        let second = compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.node_count(), 2);
        assert_eq!(compiler.stats().builder_invocations, 1);
        assert_eq!(compiler.stats().cache_hits, 1);
        assert_eq!(compiler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_missing_sources() {
        let compiler = compiler();

        let err = compiler.compile("nope", "pf", VersionCorrection::LATEST).await.unwrap_err();
        assert_eq!(err, CompileError::ViewNotFound("nope".into()));

        let err = compiler.compile("v1", "nope", VersionCorrection::LATEST).await.unwrap_err();
        assert!(matches!(err, CompileError::PortfolioNotFound { ref id, .. } if id == "nope"));
        assert_eq!(compiler.stats().failures, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompile() {
        let compiler = compiler();
        let first = compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();

        assert_eq!(compiler.invalidate(5), 5);
        let second = compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.catalog_epoch, 5);
        assert_eq!(first.graphs, second.graphs);
        assert_eq!(compiler.stats().builder_invocations, 2);
    }

    #[tokio::test]
    async fn test_clear_forces_recompile() {
        let compiler = compiler();
        compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();

        compiler.clear().await;
        compiler.compile("v1", "pf", VersionCorrection::LATEST).await.unwrap();

        assert_eq!(compiler.stats().builder_invocations, 2);
    }

    #[tokio::test]
    async fn test_compile_many_preserves_order() {
        let compiler = compiler();

        let results = compiler
            .compile_many(vec![
                CompileRequest::new("v1", "pf", VersionCorrection::LATEST),
                CompileRequest::new("missing", "pf", VersionCorrection::LATEST),
                CompileRequest::new("v1", "pf", VersionCorrection::LATEST),
            ])
            .await;

        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(CompileError::ViewNotFound("missing".into())));
        assert!(Arc::ptr_eq(results[0].as_ref().unwrap(), results[2].as_ref().unwrap()));
    }
}
