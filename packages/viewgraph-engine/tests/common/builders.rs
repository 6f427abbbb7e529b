//! Test harness builders
//!
//! `HarnessBuilder` wires a `ViewCompiler` over the pricing fixtures, with an
//! optional gate that holds graph building until the test opens it.

use super::fixtures::{book_portfolio, market_data, pricing_catalog, risk_view};
use prometheus::Registry;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use viewgraph_engine::config::{EngineConfig, Preset};
use viewgraph_engine::features::cache::ViewCache;
use viewgraph_engine::features::function_catalog::FunctionCatalog;
use viewgraph_engine::features::graph_builder::{
    InMemoryPortfolioSource, InMemoryViewDefinitionSource, StaticMarketData,
};
use viewgraph_engine::features::resolution::MarketDataAvailability;
use viewgraph_engine::shared::models::TargetSpec;
use viewgraph_engine::usecases::ViewCompiler;

/// Availability oracle that blocks every lookup while closed
pub struct Gate {
    inner: StaticMarketData,
    open: AtomicBool,
    entered: AtomicUsize,
}

impl Gate {
    pub fn new(inner: StaticMarketData, open: bool) -> Self {
        Self {
            inner,
            open: AtomicBool::new(open),
            entered: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Lookups started so far
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::Acquire)
    }

    /// Poll until a graph build is blocked on the gate
    pub async fn wait_entered(&self) {
        while self.entered() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl MarketDataAvailability for Gate {
    fn is_available(&self, target: &TargetSpec, value_name: &str) -> bool {
        self.entered.fetch_add(1, Ordering::AcqRel);
        while !self.open.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.inner.is_available(target, value_name)
    }
}

pub struct Harness {
    pub compiler: ViewCompiler,
    pub catalog: Arc<FunctionCatalog>,
    pub views: Arc<InMemoryViewDefinitionSource>,
    pub portfolios: Arc<InMemoryPortfolioSource>,
    pub gate: Arc<Gate>,
    pub registry: Registry,
}

pub struct HarnessBuilder {
    catalog: Arc<FunctionCatalog>,
    config: EngineConfig,
    cache: Option<Arc<dyn ViewCache>>,
    gate_open: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            catalog: pricing_catalog(),
            config: EngineConfig::preset(Preset::Balanced).worker(|w| w.threads(2)),
            cache: None,
            gate_open: true,
        }
    }

    /// Catalog the harness will use, for building caches against it
    pub fn catalog(&self) -> Arc<FunctionCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ViewCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Start with graph building blocked until `gate.open()`
    pub fn gated(mut self) -> Self {
        self.gate_open = false;
        self
    }

    pub fn build(self) -> Harness {
        let views = Arc::new(InMemoryViewDefinitionSource::new());
        views.insert(risk_view());
        let portfolios = Arc::new(InMemoryPortfolioSource::new());
        portfolios.insert(book_portfolio());
        let gate = Arc::new(Gate::new(market_data(), self.gate_open));
        let registry = Registry::new();

        let mut builder = ViewCompiler::builder(
            Arc::clone(&self.catalog),
            views.clone(),
            portfolios.clone(),
            gate.clone(),
        )
        .config(self.config)
        .registry(&registry);
        if let Some(cache) = self.cache {
            builder = builder.cache(cache);
        }

        Harness {
            compiler: builder.build().expect("compiler"),
            catalog: self.catalog,
            views,
            portfolios,
            gate,
            registry,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}

/// Poll `condition` every millisecond for up to five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached within 5s");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
