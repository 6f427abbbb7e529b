//! Single-flight coordination of compiles
//!
//! One `InFlight` slot per cache key. The first caller becomes the leader and
//! spawns the compile; later callers attach and wait on the slot's watch
//! channel. Attach and detach are reference counted under the map's shard
//! lock: when the last waiter detaches before completion the compile's
//! cancellation flag is raised, and a caller attaching to a cancelled slot
//! replaces it with a fresh one.

use crate::features::cache::{CacheKey, CompiledView};
use crate::features::graph_builder::CompileError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub type CompileOutcome = Result<Arc<CompiledView>, CompileError>;

pub struct InFlight {
    result: watch::Sender<Option<CompileOutcome>>,
    waiters: AtomicUsize,
    cancelled: Arc<AtomicBool>,
}

impl InFlight {
    fn new() -> Self {
        let (result, _) = watch::channel(None);
        Self {
            result,
            waiters: AtomicUsize::new(1),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag observed by the graph builder between tuples
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.result.borrow().is_some()
    }

    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Wait for the compile's outcome
    pub async fn wait(&self) -> CompileOutcome {
        let mut rx = self.result.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(CompileError::WorkerPool("compile ended without a result".into())))
    }

    fn publish(&self, outcome: CompileOutcome) {
        self.result.send_replace(Some(outcome));
    }
}

pub enum Attached {
    /// Caller must start the compile
    Leader(Arc<InFlight>),
    Follower(Arc<InFlight>),
}

impl Attached {
    pub fn flight(&self) -> &Arc<InFlight> {
        match self {
            Attached::Leader(flight) | Attached::Follower(flight) => flight,
        }
    }
}

#[derive(Default)]
pub struct SingleFlight {
    slots: DashMap<CacheKey, Arc<InFlight>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, key: &CacheKey) -> Attached {
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_cancelled() {
                    let flight = Arc::new(InFlight::new());
                    entry.insert(Arc::clone(&flight));
                    debug!(key = %key, "Replaced cancelled compile");
                    return Attached::Leader(flight);
                }
                let flight = Arc::clone(entry.get());
                flight.waiters.fetch_add(1, Ordering::AcqRel);
                Attached::Follower(flight)
            }
            Entry::Vacant(entry) => {
                let flight = Arc::new(InFlight::new());
                entry.insert(Arc::clone(&flight));
                Attached::Leader(flight)
            }
        }
    }

    /// Drop one waiter; the last one out cancels an unfinished compile
    pub fn detach(&self, key: &CacheKey, flight: &Arc<InFlight>) {
        // Shard read lock excludes a concurrent attach
        let _slot = self.slots.get(key);
        if flight.waiters.fetch_sub(1, Ordering::AcqRel) == 1 && !flight.is_complete() {
            flight.cancelled.store(true, Ordering::Release);
            debug!(key = %key, "Last waiter left; cancelling compile");
        }
    }

    /// Publish the outcome and free the slot
    pub fn complete(&self, key: &CacheKey, flight: &Arc<InFlight>, outcome: CompileOutcome) {
        flight.publish(outcome);
        self.slots
            .remove_if(key, |_, current| Arc::ptr_eq(current, flight));
    }

    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

/// Detaches its waiter when dropped, including when the waiting future is
/// dropped mid-compile
pub struct WaiterGuard {
    flights: Arc<SingleFlight>,
    key: CacheKey,
    flight: Arc<InFlight>,
}

impl WaiterGuard {
    pub fn new(flights: Arc<SingleFlight>, key: CacheKey, flight: Arc<InFlight>) -> Self {
        Self { flights, key, flight }
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.flights.detach(&self.key, &self.flight);
    }
}

/// Owned by the compile task; publishes an error if the task ends without
/// an outcome
pub struct Completion {
    flights: Arc<SingleFlight>,
    key: CacheKey,
    flight: Arc<InFlight>,
    done: bool,
}

impl Completion {
    pub fn new(flights: Arc<SingleFlight>, key: CacheKey, flight: Arc<InFlight>) -> Self {
        Self {
            flights,
            key,
            flight,
            done: false,
        }
    }

    pub fn finish(mut self, outcome: CompileOutcome) {
        self.flights.complete(&self.key, &self.flight, outcome);
        self.done = true;
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.done {
            self.flights.complete(
                &self.key,
                &self.flight,
                Err(CompileError::WorkerPool("compile task aborted".into())),
            );
        }
    }
}
