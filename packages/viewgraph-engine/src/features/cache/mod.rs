//! Compiled-View Cache
//!
//! Concurrent cache of compiled dependency graphs keyed by
//! (view, portfolio, data version), invalidated by catalog epoch.
//!
//! - **NoOp**: never caches
//! - **InMemory**: unbounded `DashMap`
//! - **Tiered**: moka hot tier (entries, bytes, TTL) over a durable
//!   `ViewStore`; msgpack records keyed by a blake3 fingerprint
//!
//! A view is served only inside its validity window and while its catalog
//! epoch is the live epoch.

mod error;
mod metrics;
mod types;

mod backends;
mod durable_tier;
mod hot_tier;
mod tiered_cache;

pub use error::*;
pub use metrics::*;
pub use types::*;

pub use backends::{InMemoryViewCache, NoOpViewCache, ViewCache};
pub use durable_tier::{DurableTier, FORMAT_VERSION};
pub use hot_tier::HotTier;
pub use tiered_cache::TieredViewCache;

pub(crate) use metrics::{histogram, int_counter, int_gauge};
