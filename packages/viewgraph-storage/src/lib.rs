//! Durable blob storage for compiled views
//!
//! Backing store for the durable tier of the compiled-view cache. Entries are
//! opaque byte payloads stored under opaque string keys; the engine owns the
//! encoding and this crate owns persistence.
//!
//! ## Adapters
//!
//! - `InMemoryViewStore`: process-local, for tests and embedding
//! - `SqliteViewStore`: single-file SQLite database (feature `sqlite`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use viewgraph_storage::{StoredView, ViewStore, InMemoryViewStore};
//!
//! let store = InMemoryViewStore::new();
//! store.put(&StoredView::new("3fa1...", payload)).await?;
//!
//! if let Some(entry) = store.get("3fa1...").await? {
//!     decode(&entry.payload);
//! }
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{StoredView, ViewStore};
pub use infrastructure::InMemoryViewStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteViewStore;
