//! Domain layer for the durable view store
//!
//! # Domain Models
//!
//! - `StoredView`: one opaque, checksummed payload under an opaque key
//!
//! # Port Trait
//!
//! - `ViewStore`: primary storage abstraction
//!
//! Keys are content fingerprints chosen by the caller. The store never
//! interprets payloads; it only guarantees that a payload read back is the
//! payload that was written (checksum verified on read).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque stored entry
///
/// # Examples
///
/// ```rust
/// use viewgraph_storage::StoredView;
///
/// let entry = StoredView::new("key-1", vec![1, 2, 3]);
/// assert_eq!(entry.key, "key-1");
/// assert!(entry.verify().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredView {
    /// Entry key (opaque to the store)
    pub key: String,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// SHA-256 of `payload`, lowercase hex
    pub checksum: String,
    /// Write timestamp
    pub stored_at: DateTime<Utc>,
    /// Optional diagnostic metadata (view id, epoch, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl StoredView {
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        let checksum = checksum_hex(&payload);
        Self {
            key: key.into(),
            payload,
            checksum,
            stored_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(
        key: impl Into<String>,
        payload: Vec<u8>,
        metadata: serde_json::Value,
    ) -> Self {
        let mut entry = Self::new(key, payload);
        entry.metadata = metadata;
        entry
    }

    /// Check the payload against its checksum
    pub fn verify(&self) -> Result<()> {
        if checksum_hex(&self.payload) == self.checksum {
            Ok(())
        } else {
            Err(StorageError::corrupted(self.key.clone()))
        }
    }

    /// Payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

pub(crate) fn checksum_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Durable store of opaque view payloads
///
/// # Implementations
///
/// - `InMemoryViewStore`: `DashMap`-backed
/// - `SqliteViewStore`: SQLite adapter, blocking work on the tokio blocking pool
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Insert or replace the entry under `entry.key`
    async fn put(&self, entry: &StoredView) -> Result<()>;

    /// Fetch an entry
    ///
    /// # Errors
    ///
    /// Returns a `Corrupted` error if the stored payload fails verification.
    async fn get(&self, key: &str) -> Result<Option<StoredView>>;

    /// Remove an entry, returning whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_view_new() {
        let entry = StoredView::new("abc", vec![1, 2, 3]);

        assert_eq!(entry.key, "abc");
        assert_eq!(entry.payload, vec![1, 2, 3]);
        assert_eq!(entry.checksum.len(), 64);
        assert_eq!(entry.metadata, serde_json::Value::Null);
        assert_eq!(entry.size_bytes(), 3);
    }

    #[test]
    fn test_stored_view_verify_detects_tampering() {
        let mut entry = StoredView::new("abc", vec![1, 2, 3]);
        assert!(entry.verify().is_ok());

        entry.payload.push(4);
        let err = entry.verify().unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Corrupted);
    }

    #[test]
    fn test_stored_view_with_metadata() {
        let metadata = serde_json::json!({ "view": "Equity PnL", "epoch": 7 });
        let entry = StoredView::with_metadata("abc", vec![], metadata.clone());
        assert_eq!(entry.metadata, metadata);
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(checksum_hex(b"payload"), checksum_hex(b"payload"));
        assert_ne!(checksum_hex(b"payload"), checksum_hex(b"payload2"));
    }
}
