//! In-memory adapter for ViewStore

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{StoredView, ViewStore};
use crate::Result;

/// Process-local view store
#[derive(Debug, Default)]
pub struct InMemoryViewStore {
    entries: DashMap<String, StoredView>,
}

impl InMemoryViewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewStore for InMemoryViewStore {
    async fn put(&self, entry: &StoredView) -> Result<()> {
        self.entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredView>> {
        match self.entries.get(key) {
            Some(entry) => {
                entry.verify()?;
                Ok(Some(entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
