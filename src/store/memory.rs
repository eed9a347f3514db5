use async_trait::async_trait;
use std::sync::RwLock;

use super::{matches, newest_first, SignalStore, StoreError};
use crate::signal::Signal;

/// In-process store with the same uniqueness rules as a real database.
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    rows: RwLock<Vec<Signal>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all rows in insertion order.
    pub fn rows(&self) -> Vec<Signal> {
        self.rows.read().map(|rows| rows.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Io("memory store lock poisoned".to_string())
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn find(
        &self,
        signal_type: &str,
        period: &str,
        prompt_version: Option<&str>,
    ) -> Result<Option<Signal>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut found: Vec<&Signal> = rows
            .iter()
            .filter(|s| matches(s, signal_type, period, prompt_version))
            .collect();
        found.sort_by(|a, b| newest_first(a, b));
        Ok(found.first().map(|s| (*s).clone()))
    }

    async fn insert(&self, signal: Signal) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let key = signal.key();
        if rows.iter().any(|s| s.key() == key) {
            return Err(StoreError::Conflict(key));
        }
        rows.push(signal);
        Ok(())
    }

    async fn latest(&self, signal_type: &str) -> Result<Option<Signal>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|s| s.signal_type == signal_type)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::signal_row;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemorySignalStore::new();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();

        assert!(store.find("inflation", "2024-05", Some("v1")).await.unwrap().is_some());
        assert!(store.find("inflation", "2024-05", None).await.unwrap().is_some());
        assert!(store.find("inflation", "2024-05", Some("v2")).await.unwrap().is_none());
        assert!(store.find("inflation", "2024-06", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemorySignalStore::new();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        let err = store
            .insert(signal_row("inflation", "2024-05", "v1"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len(), 1);

        // New prompt version is a new generation for the same period
        store.insert(signal_row("inflation", "2024-05", "v2")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_latest_orders_by_period() {
        let store = MemorySignalStore::new();
        store.insert(signal_row("inflation", "2024-03", "v1")).await.unwrap();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        store.insert(signal_row("inflation", "2024-04", "v1")).await.unwrap();
        store.insert(signal_row("key_event", "2024-06-01", "k1")).await.unwrap();

        let latest = store.latest("inflation").await.unwrap().unwrap();
        assert_eq!(latest.period, "2024-05");
        assert!(store.latest("growth").await.unwrap().is_none());
    }
}
