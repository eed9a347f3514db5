//! Persistence boundary for signals.
//!
//! The store is append-only: rows are inserted once and never mutated or
//! deleted here. Uniqueness on `(signal_type, period, prompt_version)` is the
//! only correctness guarantee against duplicate rows.

mod jsonl;
mod memory;

use async_trait::async_trait;
use std::cmp::Ordering;
use thiserror::Error;

use crate::signal::{Signal, SignalKey};

pub use jsonl::JsonlSignalStore;
pub use memory::MemorySignalStore;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// A row with the same key already exists.
    #[error("Signal already exists: {0}")]
    Conflict(SignalKey),
    #[error("Store I/O error: {0}")]
    Io(String),
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Key-value store with query-by-filter semantics.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Row matching type and period, optionally narrowed to one prompt version.
    async fn find(
        &self,
        signal_type: &str,
        period: &str,
        prompt_version: Option<&str>,
    ) -> Result<Option<Signal>, StoreError>;

    /// Insert a new row. Fails with [`StoreError::Conflict`] on a duplicate key.
    async fn insert(&self, signal: Signal) -> Result<(), StoreError>;

    /// Most recent row of a type, by period then creation time.
    async fn latest(&self, signal_type: &str) -> Result<Option<Signal>, StoreError>;
}

/// Newest-first ordering used by [`SignalStore::latest`].
pub(crate) fn newest_first(a: &Signal, b: &Signal) -> Ordering {
    b.period
        .cmp(&a.period)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub(crate) fn matches(
    signal: &Signal,
    signal_type: &str,
    period: &str,
    prompt_version: Option<&str>,
) -> bool {
    signal.signal_type == signal_type
        && signal.period == period
        && prompt_version.map_or(true, |v| signal.prompt_version == v)
}
