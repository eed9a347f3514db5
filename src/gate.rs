//! Idempotency gate in front of narrative generation.
//!
//! Check-then-insert, not an atomic guard: it assumes a single writer per
//! period. Two concurrent runs for the same key can both pass the check and
//! both pay for generation; the store's uniqueness constraint still rejects
//! the second row, and the caller treats that conflict as a skip.

use tracing::{debug, info};

use crate::prelude::Result;
use crate::signal::SignalKey;
use crate::store::SignalStore;

/// Outcome of an idempotency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No row exists for the key; generation may run.
    Proceed,
    /// A row already exists; skip without side effects.
    Skip,
}

impl GateDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, GateDecision::Skip)
    }
}

pub struct IdempotencyGate<'a> {
    store: &'a dyn SignalStore,
}

impl<'a> IdempotencyGate<'a> {
    pub fn new(store: &'a dyn SignalStore) -> Self {
        Self { store }
    }

    pub async fn check(&self, key: &SignalKey) -> Result<GateDecision> {
        let existing = self
            .store
            .find(&key.signal_type, &key.period, Some(&key.prompt_version))
            .await?;
        if existing.is_some() {
            info!(target: "macro_signals::jobs", key = %key, "Signal already generated, skipping");
            return Ok(GateDecision::Skip);
        }
        debug!(target: "macro_signals::jobs", key = %key, "No existing signal, proceeding");
        Ok(GateDecision::Proceed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySignalStore;
    use crate::tests::support::signal_row;

    #[tokio::test]
    async fn test_gate_proceeds_then_skips() {
        let store = MemorySignalStore::new();
        let gate = IdempotencyGate::new(&store);
        let key = SignalKey::new("inflation", "2024-05", "v1");

        assert_eq!(gate.check(&key).await.unwrap(), GateDecision::Proceed);
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        assert!(gate.check(&key).await.unwrap().is_skip());
    }

    #[tokio::test]
    async fn test_gate_respects_prompt_version() {
        let store = MemorySignalStore::new();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        let gate = IdempotencyGate::new(&store);
        let key = SignalKey::new("inflation", "2024-05", "v2");
        assert_eq!(gate.check(&key).await.unwrap(), GateDecision::Proceed);
    }
}
