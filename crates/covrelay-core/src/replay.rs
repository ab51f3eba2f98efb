//! Replay protection for inbound messages and nonce issuance for outbound
//! ones.
//!
//! The transport delivers at least once, so the same envelope may arrive any
//! number of times. [`ReplayGuard::check_and_mark`] is a single
//! test-and-insert against the [`ReplayStore`]: the first caller wins and
//! every later one gets [`RelayError::MessageAlreadyProcessed`].
//!
//! Nonces are per sender, start at zero and only move forward. A nonce is
//! never handed out twice, even when the send that consumed it fails later.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RelayError;
use crate::types::{Address, MessageId};

// =============================================================================
// ReplayStore
// =============================================================================

/// Storage of processed message ids and per-sender nonce counters.
pub trait ReplayStore: Send + Sync {
    /// Inserts `id` and returns `true`, or returns `false` if it was present.
    ///
    /// Must be atomic with respect to concurrent calls for the same id.
    fn mark_if_absent(&self, id: MessageId) -> bool;

    /// Returns `true` if `id` has been marked.
    fn contains(&self, id: MessageId) -> bool;

    /// Removes a mark. Only used to roll back a failed transaction.
    fn unmark(&self, id: MessageId);

    /// Returns the sender's current nonce and advances it by one.
    ///
    /// Returns `None` without advancing once the counter is at `u64::MAX`.
    fn fetch_and_increment_nonce(&self, sender: Address) -> Option<u64>;

    /// Returns the nonce the sender will be issued next.
    fn nonce(&self, sender: Address) -> u64;
}

/// [`ReplayStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryReplayStore {
    processed: RwLock<HashSet<MessageId>>,
    nonces: RwLock<HashMap<Address, u64>>,
}

impl InMemoryReplayStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of processed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no id has been processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplayStore for InMemoryReplayStore {
    fn mark_if_absent(&self, id: MessageId) -> bool {
        self.processed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id)
    }

    fn contains(&self, id: MessageId) -> bool {
        self.processed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    fn unmark(&self, id: MessageId) {
        self.processed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn fetch_and_increment_nonce(&self, sender: Address) -> Option<u64> {
        let mut nonces = self.nonces.write().unwrap_or_else(PoisonError::into_inner);
        let slot = nonces.entry(sender).or_insert(0);
        let current = *slot;
        *slot = current.checked_add(1)?;
        Some(current)
    }

    fn nonce(&self, sender: Address) -> u64 {
        self.nonces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&sender)
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// ReplayGuard
// =============================================================================

/// Exactly-once gate over a [`ReplayStore`].
pub struct ReplayGuard {
    store: Arc<dyn ReplayStore>,
}

impl ReplayGuard {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn ReplayStore>) -> Self {
        Self { store }
    }

    /// Marks `id` as processed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MessageAlreadyProcessed`] if the id was already
    /// marked; the store is unchanged.
    pub fn check_and_mark(&self, id: MessageId) -> Result<(), RelayError> {
        if self.store.mark_if_absent(id) {
            Ok(())
        } else {
            tracing::warn!(message_id = %id, "replayed message rejected");
            Err(RelayError::MessageAlreadyProcessed { message_id: id })
        }
    }

    /// Issues the next nonce for `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NonceExhausted`] once the counter cannot
    /// advance.
    pub fn next_nonce(&self, sender: Address) -> Result<u64, RelayError> {
        self.store
            .fetch_and_increment_nonce(sender)
            .ok_or(RelayError::NonceExhausted { sender })
    }

    /// The nonce `sender` will be issued next.
    #[must_use]
    pub fn current_nonce(&self, sender: Address) -> u64 {
        self.store.nonce(sender)
    }

    /// Returns `true` if `id` has been processed.
    #[must_use]
    pub fn is_processed(&self, id: MessageId) -> bool {
        self.store.contains(id)
    }

    /// Drops a mark made by a transaction that is being rolled back.
    pub(crate) fn release(&self, id: MessageId) {
        self.store.unmark(id);
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard").finish_non_exhaustive()
    }
}
