//! Ledger of admitted coverage requests awaiting resolution.
//!
//! Each entry is keyed by its message id and moves through a one-way state
//! machine:
//!
//! ```text
//! Pending ──finalize──> Finalized
//!    │
//!    └──────reject────> Rejected
//! ```
//!
//! Both resolved states are terminal. Read-modify-write sequences are not
//! atomic at the store level; the relay serializes all mutations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::types::{CoverageRequest, DestinationId, MessageId, PolicyId, Timestamp};

/// Resolution state of a pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// Admitted, not yet resolved.
    Pending,
    /// The policy exists on the destination side.
    Finalized,
    /// The request will not be honored.
    Rejected,
}

impl CoverageStatus {
    /// Lowercase name used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Finalized => "finalized",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` for states with no outgoing transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Rejected)
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a pending entry relative to the local relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Route {
    /// Sent from this relay to `destination`.
    Outbound {
        /// Chain the envelope was sent to.
        destination: DestinationId,
    },
    /// Received by this relay from `source_chain`.
    Inbound {
        /// Chain the envelope came from.
        source_chain: DestinationId,
    },
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCoverage {
    /// Key of the entry.
    pub message_id: MessageId,
    /// The admitted request.
    pub request: CoverageRequest,
    /// Where the request travels.
    pub route: Route,
    /// Current resolution state.
    pub status: CoverageStatus,
    /// Policy assigned on finalization, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<PolicyId>,
    /// Reason given on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// When the entry was recorded.
    pub recorded_at: Timestamp,
    /// When the entry left [`CoverageStatus::Pending`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
}

// =============================================================================
// PendingStore
// =============================================================================

/// Storage of [`PendingCoverage`] entries.
pub trait PendingStore: Send + Sync {
    /// Inserts `entry` unless its key exists. Returns `true` on insert.
    fn insert_if_absent(&self, entry: PendingCoverage) -> bool;

    /// Returns the entry for `id`.
    fn get(&self, id: MessageId) -> Option<PendingCoverage>;

    /// Overwrites the entry keyed by `entry.message_id`.
    fn replace(&self, entry: PendingCoverage);

    /// Deletes the entry for `id`. Only used to roll back a failed
    /// transaction.
    fn remove(&self, id: MessageId);

    /// Returns every entry ordered by message id.
    fn entries(&self) -> Vec<PendingCoverage>;
}

/// [`PendingStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: RwLock<BTreeMap<MessageId, PendingCoverage>>,
}

impl InMemoryPendingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingStore for InMemoryPendingStore {
    fn insert_if_absent(&self, entry: PendingCoverage) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&entry.message_id) {
            return false;
        }
        entries.insert(entry.message_id, entry);
        true
    }

    fn get(&self, id: MessageId) -> Option<PendingCoverage> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn replace(&self, entry: PendingCoverage) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.message_id, entry);
    }

    fn remove(&self, id: MessageId) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn entries(&self) -> Vec<PendingCoverage> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

// =============================================================================
// PendingLedger
// =============================================================================

/// State machine over a [`PendingStore`].
pub struct PendingLedger {
    store: Arc<dyn PendingStore>,
}

impl PendingLedger {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn PendingStore>) -> Self {
        Self { store }
    }

    /// Records a new [`CoverageStatus::Pending`] entry.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateEntry`] if `message_id` is taken.
    pub fn record(
        &self,
        message_id: MessageId,
        request: CoverageRequest,
        route: Route,
        now: Timestamp,
    ) -> Result<PendingCoverage, RelayError> {
        let entry = PendingCoverage {
            message_id,
            request,
            route,
            status: CoverageStatus::Pending,
            policy_id: None,
            rejection_reason: None,
            recorded_at: now,
            resolved_at: None,
        };
        if !self.store.insert_if_absent(entry.clone()) {
            return Err(RelayError::DuplicateEntry { message_id });
        }
        Ok(entry)
    }

    /// Returns the entry for `message_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for an unknown id.
    pub fn get(&self, message_id: MessageId) -> Result<PendingCoverage, RelayError> {
        self.store
            .get(message_id)
            .ok_or_else(|| RelayError::not_found("pending coverage", message_id))
    }

    /// Moves an entry to [`CoverageStatus::Finalized`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for an unknown id and
    /// [`RelayError::InvalidStateTransition`] if the entry is not pending.
    pub fn finalize(
        &self,
        message_id: MessageId,
        policy_id: Option<PolicyId>,
        now: Timestamp,
    ) -> Result<PendingCoverage, RelayError> {
        let mut entry = self.pending_entry(message_id, CoverageStatus::Finalized)?;
        entry.status = CoverageStatus::Finalized;
        entry.policy_id = policy_id;
        entry.resolved_at = Some(now);
        self.store.replace(entry.clone());
        Ok(entry)
    }

    /// Moves an entry to [`CoverageStatus::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for an unknown id and
    /// [`RelayError::InvalidStateTransition`] if the entry is not pending.
    pub fn reject(
        &self,
        message_id: MessageId,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<PendingCoverage, RelayError> {
        let mut entry = self.pending_entry(message_id, CoverageStatus::Rejected)?;
        entry.status = CoverageStatus::Rejected;
        entry.rejection_reason = Some(reason.into());
        entry.resolved_at = Some(now);
        self.store.replace(entry.clone());
        Ok(entry)
    }

    /// Number of entries still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries_with_status(CoverageStatus::Pending).len()
    }

    /// Entries currently in `status`, ordered by message id.
    #[must_use]
    pub fn entries_with_status(&self, status: CoverageStatus) -> Vec<PendingCoverage> {
        self.store
            .entries()
            .into_iter()
            .filter(|entry| entry.status == status)
            .collect()
    }

    /// Deletes an entry recorded by a transaction that is being rolled back.
    pub(crate) fn discard(&self, message_id: MessageId) {
        self.store.remove(message_id);
    }

    fn pending_entry(
        &self,
        message_id: MessageId,
        target: CoverageStatus,
    ) -> Result<PendingCoverage, RelayError> {
        let entry = self.get(message_id)?;
        if entry.status != CoverageStatus::Pending {
            return Err(RelayError::invalid_transition(
                format!("pending coverage {message_id}"),
                entry.status.as_str(),
                target.as_str(),
            ));
        }
        Ok(entry)
    }
}

impl fmt::Debug for PendingLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLedger").finish_non_exhaustive()
    }
}
