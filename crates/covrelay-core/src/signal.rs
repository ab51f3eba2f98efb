//! Observable relay events.
//!
//! Every committed state change appends one [`RelaySignal`] to a bounded
//! [`SignalLog`]. Consumers poll with [`SignalLog::snapshot`] or take
//! ownership with [`SignalLog::drain`]; there is no callback registration.
//! Once the log is full the oldest record is dropped and counted.

use std::collections::VecDeque;

use serde::Serialize;

use crate::access::Capability;
use crate::types::{Address, Amount, DestinationId, MessageId, PolicyId, Timestamp};

/// A committed relay event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelaySignal {
    /// A destination was enabled or reconfigured.
    ChainConfigured {
        /// The configured destination.
        destination: DestinationId,
        /// Its remote endpoint.
        remote_endpoint: Address,
        /// Its effective limit.
        rate_limit: u32,
    },

    /// A destination was disabled.
    ChainDisabled {
        /// The disabled destination.
        destination: DestinationId,
    },

    /// A destination's limit changed.
    RateLimitUpdated {
        /// The destination.
        destination: DestinationId,
        /// Limit before the change.
        previous: u32,
        /// Limit after the change.
        limit: u32,
    },

    /// The relay was paused or unpaused.
    PauseToggled {
        /// New value of the pause flag.
        paused: bool,
        /// Identity that flipped it.
        by: Address,
    },

    /// A capability was granted.
    RoleGranted {
        /// Receiving identity.
        account: Address,
        /// The capability.
        capability: Capability,
        /// Granting admin.
        by: Address,
    },

    /// A capability was revoked.
    RoleRevoked {
        /// Losing identity.
        account: Address,
        /// The capability.
        capability: Capability,
        /// Revoking admin.
        by: Address,
    },

    /// An outbound request was handed to the transport.
    CoverageRelayed {
        /// Envelope id.
        message_id: MessageId,
        /// Target chain.
        destination: DestinationId,
        /// Calling identity.
        sender: Address,
        /// Nonce sealed into the envelope.
        nonce: u64,
        /// Coverage amount.
        amount: Amount,
        /// Fee paid by the sender.
        fee_paid: Amount,
        /// Amount charged by the transport.
        cost: Amount,
    },

    /// An inbound envelope was admitted.
    CoverageReceived {
        /// Envelope id.
        message_id: MessageId,
        /// Chain it came from.
        source_chain: DestinationId,
        /// Policy holder.
        holder: Address,
        /// Coverage amount.
        amount: Amount,
    },

    /// A pending entry was finalized.
    CoverageFinalized {
        /// Envelope id.
        message_id: MessageId,
        /// Policy id, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        policy_id: Option<PolicyId>,
    },

    /// A pending entry was rejected.
    CoverageRejected {
        /// Envelope id.
        message_id: MessageId,
        /// Why it was rejected.
        reason: String,
    },

    /// Fee surplus left the reserve.
    ReserveWithdrawn {
        /// Receiving identity.
        recipient: Address,
        /// Amount withdrawn.
        amount: Amount,
        /// Reserve left afterwards.
        remaining: Amount,
    },
}

impl RelaySignal {
    /// The serde tag of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChainConfigured { .. } => "chain_configured",
            Self::ChainDisabled { .. } => "chain_disabled",
            Self::RateLimitUpdated { .. } => "rate_limit_updated",
            Self::PauseToggled { .. } => "pause_toggled",
            Self::RoleGranted { .. } => "role_granted",
            Self::RoleRevoked { .. } => "role_revoked",
            Self::CoverageRelayed { .. } => "coverage_relayed",
            Self::CoverageReceived { .. } => "coverage_received",
            Self::CoverageFinalized { .. } => "coverage_finalized",
            Self::CoverageRejected { .. } => "coverage_rejected",
            Self::ReserveWithdrawn { .. } => "reserve_withdrawn",
        }
    }
}

/// A signal with its position and commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalRecord {
    /// Monotonic sequence number, starting at zero.
    pub seq: u64,
    /// Commit time.
    pub at: Timestamp,
    /// The event.
    #[serde(flatten)]
    pub signal: RelaySignal,
}

/// Bounded FIFO of [`SignalRecord`]s.
#[derive(Debug, Clone)]
pub struct SignalLog {
    capacity: usize,
    records: VecDeque<SignalRecord>,
    next_seq: u64,
    dropped: u64,
}

impl SignalLog {
    /// Creates an empty log holding at most `capacity` records (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(1024)),
            next_seq: 0,
            dropped: 0,
        }
    }

    /// Appends `signal` and returns its sequence number.
    pub fn push(&mut self, at: Timestamp, signal: RelaySignal) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::info!(seq, kind = signal.kind(), at, "relay signal");
        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(SignalRecord { seq, at, signal });
        seq
    }

    /// Copies the retained records, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SignalRecord> {
        self.records.iter().cloned().collect()
    }

    /// Removes and returns the retained records, oldest first.
    pub fn drain(&mut self) -> Vec<SignalRecord> {
        self.records.drain(..).collect()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted because the log was full.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled(raw: u64) -> RelaySignal {
        RelaySignal::ChainDisabled {
            destination: DestinationId::new(raw),
        }
    }

    #[test]
    fn test_push_assigns_sequence() {
        let mut log = SignalLog::new(8);
        assert_eq!(log.push(10, disabled(1)), 0);
        assert_eq!(log.push(11, disabled(2)), 1);
        let records = log.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].at, 11);
    }

    #[test]
    fn test_oldest_dropped_past_capacity() {
        let mut log = SignalLog::new(2);
        for raw in 1..=5 {
            log.push(0, disabled(raw));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 3);
        let seqs: Vec<u64> = log.snapshot().iter().map(|record| record.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[test]
    fn test_drain_empties_but_keeps_sequence() {
        let mut log = SignalLog::new(4);
        log.push(0, disabled(1));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
        assert_eq!(log.push(0, disabled(2)), 1);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut log = SignalLog::new(0);
        log.push(0, disabled(1));
        log.push(0, disabled(2));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = SignalRecord {
            seq: 7,
            at: 99,
            signal: RelaySignal::PauseToggled {
                paused: true,
                by: Address::repeat_byte(1),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "pause_toggled");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["paused"], true);
        assert_eq!(record.signal.kind(), "pause_toggled");
    }
}
