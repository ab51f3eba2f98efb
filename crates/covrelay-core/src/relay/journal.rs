//! Per-transaction undo journal.
//!
//! Every store write made inside a relay transaction is paired with an
//! [`Undo`] entry. On failure the entries are applied newest first, which
//! restores the stores to their state at the start of the transaction.
//! Signals are staged alongside and only reach the [`SignalLog`] once their
//! writes are permanent.
//!
//! ```text
//! write ──record──> undo[]      Ok  ──> publish staged + settled signals
//! event ──emit────> staged[]    Err ──> apply undo[] in reverse,
//!                                       publish settled signals only
//! settle(): undo[] cleared, staged[] moved to settled[]
//! ```

use crate::pending::PendingLedger;
use crate::registry::{ChainConfig, ChainRegistry};
use crate::replay::ReplayGuard;
use crate::signal::{RelaySignal, SignalLog};
use crate::types::{MessageId, Timestamp};

/// A compensating write.
#[derive(Debug)]
pub(super) enum Undo {
    /// Put back a chain entry captured before an admission.
    Chain(ChainConfig),
    /// Release a replay mark.
    ReplayMark(MessageId),
    /// Delete a freshly recorded pending entry.
    PendingRecord(MessageId),
}

/// Stores the journal can roll back.
pub(super) struct Stores<'a> {
    pub registry: &'a ChainRegistry,
    pub replay: &'a ReplayGuard,
    pub pending: &'a PendingLedger,
}

#[derive(Debug, Default)]
pub(super) struct Journal {
    undo: Vec<Undo>,
    staged: Vec<RelaySignal>,
    settled: Vec<RelaySignal>,
}

impl Journal {
    pub(super) fn record(&mut self, undo: Undo) {
        self.undo.push(undo);
    }

    pub(super) fn emit(&mut self, signal: RelaySignal) {
        self.staged.push(signal);
    }

    /// Makes every write so far permanent, even if the transaction fails
    /// afterwards.
    pub(super) fn settle(&mut self) {
        self.undo.clear();
        self.settled.append(&mut self.staged);
    }

    /// Publishes all signals. Called when the transaction succeeded.
    pub(super) fn commit(mut self, at: Timestamp, log: &mut SignalLog) {
        self.settle();
        for signal in self.settled {
            log.push(at, signal);
        }
    }

    /// Undoes unsettled writes and publishes settled signals.
    pub(super) fn rollback(self, stores: &Stores<'_>, at: Timestamp, log: &mut SignalLog) {
        if !self.undo.is_empty() {
            tracing::debug!(
                writes = self.undo.len(),
                discarded_signals = self.staged.len(),
                "rolling back relay transaction"
            );
        }
        for undo in self.undo.into_iter().rev() {
            match undo {
                Undo::Chain(previous) => stores.registry.restore(previous),
                Undo::ReplayMark(id) => stores.replay.release(id),
                Undo::PendingRecord(id) => stores.pending.discard(id),
            }
        }
        for signal in self.settled {
            log.push(at, signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::constants::{COVERAGE_UNIT, SECONDS_PER_DAY};
    use crate::pending::{InMemoryPendingStore, Route};
    use crate::registry::{InMemoryChainStore, RateLimitPolicy};
    use crate::replay::InMemoryReplayStore;
    use crate::types::{Address, CoverageRequest, DestinationId};

    struct Fixture {
        registry: ChainRegistry,
        replay: ReplayGuard,
        pending: PendingLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = ChainRegistry::new(
                Arc::new(InMemoryChainStore::new()),
                RateLimitPolicy::default(),
                DestinationId::new(1),
            );
            registry
                .enable_chain(DestinationId::new(2), Address::repeat_byte(2), 5, 0)
                .unwrap();
            Self {
                registry,
                replay: ReplayGuard::new(Arc::new(InMemoryReplayStore::new())),
                pending: PendingLedger::new(Arc::new(InMemoryPendingStore::new())),
            }
        }

        fn stores(&self) -> Stores<'_> {
            Stores {
                registry: &self.registry,
                replay: &self.replay,
                pending: &self.pending,
            }
        }
    }

    fn id() -> MessageId {
        MessageId::from_bytes([5; 32])
    }

    fn request() -> CoverageRequest {
        CoverageRequest::new(
            Address::repeat_byte(9),
            COVERAGE_UNIT,
            SECONDS_PER_DAY,
            0,
            DestinationId::new(2),
            0,
        )
        .unwrap()
    }

    fn stage_writes(fixture: &Fixture, journal: &mut Journal) {
        fixture.replay.check_and_mark(id()).unwrap();
        journal.record(Undo::ReplayMark(id()));
        let previous = fixture.registry.admit(DestinationId::new(2), 1).unwrap();
        journal.record(Undo::Chain(previous));
        fixture
            .pending
            .record(
                id(),
                request(),
                Route::Inbound {
                    source_chain: DestinationId::new(2),
                },
                1,
            )
            .unwrap();
        journal.record(Undo::PendingRecord(id()));
        journal.emit(RelaySignal::ChainDisabled {
            destination: DestinationId::new(2),
        });
    }

    #[test]
    fn test_rollback_restores_every_store() {
        let fixture = Fixture::new();
        let mut journal = Journal::default();
        let mut log = SignalLog::new(8);
        stage_writes(&fixture, &mut journal);

        journal.rollback(&fixture.stores(), 2, &mut log);

        assert!(!fixture.replay.is_processed(id()));
        assert_eq!(
            fixture
                .registry
                .get_config(DestinationId::new(2))
                .unwrap()
                .window_count,
            0
        );
        assert!(fixture.pending.get(id()).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_settled_writes_survive_rollback() {
        let fixture = Fixture::new();
        let mut journal = Journal::default();
        let mut log = SignalLog::new(8);
        stage_writes(&fixture, &mut journal);
        journal.settle();

        journal.rollback(&fixture.stores(), 2, &mut log);

        assert!(fixture.replay.is_processed(id()));
        assert!(fixture.pending.get(id()).is_ok());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_commit_publishes_in_order() {
        let mut journal = Journal::default();
        let mut log = SignalLog::new(8);
        journal.emit(RelaySignal::ChainDisabled {
            destination: DestinationId::new(2),
        });
        journal.settle();
        journal.emit(RelaySignal::ChainDisabled {
            destination: DestinationId::new(3),
        });
        journal.commit(7, &mut log);

        let records = log.snapshot();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records[1].signal,
            RelaySignal::ChainDisabled { destination } if destination == DestinationId::new(3)
        ));
    }
}
