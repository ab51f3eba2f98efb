//! The coverage relay: one endpoint of a cross-chain coverage channel.
//!
//! [`CoverageRelay`] composes the chain registry, replay guard, pending
//! ledger, fee estimator and access control behind a single operational
//! surface. It is `Send + Sync` and meant to be shared behind an `Arc`.
//!
//! # Transactions
//!
//! Every mutating operation holds the relay's control lock for its whole
//! duration and records a compensating write for each store change in an
//! undo journal. If the operation fails, the journal is replayed in reverse
//! and the stores end up exactly as they were. The only writes that outlive
//! a failure are:
//!
//! - the sender nonce consumed by a send whose delivery failed, so a nonce
//!   is never issued twice;
//! - the `Rejected` entry and replay mark left by a coverage pool refusal,
//!   which is a final verdict on that message.
//!
//! The lock is not reentrant and is held across the calls to
//! [`Transport::deliver`] and [`CoveragePool::materialize_policy`]. Those
//! collaborators must not call back into the same relay, except for
//! [`CoverageRelay::is_paused`].
//!
//! # Send path
//!
//! ```text
//! paused? ─> validate ─> request sourced here ─> destination enabled
//!   ─> quote ─> fee >= quote
//!   ─> admit(destination) ─> next_nonce ─> seal ─> record Outbound
//!   ─> deliver ─> reserve += fee - cost ─> CoverageRelayed
//! ```
//!
//! # Receive path
//!
//! ```text
//! check_and_mark(id) ─> paused? ─> addressed here ─> id recomputes
//!   ─> request source matches envelope ─> source enabled, origin trusted
//!   ─> validate ─> admit(source)
//!   ─> record Inbound ─> CoverageReceived ─> pool
//!        ├─ Ok  ─> Finalized, CoverageFinalized
//!        └─ Err ─> Rejected, CoverageRejected (settled), PolicyRejected
//! ```

mod journal;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use journal::{Journal, Stores, Undo};

use crate::access::{AccessControl, Capability, CapabilitySet};
use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::fee::{FeeEstimator, Transport};
use crate::pending::{
    CoverageStatus, InMemoryPendingStore, PendingCoverage, PendingLedger, PendingStore, Route,
};
use crate::pool::CoveragePool;
use crate::registry::{ChainConfig, ChainRegistry, ChainStore, InMemoryChainStore};
use crate::replay::{InMemoryReplayStore, ReplayGuard, ReplayStore};
use crate::signal::{RelaySignal, SignalLog, SignalRecord};
use crate::types::{
    Address, Amount, CoverageRequest, DestinationId, MessageEnvelope, MessageId, PolicyId,
    Timestamp,
};
use crate::validator;

/// Receipt for a reserve withdrawal.
///
/// The relay only debits its books; moving the funds to `recipient` is the
/// caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveWithdrawal {
    /// Receiving identity.
    pub recipient: Address,
    /// Amount debited.
    pub amount: Amount,
    /// Reserve left afterwards.
    pub remaining: Amount,
}

/// State guarded by the transaction lock.
#[derive(Debug)]
struct ControlState {
    access: AccessControl,
    reserve: Amount,
    signals: SignalLog,
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`CoverageRelay`].
///
/// Stores default to in-memory implementations and the clock to
/// [`SystemClock`].
pub struct CoverageRelayBuilder {
    config: RelayConfig,
    transport: Arc<dyn Transport>,
    pool: Arc<dyn CoveragePool>,
    clock: Arc<dyn Clock>,
    chain_store: Arc<dyn ChainStore>,
    replay_store: Arc<dyn ReplayStore>,
    pending_store: Arc<dyn PendingStore>,
}

impl CoverageRelayBuilder {
    /// Uses `clock` as the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Uses `store` for chain configuration.
    #[must_use]
    pub fn chain_store(mut self, store: Arc<dyn ChainStore>) -> Self {
        self.chain_store = store;
        self
    }

    /// Uses `store` for processed ids and nonces.
    #[must_use]
    pub fn replay_store(mut self, store: Arc<dyn ReplayStore>) -> Self {
        self.replay_store = store;
        self
    }

    /// Uses `store` for pending entries.
    #[must_use]
    pub fn pending_store(mut self, store: Arc<dyn PendingStore>) -> Self {
        self.pending_store = store;
        self
    }

    /// Validates the configuration, applies its bootstrap chains and roles,
    /// and returns the relay.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the configuration is invalid, or the
    /// registry error for a bootstrap chain that cannot be enabled.
    pub fn build(self) -> Result<CoverageRelay, RelayError> {
        let config = self.config;
        config.validate()?;

        let registry = ChainRegistry::new(
            self.chain_store,
            config.rate_limit_policy(),
            config.local_chain,
        );
        let now = self.clock.now_secs();
        for seed in &config.chains {
            registry.enable_chain(seed.destination, seed.remote_endpoint, seed.rate_limit, now)?;
        }

        let mut access = config
            .admin
            .map_or_else(AccessControl::default, AccessControl::with_admin);
        for seed in &config.roles {
            for capability in &seed.capabilities {
                access.assign(seed.account, *capability);
            }
        }

        tracing::info!(
            local_chain = %config.local_chain,
            local_endpoint = %config.local_endpoint,
            chains = config.chains.len(),
            window_secs = config.window_secs,
            "coverage relay started"
        );

        Ok(CoverageRelay {
            local_chain: config.local_chain,
            local_endpoint: config.local_endpoint,
            fees: FeeEstimator::new(registry.clone(), self.transport),
            registry,
            replay: ReplayGuard::new(self.replay_store),
            pending: PendingLedger::new(self.pending_store),
            pool: self.pool,
            clock: self.clock,
            control: Mutex::new(ControlState {
                access,
                reserve: 0,
                signals: SignalLog::new(config.signal_capacity),
            }),
            paused: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// CoverageRelay
// =============================================================================

/// A relay endpoint on one chain.
pub struct CoverageRelay {
    local_chain: DestinationId,
    local_endpoint: Address,
    registry: ChainRegistry,
    replay: ReplayGuard,
    pending: PendingLedger,
    fees: FeeEstimator,
    pool: Arc<dyn CoveragePool>,
    clock: Arc<dyn Clock>,
    control: Mutex<ControlState>,
    /// Mirror of the pause flag, readable while a transaction is running.
    paused: AtomicBool,
}

impl CoverageRelay {
    /// Starts building a relay from `config` and its two collaborators.
    #[must_use]
    pub fn builder(
        config: RelayConfig,
        transport: Arc<dyn Transport>,
        pool: Arc<dyn CoveragePool>,
    ) -> CoverageRelayBuilder {
        CoverageRelayBuilder {
            config,
            transport,
            pool,
            clock: Arc::new(SystemClock),
            chain_store: Arc::new(InMemoryChainStore::new()),
            replay_store: Arc::new(InMemoryReplayStore::new()),
            pending_store: Arc::new(InMemoryPendingStore::new()),
        }
    }

    /// Chain this relay runs on.
    #[must_use]
    pub const fn local_chain(&self) -> DestinationId {
        self.local_chain
    }

    /// Endpoint address stamped as origin on outbound envelopes.
    #[must_use]
    pub const fn local_endpoint(&self) -> Address {
        self.local_endpoint
    }

    fn control(&self) -> std::sync::MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` as one all-or-nothing transaction.
    fn transact<T>(
        &self,
        op: impl FnOnce(&mut ControlState, &mut Journal, Timestamp) -> Result<T, RelayError>,
    ) -> Result<T, RelayError> {
        let mut control = self.control();
        let now = self.clock.now_secs();
        let mut journal = Journal::default();
        match op(&mut *control, &mut journal, now) {
            Ok(value) => {
                journal.commit(now, &mut control.signals);
                Ok(value)
            },
            Err(err) => {
                let stores = Stores {
                    registry: &self.registry,
                    replay: &self.replay,
                    pending: &self.pending,
                };
                journal.rollback(&stores, now, &mut control.signals);
                Err(err)
            },
        }
    }

    // -------------------------------------------------------------------------
    // Chain registry
    // -------------------------------------------------------------------------

    /// Enables or reconfigures `destination`. Requires
    /// [`Capability::BridgeAdmin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], or the registry's validation
    /// errors (see [`ChainRegistry::enable_chain`]).
    pub fn enable_chain(
        &self,
        caller: Address,
        destination: DestinationId,
        remote_endpoint: Address,
        rate_limit: u32,
    ) -> Result<ChainConfig, RelayError> {
        self.transact(|control, journal, now| {
            control.access.require(caller, Capability::BridgeAdmin)?;
            let config = self
                .registry
                .enable_chain(destination, remote_endpoint, rate_limit, now)?;
            tracing::info!(
                destination = %destination,
                remote_endpoint = %remote_endpoint,
                rate_limit = config.rate_limit,
                "chain enabled"
            );
            journal.emit(RelaySignal::ChainConfigured {
                destination,
                remote_endpoint,
                rate_limit: config.rate_limit,
            });
            Ok(config)
        })
    }

    /// Disables `destination`. Requires [`Capability::BridgeAdmin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] or
    /// [`RelayError::ChainNotEnabled`].
    pub fn disable_chain(
        &self,
        caller: Address,
        destination: DestinationId,
    ) -> Result<(), RelayError> {
        self.transact(|control, journal, _| {
            control.access.require(caller, Capability::BridgeAdmin)?;
            self.registry.disable_chain(destination)?;
            tracing::info!(destination = %destination, "chain disabled");
            journal.emit(RelaySignal::ChainDisabled { destination });
            Ok(())
        })
    }

    /// Changes the limit of an enabled destination; zero selects the default.
    /// Requires [`Capability::BridgeAdmin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] or
    /// [`RelayError::ChainNotEnabled`].
    pub fn update_rate_limit(
        &self,
        caller: Address,
        destination: DestinationId,
        new_limit: u32,
    ) -> Result<u32, RelayError> {
        self.transact(|control, journal, _| {
            control.access.require(caller, Capability::BridgeAdmin)?;
            let change = self.registry.update_rate_limit(destination, new_limit)?;
            tracing::info!(
                destination = %destination,
                previous = change.previous,
                limit = change.current,
                "rate limit updated"
            );
            journal.emit(RelaySignal::RateLimitUpdated {
                destination,
                previous: change.previous,
                limit: change.current,
            });
            Ok(change.current)
        })
    }

    /// Returns the configuration of `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if it was never enabled.
    pub fn get_config(&self, destination: DestinationId) -> Result<ChainConfig, RelayError> {
        self.registry.get_config(destination)
    }

    /// Returns `true` if `destination` is enabled.
    #[must_use]
    pub fn is_enabled(&self, destination: DestinationId) -> bool {
        self.registry.is_enabled(destination)
    }

    /// Every configured destination.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainConfig> {
        self.registry.chains()
    }

    /// Admissions still available on `destination` in the current window.
    #[must_use]
    pub fn remaining_in_window(&self, destination: DestinationId) -> u32 {
        self.registry
            .remaining_in_window(destination, self.clock.now_secs())
    }

    // -------------------------------------------------------------------------
    // Coverage flow
    // -------------------------------------------------------------------------

    /// Quoted relay fee for sending `request` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] or [`RelayError::Transport`].
    pub fn estimate_fee(
        &self,
        destination: DestinationId,
        request: &CoverageRequest,
    ) -> Result<Amount, RelayError> {
        self.fees.estimate_fee(destination, request)
    }

    /// Sends `request` to `destination` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::BridgePaused`], a validation error,
    /// [`RelayError::InvalidDestination`] for the local chain or a request
    /// whose source chain is not the local chain,
    /// [`RelayError::ChainNotEnabled`], [`RelayError::InsufficientFee`],
    /// [`RelayError::RateLimitExceeded`], [`RelayError::NonceExhausted`] or
    /// [`RelayError::Transport`]. Only a transport failure leaves a trace: the
    /// nonce it consumed is not reissued.
    pub fn send_coverage(
        &self,
        caller: Address,
        destination: DestinationId,
        request: CoverageRequest,
        fee_paid: Amount,
    ) -> Result<MessageId, RelayError> {
        self.transact(|control, journal, now| {
            control.access.ensure_running()?;
            validator::validate(request.amount(), request.duration_secs())?;
            if destination == self.local_chain {
                return Err(RelayError::invalid_destination(
                    destination,
                    "cannot relay to the local chain",
                ));
            }
            if request.source_chain() != self.local_chain {
                return Err(RelayError::invalid_destination(
                    request.source_chain(),
                    format!(
                        "request claims source chain {}, relay runs on {}",
                        request.source_chain(),
                        self.local_chain
                    ),
                ));
            }

            let quote = self.fees.estimate_fee(destination, &request)?;
            if fee_paid < quote {
                tracing::warn!(
                    destination = %destination,
                    required = quote,
                    provided = fee_paid,
                    "insufficient relay fee"
                );
                return Err(RelayError::InsufficientFee {
                    destination,
                    required: quote,
                    provided: fee_paid,
                });
            }

            let previous = self.registry.admit(destination, now)?;
            journal.record(Undo::Chain(previous));

            let nonce = self.replay.next_nonce(caller)?;
            let amount = request.amount();
            let envelope = MessageEnvelope::seal(
                self.local_chain,
                destination,
                self.local_endpoint,
                caller,
                nonce,
                request,
            );
            let message_id = envelope.message_id();

            self.pending.record(
                message_id,
                envelope.payload().clone(),
                Route::Outbound { destination },
                now,
            )?;
            journal.record(Undo::PendingRecord(message_id));

            let cost = self
                .fees
                .transport()
                .deliver(destination, &envelope)
                .map_err(|source| {
                    tracing::warn!(
                        destination = %destination,
                        message_id = %message_id,
                        nonce,
                        error = %source,
                        "delivery failed"
                    );
                    RelayError::Transport {
                        destination,
                        source,
                    }
                })?;

            control.reserve = control.reserve.saturating_add(fee_paid.saturating_sub(cost));

            tracing::info!(
                destination = %destination,
                message_id = %message_id,
                sender = %caller,
                nonce,
                "coverage relayed"
            );
            journal.emit(RelaySignal::CoverageRelayed {
                message_id,
                destination,
                sender: caller,
                nonce,
                amount,
                fee_paid,
                cost,
            });
            Ok(message_id)
        })
    }

    /// Applies an inbound envelope and materializes its policy.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MessageAlreadyProcessed`] for a replay, and
    /// otherwise [`RelayError::BridgePaused`],
    /// [`RelayError::InvalidDestination`] (also when the request's source
    /// chain differs from the envelope's), [`RelayError::EnvelopeIntegrity`],
    /// [`RelayError::ChainNotEnabled`], [`RelayError::UntrustedOrigin`], a
    /// validation error, [`RelayError::RateLimitExceeded`] or
    /// [`RelayError::PolicyRejected`]. All but the last leave no trace and the
    /// same envelope may be retried.
    pub fn receive_coverage(&self, envelope: &MessageEnvelope) -> Result<PolicyId, RelayError> {
        self.transact(|control, journal, now| {
            let message_id = envelope.message_id();
            self.replay.check_and_mark(message_id)?;
            journal.record(Undo::ReplayMark(message_id));

            control.access.ensure_running()?;
            if envelope.destination() != self.local_chain {
                return Err(RelayError::invalid_destination(
                    envelope.destination(),
                    format!("envelope not addressed to local chain {}", self.local_chain),
                ));
            }
            envelope.verify_id()?;

            let source_chain = envelope.source();
            if envelope.payload().source_chain() != source_chain {
                tracing::warn!(
                    message_id = %message_id,
                    source_chain = %source_chain,
                    claimed = %envelope.payload().source_chain(),
                    "envelope and request disagree on source chain"
                );
                return Err(RelayError::invalid_destination(
                    envelope.payload().source_chain(),
                    format!("request claims a source chain other than {source_chain}"),
                ));
            }
            let config = match self.registry.get_config(source_chain) {
                Ok(config) if config.enabled => config,
                _ => {
                    return Err(RelayError::ChainNotEnabled {
                        destination: source_chain,
                    });
                },
            };
            if envelope.origin() != config.remote_endpoint {
                tracing::warn!(
                    source_chain = %source_chain,
                    origin = %envelope.origin(),
                    expected = %config.remote_endpoint,
                    "untrusted origin rejected"
                );
                return Err(RelayError::UntrustedOrigin {
                    source_chain,
                    origin: envelope.origin(),
                    expected: config.remote_endpoint,
                });
            }

            let request = envelope.payload();
            validator::validate(request.amount(), request.duration_secs())?;

            let previous = self.registry.admit(source_chain, now)?;
            journal.record(Undo::Chain(previous));

            self.pending.record(
                message_id,
                request.clone(),
                Route::Inbound { source_chain },
                now,
            )?;
            journal.record(Undo::PendingRecord(message_id));
            journal.emit(RelaySignal::CoverageReceived {
                message_id,
                source_chain,
                holder: request.holder(),
                amount: request.amount(),
            });

            match self.pool.materialize_policy(request) {
                Ok(policy_id) => {
                    self.pending.finalize(message_id, Some(policy_id), now)?;
                    tracing::info!(
                        message_id = %message_id,
                        source_chain = %source_chain,
                        policy_id = %policy_id,
                        "coverage received and finalized"
                    );
                    journal.emit(RelaySignal::CoverageFinalized {
                        message_id,
                        policy_id: Some(policy_id),
                    });
                    Ok(policy_id)
                },
                Err(source) => {
                    let reason = source.to_string();
                    self.pending.reject(message_id, reason.clone(), now)?;
                    tracing::warn!(
                        message_id = %message_id,
                        source_chain = %source_chain,
                        reason = %reason,
                        "coverage pool rejected policy"
                    );
                    journal.emit(RelaySignal::CoverageRejected { message_id, reason });
                    journal.settle();
                    Err(RelayError::PolicyRejected { message_id, source })
                },
            }
        })
    }

    /// Returns the pending entry for `message_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for an unknown id.
    pub fn get_pending_coverage(
        &self,
        message_id: MessageId,
    ) -> Result<PendingCoverage, RelayError> {
        self.pending.get(message_id)
    }

    /// Entries currently in `status`.
    #[must_use]
    pub fn coverage_with_status(&self, status: CoverageStatus) -> Vec<PendingCoverage> {
        self.pending.entries_with_status(status)
    }

    /// Number of unresolved entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Marks an outbound entry as honored by the destination. Requires
    /// [`Capability::BridgeAdmin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], [`RelayError::NotFound`] or
    /// [`RelayError::InvalidStateTransition`].
    pub fn finalize_coverage(
        &self,
        caller: Address,
        message_id: MessageId,
        policy_id: Option<PolicyId>,
    ) -> Result<PendingCoverage, RelayError> {
        self.transact(|control, journal, now| {
            control.access.require(caller, Capability::BridgeAdmin)?;
            let entry = self.pending.finalize(message_id, policy_id, now)?;
            tracing::info!(message_id = %message_id, "coverage finalized");
            journal.emit(RelaySignal::CoverageFinalized {
                message_id,
                policy_id,
            });
            Ok(entry)
        })
    }

    /// Marks an outbound entry as not honored. Requires
    /// [`Capability::BridgeAdmin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], [`RelayError::NotFound`] or
    /// [`RelayError::InvalidStateTransition`].
    pub fn reject_coverage(
        &self,
        caller: Address,
        message_id: MessageId,
        reason: impl Into<String>,
    ) -> Result<PendingCoverage, RelayError> {
        let reason = reason.into();
        self.transact(|control, journal, now| {
            control.access.require(caller, Capability::BridgeAdmin)?;
            let entry = self.pending.reject(message_id, reason.clone(), now)?;
            tracing::info!(message_id = %message_id, reason = %reason, "coverage rejected");
            journal.emit(RelaySignal::CoverageRejected { message_id, reason });
            Ok(entry)
        })
    }

    // -------------------------------------------------------------------------
    // Replay state
    // -------------------------------------------------------------------------

    /// The nonce `sender` will be issued by its next send.
    #[must_use]
    pub fn current_nonce(&self, sender: Address) -> u64 {
        self.replay.current_nonce(sender)
    }

    /// Returns `true` if the inbound message `message_id` has been applied.
    #[must_use]
    pub fn is_processed(&self, message_id: MessageId) -> bool {
        self.replay.is_processed(message_id)
    }

    // -------------------------------------------------------------------------
    // Access and emergency control
    // -------------------------------------------------------------------------

    /// Stops all admissions. Requires [`Capability::Emergency`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], or
    /// [`RelayError::InvalidStateTransition`] if already paused.
    pub fn pause_bridge(&self, caller: Address) -> Result<(), RelayError> {
        self.set_paused(caller, true)
    }

    /// Resumes admissions. Requires [`Capability::Emergency`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], or
    /// [`RelayError::InvalidStateTransition`] if not paused.
    pub fn unpause_bridge(&self, caller: Address) -> Result<(), RelayError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: Address, paused: bool) -> Result<(), RelayError> {
        self.transact(|control, journal, _| {
            control.access.set_paused(caller, paused)?;
            self.paused.store(paused, Ordering::SeqCst);
            if paused {
                tracing::warn!(by = %caller, "bridge paused");
            } else {
                tracing::info!(by = %caller, "bridge unpaused");
            }
            journal.emit(RelaySignal::PauseToggled { paused, by: caller });
            Ok(())
        })
    }

    /// Returns `true` while paused.
    ///
    /// Does not take the transaction lock, so collaborators may call it from
    /// inside [`Transport::deliver`] or [`CoveragePool::materialize_policy`].
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Grants `capability` to `account`. Requires [`Capability::Admin`].
    /// Returns `false` if the capability was already held.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`].
    pub fn grant_role(
        &self,
        caller: Address,
        account: Address,
        capability: Capability,
    ) -> Result<bool, RelayError> {
        self.transact(|control, journal, _| {
            let changed = control.access.grant(caller, account, capability)?;
            if changed {
                tracing::info!(
                    account = %account,
                    capability = %capability,
                    by = %caller,
                    "role granted"
                );
                journal.emit(RelaySignal::RoleGranted {
                    account,
                    capability,
                    by: caller,
                });
            }
            Ok(changed)
        })
    }

    /// Revokes `capability` from `account`. Requires [`Capability::Admin`].
    /// Returns `false` if the capability was not held.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`].
    pub fn revoke_role(
        &self,
        caller: Address,
        account: Address,
        capability: Capability,
    ) -> Result<bool, RelayError> {
        self.transact(|control, journal, _| {
            let changed = control.access.revoke(caller, account, capability)?;
            if changed {
                tracing::info!(
                    account = %account,
                    capability = %capability,
                    by = %caller,
                    "role revoked"
                );
                journal.emit(RelaySignal::RoleRevoked {
                    account,
                    capability,
                    by: caller,
                });
            }
            Ok(changed)
        })
    }

    /// Returns `true` if `account` holds `capability`.
    #[must_use]
    pub fn has_role(&self, account: Address, capability: Capability) -> bool {
        self.control().access.has_role(account, capability)
    }

    /// Every capability held by `account`.
    #[must_use]
    pub fn capabilities(&self, account: Address) -> CapabilitySet {
        self.control().access.capabilities(account)
    }

    // -------------------------------------------------------------------------
    // Reserve
    // -------------------------------------------------------------------------

    /// Accumulated fee surplus.
    #[must_use]
    pub fn reserve(&self) -> Amount {
        self.control().reserve
    }

    /// Debits `amount` from the reserve for `recipient`. Requires
    /// [`Capability::Admin`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`], [`RelayError::InvalidRecipient`]
    /// for the zero address, or [`RelayError::InsufficientReserve`].
    pub fn withdraw_reserve(
        &self,
        caller: Address,
        amount: Amount,
        recipient: Address,
    ) -> Result<ReserveWithdrawal, RelayError> {
        self.transact(|control, journal, _| {
            control.access.require(caller, Capability::Admin)?;
            if recipient.is_zero() {
                return Err(RelayError::InvalidRecipient { recipient });
            }
            let remaining = control
                .reserve
                .checked_sub(amount)
                .ok_or(RelayError::InsufficientReserve {
                    requested: amount,
                    available: control.reserve,
                })?;
            control.reserve = remaining;
            tracing::info!(recipient = %recipient, amount, remaining, "reserve withdrawn");
            journal.emit(RelaySignal::ReserveWithdrawn {
                recipient,
                amount,
                remaining,
            });
            Ok(ReserveWithdrawal {
                recipient,
                amount,
                remaining,
            })
        })
    }

    // -------------------------------------------------------------------------
    // Signals
    // -------------------------------------------------------------------------

    /// Copies the retained signals, oldest first.
    #[must_use]
    pub fn signals(&self) -> Vec<SignalRecord> {
        self.control().signals.snapshot()
    }

    /// Removes and returns the retained signals, oldest first.
    pub fn drain_signals(&self) -> Vec<SignalRecord> {
        self.control().signals.drain()
    }

    /// Signals evicted because the log was full.
    #[must_use]
    pub fn dropped_signals(&self) -> u64 {
        self.control().signals.dropped()
    }
}

impl std::fmt::Debug for CoverageRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageRelay")
            .field("local_chain", &self.local_chain)
            .field("local_endpoint", &self.local_endpoint)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
