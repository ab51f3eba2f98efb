//! Chain registry: which destinations are reachable, through which remote
//! endpoint, and at what throughput.
//!
//! The registry owns the [`ChainConfig`] entries and runs the fixed-window
//! admission check from [`rate_limit`] against them. Capability checks are
//! the caller's concern; every method here assumes the caller is already
//! authorized.
//!
//! # Invariants
//!
//! - An entry that has ever been enabled has a non-zero destination and a
//!   non-zero remote endpoint.
//! - Entries are never deleted. Disabling keeps the window counters.
//! - The relay's own chain is never registered as a destination.

mod chain;
pub mod rate_limit;
mod store;

#[cfg(test)]
mod proptest_rate_limit;

use std::sync::Arc;

pub use chain::ChainConfig;
pub use rate_limit::RateLimitPolicy;
pub use store::{ChainStore, InMemoryChainStore};

use crate::error::RelayError;
use crate::types::{Address, DestinationId, Timestamp};

/// Outcome of a rate limit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitChange {
    /// Limit before the update.
    pub previous: u32,
    /// Limit after the update.
    pub current: u32,
}

/// Registry of destination chains.
#[derive(Clone)]
pub struct ChainRegistry {
    store: Arc<dyn ChainStore>,
    policy: RateLimitPolicy,
    local_chain: DestinationId,
}

impl ChainRegistry {
    /// Creates a registry for the relay running on `local_chain`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ChainStore>,
        policy: RateLimitPolicy,
        local_chain: DestinationId,
    ) -> Self {
        Self {
            store,
            policy,
            local_chain,
        }
    }

    /// The window length and default limit in force.
    #[must_use]
    pub const fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// The chain this relay runs on.
    #[must_use]
    pub const fn local_chain(&self) -> DestinationId {
        self.local_chain
    }

    /// Enables `destination`, creating its entry on first use.
    ///
    /// A `rate_limit` of zero selects the policy default. Re-enabling an
    /// existing entry replaces its endpoint and limit and keeps the current
    /// window, with its count capped at the new limit.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidDestination`] for the zero selector or the
    /// local chain, and [`RelayError::InvalidRemoteEndpoint`] for a zero
    /// endpoint. Nothing is written on error.
    pub fn enable_chain(
        &self,
        destination: DestinationId,
        remote_endpoint: Address,
        rate_limit: u32,
        now: Timestamp,
    ) -> Result<ChainConfig, RelayError> {
        if destination.is_zero() {
            return Err(RelayError::invalid_destination(
                destination,
                "zero destination selector",
            ));
        }
        if destination == self.local_chain {
            return Err(RelayError::invalid_destination(
                destination,
                "destination is the local chain",
            ));
        }
        if remote_endpoint.is_zero() {
            return Err(RelayError::InvalidRemoteEndpoint {
                destination,
                endpoint: remote_endpoint,
            });
        }

        let rate_limit = self.policy.resolve_limit(rate_limit);
        let config = match self.store.get(destination) {
            Some(mut existing) => {
                existing.remote_endpoint = remote_endpoint;
                existing.rate_limit = rate_limit;
                existing.window_count = existing.window_count.min(rate_limit);
                existing.enabled = true;
                existing
            },
            None => ChainConfig::new(destination, remote_endpoint, rate_limit, now),
        };
        self.store.put(config.clone());
        Ok(config)
    }

    /// Disables `destination`, keeping its counters.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] if the destination is unknown
    /// or already disabled.
    pub fn disable_chain(&self, destination: DestinationId) -> Result<ChainConfig, RelayError> {
        let mut config = self.enabled_entry(destination)?;
        config.enabled = false;
        self.store.put(config.clone());
        Ok(config)
    }

    /// Changes the limit of an enabled destination. Zero selects the default.
    ///
    /// Lowering the limit below the current window count caps the count, so
    /// the window stays full until it resets.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] if the destination is unknown
    /// or disabled.
    pub fn update_rate_limit(
        &self,
        destination: DestinationId,
        new_limit: u32,
    ) -> Result<RateLimitChange, RelayError> {
        let mut config = self.enabled_entry(destination)?;
        let change = RateLimitChange {
            previous: config.rate_limit,
            current: self.policy.resolve_limit(new_limit),
        };
        config.rate_limit = change.current;
        config.window_count = config.window_count.min(change.current);
        self.store.put(config);
        Ok(change)
    }

    /// Returns the stored entry for `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the destination was never enabled.
    pub fn get_config(&self, destination: DestinationId) -> Result<ChainConfig, RelayError> {
        self.store
            .get(destination)
            .ok_or_else(|| RelayError::not_found("chain", destination))
    }

    /// Returns `true` if `destination` is known and enabled.
    #[must_use]
    pub fn is_enabled(&self, destination: DestinationId) -> bool {
        self.store
            .get(destination)
            .is_some_and(|config| config.enabled)
    }

    /// Lists every entry, enabled or not, ordered by destination.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainConfig> {
        self.store.list()
    }

    /// Admissions still available on `destination` at `now`.
    ///
    /// Unknown and disabled destinations report zero.
    #[must_use]
    pub fn remaining_in_window(&self, destination: DestinationId, now: Timestamp) -> u32 {
        self.store
            .get(destination)
            .map_or(0, |config| self.policy.remaining(&config, now))
    }

    /// Counts one message against `destination`'s window.
    ///
    /// On success returns the entry as it was before the admission, which
    /// [`ChainRegistry::restore`] accepts to undo it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] or
    /// [`RelayError::RateLimitExceeded`]; the stored entry is unchanged.
    pub fn admit(
        &self,
        destination: DestinationId,
        now: Timestamp,
    ) -> Result<ChainConfig, RelayError> {
        let previous = self
            .store
            .get(destination)
            .ok_or(RelayError::ChainNotEnabled { destination })?;
        let mut next = previous.clone();
        self.policy.admit(&mut next, now)?;
        self.store.put(next);
        Ok(previous)
    }

    /// Writes back an entry captured by [`ChainRegistry::admit`].
    pub fn restore(&self, previous: ChainConfig) {
        self.store.put(previous);
    }

    fn enabled_entry(&self, destination: DestinationId) -> Result<ChainConfig, RelayError> {
        match self.store.get(destination) {
            Some(config) if config.enabled => Ok(config),
            _ => Err(RelayError::ChainNotEnabled { destination }),
        }
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("policy", &self.policy)
            .field("local_chain", &self.local_chain)
            .finish_non_exhaustive()
    }
}
