//! Storage seam for chain configuration.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::chain::ChainConfig;
use crate::types::DestinationId;

/// Keyed storage of [`ChainConfig`] entries.
///
/// Implementations must be safe to share across threads. The registry only
/// ever overwrites whole entries, so a store needs no partial-update logic.
pub trait ChainStore: Send + Sync {
    /// Returns the entry for `destination`, if any.
    fn get(&self, destination: DestinationId) -> Option<ChainConfig>;

    /// Inserts or replaces the entry keyed by `config.destination`.
    fn put(&self, config: ChainConfig);

    /// Returns every entry ordered by destination.
    fn list(&self) -> Vec<ChainConfig>;
}

/// [`ChainStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    entries: RwLock<BTreeMap<DestinationId, ChainConfig>>,
}

impl InMemoryChainStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for InMemoryChainStore {
    fn get(&self, destination: DestinationId) -> Option<ChainConfig> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&destination)
            .cloned()
    }

    fn put(&self, config: ChainConfig) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.destination, config);
    }

    fn list(&self) -> Vec<ChainConfig> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
