//! Transport seam and fee quoting.
//!
//! The relay never prices anything itself. [`FeeEstimator`] checks that the
//! destination is reachable and asks the [`Transport`] what delivery costs.

use std::sync::Arc;

use thiserror::Error;

use crate::error::RelayError;
use crate::registry::ChainRegistry;
use crate::types::{Amount, CoverageRequest, DestinationId, MessageEnvelope};

/// Failures reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The destination cannot be reached right now.
    #[error("destination {destination} unreachable: {reason}")]
    Unreachable {
        /// The destination that was addressed.
        destination: DestinationId,
        /// Description of the failure.
        reason: String,
    },

    /// The transport refused the message.
    #[error("transport refused message: {reason}")]
    Refused {
        /// Why the message was refused.
        reason: String,
    },
}

impl TransportError {
    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(destination: DestinationId, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            destination,
            reason: reason.into(),
        }
    }

    /// Creates a refused error.
    #[must_use]
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::Refused {
            reason: reason.into(),
        }
    }
}

/// Asynchronous message channel between relays.
///
/// Delivery is at least once: the same envelope may reach the destination
/// more than once and envelopes may be reordered.
///
/// [`Transport::deliver`] runs while the sending
/// [`CoverageRelay`](crate::relay::CoverageRelay) holds its transaction lock.
/// An implementation must not call back into that relay, apart from
/// `is_paused`, or it deadlocks. Handing the envelope to another relay is
/// fine.
pub trait Transport: Send + Sync {
    /// Cost of delivering `request` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if no quote is available.
    fn quote(
        &self,
        destination: DestinationId,
        request: &CoverageRequest,
    ) -> Result<Amount, TransportError>;

    /// Hands `envelope` to the channel and returns the amount charged.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the envelope was not accepted.
    fn deliver(
        &self,
        destination: DestinationId,
        envelope: &MessageEnvelope,
    ) -> Result<Amount, TransportError>;
}

/// Quotes relay fees for enabled destinations.
pub struct FeeEstimator {
    registry: ChainRegistry,
    transport: Arc<dyn Transport>,
}

impl FeeEstimator {
    /// Creates an estimator over `registry` and `transport`.
    #[must_use]
    pub fn new(registry: ChainRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Quoted cost of sending `request` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] if the destination is unknown
    /// or disabled, and [`RelayError::Transport`] if the transport cannot
    /// quote.
    pub fn estimate_fee(
        &self,
        destination: DestinationId,
        request: &CoverageRequest,
    ) -> Result<Amount, RelayError> {
        if !self.registry.is_enabled(destination) {
            return Err(RelayError::ChainNotEnabled { destination });
        }
        self.transport
            .quote(destination, request)
            .map_err(|source| RelayError::Transport {
                destination,
                source,
            })
    }

    /// The transport the estimator quotes from.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl std::fmt::Debug for FeeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeEstimator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
