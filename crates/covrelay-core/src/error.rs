//! Error taxonomy for relay operations.
//!
//! Every failure aborts the whole operation; the relay's undo journal makes
//! sure no partial state survives. Variants carry the offending destination,
//! amount, identity or message id so a caller can decide whether to retry
//! with corrected input.

use thiserror::Error;

use crate::access::Capability;
use crate::config::ConfigError;
use crate::fee::TransportError;
use crate::pool::PoolError;
use crate::types::{Address, Amount, DestinationId, MessageId, Timestamp};

/// Errors returned by the coverage relay.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RelayError {
    /// The destination is unknown or disabled.
    #[error("destination {destination} is not enabled")]
    ChainNotEnabled {
        /// The destination that was addressed.
        destination: DestinationId,
    },

    /// The destination identifier cannot be used.
    #[error("invalid destination {destination}: {reason}")]
    InvalidDestination {
        /// The rejected destination.
        destination: DestinationId,
        /// Why it was rejected.
        reason: String,
    },

    /// The remote endpoint is zero.
    #[error("invalid remote endpoint {endpoint} for destination {destination}")]
    InvalidRemoteEndpoint {
        /// The destination being configured.
        destination: DestinationId,
        /// The rejected endpoint.
        endpoint: Address,
    },

    /// The destination's window is full.
    #[error(
        "rate limit exceeded for destination {destination}: {limit} messages per window, next window opens at {window_reopens_at}"
    )]
    RateLimitExceeded {
        /// The throttled destination.
        destination: DestinationId,
        /// The configured limit.
        limit: u32,
        /// First timestamp at which the window resets.
        window_reopens_at: Timestamp,
    },

    /// The message id was already applied.
    #[error("message {message_id} already processed")]
    MessageAlreadyProcessed {
        /// The replayed message id.
        message_id: MessageId,
    },

    /// Coverage amount outside the allowed range.
    #[error("coverage amount {amount} outside [{min}, {max}]")]
    CoverageAmountOutOfRange {
        /// The rejected amount.
        amount: Amount,
        /// Lower bound.
        min: Amount,
        /// Upper bound.
        max: Amount,
    },

    /// Coverage duration outside the allowed range.
    #[error("coverage duration {duration_secs}s outside [{min}, {max}]")]
    DurationOutOfRange {
        /// The rejected duration.
        duration_secs: u64,
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// The caller lacks the capability the operation requires.
    #[error("{caller} lacks the {required} capability")]
    Unauthorized {
        /// The calling identity.
        caller: Address,
        /// The capability that was required.
        required: Capability,
    },

    /// Relay operations are paused.
    #[error("bridge is paused")]
    BridgePaused,

    /// A pending entry already exists for the message id.
    #[error("pending entry for message {message_id} already exists")]
    DuplicateEntry {
        /// The duplicated key.
        message_id: MessageId,
    },

    /// The requested transition is not allowed from the current state.
    #[error("invalid state transition for {subject}: {from} -> {to}")]
    InvalidStateTransition {
        /// What was being transitioned.
        subject: String,
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// Lookup of an unknown key.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up.
        kind: &'static str,
        /// The missing key.
        key: String,
    },

    /// The envelope's origin is not the trusted endpoint of its source chain.
    #[error("origin {origin} is not the trusted endpoint {expected} of chain {source_chain}")]
    UntrustedOrigin {
        /// Chain the envelope claims to come from.
        source_chain: DestinationId,
        /// Origin declared in the envelope.
        origin: Address,
        /// Endpoint registered for the chain.
        expected: Address,
    },

    /// The declared message id does not match the envelope content.
    #[error("envelope integrity check failed: declared {declared}, computed {computed}")]
    EnvelopeIntegrity {
        /// Id carried by the envelope.
        declared: MessageId,
        /// Id recomputed from the content.
        computed: MessageId,
    },

    /// The fee paid does not cover the transport quote.
    #[error("insufficient fee for destination {destination}: required {required}, provided {provided}")]
    InsufficientFee {
        /// Destination being paid for.
        destination: DestinationId,
        /// Quoted cost.
        required: Amount,
        /// Amount offered.
        provided: Amount,
    },

    /// A per-sender nonce counter reached its maximum.
    #[error("nonce space exhausted for sender {sender}")]
    NonceExhausted {
        /// The sender whose counter cannot advance.
        sender: Address,
    },

    /// Withdrawal larger than the accumulated reserve.
    #[error("insufficient reserve: requested {requested}, available {available}")]
    InsufficientReserve {
        /// Requested amount.
        requested: Amount,
        /// Current reserve.
        available: Amount,
    },

    /// Reserve withdrawal to the zero address.
    #[error("invalid reserve recipient {recipient}")]
    InvalidRecipient {
        /// The rejected recipient.
        recipient: Address,
    },

    /// The transport failed to quote or deliver.
    #[error("transport failed for destination {destination}: {source}")]
    Transport {
        /// Destination being reached.
        destination: DestinationId,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The coverage pool refused to materialize the policy.
    #[error("coverage pool rejected message {message_id}: {source}")]
    PolicyRejected {
        /// The rejected message.
        message_id: MessageId,
        /// Underlying pool failure.
        #[source]
        source: PoolError,
    },

    /// Relay configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RelayError {
    /// Creates an invalid destination error.
    #[must_use]
    pub fn invalid_destination(destination: DestinationId, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            destination,
            reason: reason.into(),
        }
    }

    /// Creates an invalid state transition error.
    #[must_use]
    pub fn invalid_transition(
        subject: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            subject: subject.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Returns `true` if the same request may succeed later without changes.
    ///
    /// Rate limits reopen, pauses lift and transports recover. Everything
    /// else needs corrected input or an operator action first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::BridgePaused | Self::Transport { .. }
        )
    }
}
