//! Seam to the coverage pool that turns relayed requests into policies.

use thiserror::Error;

use crate::types::{CoverageRequest, PolicyId};

/// Failures reported by a [`CoveragePool`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool evaluated the request and will not cover it.
    #[error("pool declined coverage: {reason}")]
    Declined {
        /// Why the request was declined.
        reason: String,
    },

    /// The pool could not evaluate the request.
    #[error("pool unavailable: {reason}")]
    Unavailable {
        /// Description of the outage.
        reason: String,
    },
}

impl PoolError {
    /// Creates a declined error.
    #[must_use]
    pub fn declined(reason: impl Into<String>) -> Self {
        Self::Declined {
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Ledger that materializes policies for admitted inbound requests.
///
/// Called once per admitted envelope, after the replay mark and the pending
/// entry are in place. Any error is treated as a final verdict for that
/// message.
///
/// The receiving [`CoverageRelay`](crate::relay::CoverageRelay) holds its
/// transaction lock for the duration of the call. An implementation must not
/// call back into that relay, apart from `is_paused`, or it deadlocks.
pub trait CoveragePool: Send + Sync {
    /// Creates the policy backing `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`PoolError`] when the policy is not created.
    fn materialize_policy(&self, request: &CoverageRequest) -> Result<PolicyId, PoolError>;
}
