//! Per-destination configuration record.

use serde::{Deserialize, Serialize};

use crate::types::{Address, DestinationId, Timestamp};

/// Configuration and rate-limit counters for one destination.
///
/// Created by the first `enable_chain` for a destination and never deleted;
/// disabling keeps the counters so a re-enable resumes the same window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The destination this entry configures.
    pub destination: DestinationId,

    /// Address of the counterpart relay on the destination.
    pub remote_endpoint: Address,

    /// Whether admissions to and from the destination are allowed.
    pub enabled: bool,

    /// Maximum admissions per window.
    pub rate_limit: u32,

    /// Admissions counted in the current window.
    pub window_count: u32,

    /// Start of the current window.
    pub window_start: Timestamp,
}

impl ChainConfig {
    /// Creates an enabled entry with an empty window starting at `now`.
    #[must_use]
    pub const fn new(
        destination: DestinationId,
        remote_endpoint: Address,
        rate_limit: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            destination,
            remote_endpoint,
            enabled: true,
            rate_limit,
            window_count: 0,
            window_start: now,
        }
    }
}
