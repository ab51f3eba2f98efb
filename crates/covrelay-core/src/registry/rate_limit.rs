//! Fixed-window throughput limiting, embedded in each [`ChainConfig`].
//!
//! Algorithm for an admission attempt at time `t` on destination `d`:
//!
//! 1. `d` disabled: reject with `ChainNotEnabled`.
//! 2. `t - window_start(d) > window_secs`: reset the count and set the window
//!    start to `t`.
//! 3. `count(d) >= limit(d)`: reject with `RateLimitExceeded`.
//! 4. Otherwise increment the count and admit.
//!
//! # Fixed, not sliding
//!
//! A full burst of `limit` messages is admitted right after every reset, no
//! matter how recently the previous window filled up. Two bursts straddling a
//! boundary can therefore admit up to `2 * limit` messages in a short span.
//! This is the documented behavior and is covered by tests.
//!
//! # Invariants
//!
//! - The window count never exceeds the configured limit.
//! - A rejected attempt leaves the count and window untouched, except for a
//!   window reset in step 2, which is a pure function of the clock.

use serde::{Deserialize, Serialize};

use super::chain::ChainConfig;
use crate::constants::{DEFAULT_RATE_LIMIT, DEFAULT_WINDOW_SECS};
use crate::error::RelayError;
use crate::types::Timestamp;

/// Window length and default limit shared by all destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Length of one window in seconds.
    pub window_secs: u64,

    /// Limit applied when a destination is configured with a limit of zero.
    pub default_limit: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            default_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl RateLimitPolicy {
    /// Maps a requested limit to the effective one (zero means default).
    #[must_use]
    pub const fn resolve_limit(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_limit
        } else {
            requested
        }
    }

    /// Returns `true` if the window that started at `window_start` has
    /// elapsed at `now`.
    #[must_use]
    pub const fn window_elapsed(&self, window_start: Timestamp, now: Timestamp) -> bool {
        now.saturating_sub(window_start) > self.window_secs
    }

    /// First timestamp at which a window started at `window_start` resets.
    #[must_use]
    pub const fn window_reopens_at(&self, window_start: Timestamp) -> Timestamp {
        window_start
            .saturating_add(self.window_secs)
            .saturating_add(1)
    }

    /// Runs one admission attempt against `chain` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChainNotEnabled`] for a disabled chain and
    /// [`RelayError::RateLimitExceeded`] when the current window is full.
    pub fn admit(&self, chain: &mut ChainConfig, now: Timestamp) -> Result<(), RelayError> {
        if !chain.enabled {
            return Err(RelayError::ChainNotEnabled {
                destination: chain.destination,
            });
        }

        if self.window_elapsed(chain.window_start, now) {
            tracing::debug!(
                destination = %chain.destination,
                previous_count = chain.window_count,
                window_start = now,
                "rate limit window reset"
            );
            chain.window_count = 0;
            chain.window_start = now;
        }

        if chain.window_count >= chain.rate_limit {
            tracing::warn!(
                destination = %chain.destination,
                count = chain.window_count,
                limit = chain.rate_limit,
                "rate limit exceeded"
            );
            return Err(RelayError::RateLimitExceeded {
                destination: chain.destination,
                limit: chain.rate_limit,
                window_reopens_at: self.window_reopens_at(chain.window_start),
            });
        }

        chain.window_count += 1;
        Ok(())
    }

    /// Messages still admissible on `chain` at `now`, without mutating it.
    #[must_use]
    pub fn remaining(&self, chain: &ChainConfig, now: Timestamp) -> u32 {
        if !chain.enabled {
            return 0;
        }
        if self.window_elapsed(chain.window_start, now) {
            return chain.rate_limit;
        }
        chain.rate_limit.saturating_sub(chain.window_count)
    }
}
