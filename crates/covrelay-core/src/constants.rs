//! Read-only protocol constants.
//!
//! Coverage amounts are fixed-point integers with [`COVERAGE_DECIMALS`]
//! decimals, so `0.01` coverage units is `COVERAGE_UNIT / 100`.

use crate::types::Amount;

/// Number of decimals in a coverage amount.
pub const COVERAGE_DECIMALS: u32 = 18;

/// One whole coverage unit in base units.
pub const COVERAGE_UNIT: Amount = 10u128.pow(COVERAGE_DECIMALS);

/// Smallest coverage amount a request may carry (0.01 units).
pub const MIN_COVERAGE: Amount = COVERAGE_UNIT / 100;

/// Largest coverage amount a request may carry (1000 units).
pub const MAX_COVERAGE: Amount = 1_000 * COVERAGE_UNIT;

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Shortest coverage duration (1 day).
pub const MIN_DURATION: u64 = SECONDS_PER_DAY;

/// Longest coverage duration (365 days).
pub const MAX_DURATION: u64 = 365 * SECONDS_PER_DAY;

/// Messages admitted per window when a chain is enabled with a limit of zero.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Length of the fixed rate-limit window (1 hour).
pub const DEFAULT_WINDOW_SECS: u64 = 3_600;

/// Signals retained by the relay before the oldest are dropped.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 1_024;
