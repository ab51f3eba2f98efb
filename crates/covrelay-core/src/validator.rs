//! Bounded-value checks for coverage requests.
//!
//! Pure functions with no side effects; callers may run them speculatively
//! before committing any resources.

use crate::constants::{MAX_COVERAGE, MAX_DURATION, MIN_COVERAGE, MIN_DURATION};
use crate::error::RelayError;
use crate::types::Amount;

/// Checks both the amount and the duration of a request.
///
/// # Errors
///
/// Returns [`RelayError::CoverageAmountOutOfRange`] first if the amount is
/// out of bounds, otherwise [`RelayError::DurationOutOfRange`] if the
/// duration is.
pub fn validate(amount: Amount, duration_secs: u64) -> Result<(), RelayError> {
    validate_amount(amount)?;
    validate_duration(duration_secs)
}

/// Checks `MIN_COVERAGE <= amount <= MAX_COVERAGE`.
///
/// # Errors
///
/// Returns [`RelayError::CoverageAmountOutOfRange`] outside the range.
pub fn validate_amount(amount: Amount) -> Result<(), RelayError> {
    if !(MIN_COVERAGE..=MAX_COVERAGE).contains(&amount) {
        return Err(RelayError::CoverageAmountOutOfRange {
            amount,
            min: MIN_COVERAGE,
            max: MAX_COVERAGE,
        });
    }
    Ok(())
}

/// Checks `MIN_DURATION <= duration_secs <= MAX_DURATION`.
///
/// # Errors
///
/// Returns [`RelayError::DurationOutOfRange`] outside the range.
pub fn validate_duration(duration_secs: u64) -> Result<(), RelayError> {
    if !(MIN_DURATION..=MAX_DURATION).contains(&duration_secs) {
        return Err(RelayError::DurationOutOfRange {
            duration_secs,
            min: MIN_DURATION,
            max: MAX_DURATION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COVERAGE_UNIT;

    const THIRTY_DAYS: u64 = 2_592_000;

    #[test]
    fn test_amount_below_minimum_rejected() {
        // 0.005 units
        let half_min = COVERAGE_UNIT / 200;
        assert!(matches!(
            validate(half_min, THIRTY_DAYS),
            Err(RelayError::CoverageAmountOutOfRange { amount, .. }) if amount == half_min
        ));
    }

    #[test]
    fn test_amount_bounds_inclusive() {
        validate(MIN_COVERAGE, THIRTY_DAYS).unwrap();
        validate(1_000 * COVERAGE_UNIT, THIRTY_DAYS).unwrap();
        assert!(matches!(
            validate(1_001 * COVERAGE_UNIT, THIRTY_DAYS),
            Err(RelayError::CoverageAmountOutOfRange { .. })
        ));
        assert!(validate_amount(0).is_err());
    }

    #[test]
    fn test_duration_bounds_inclusive() {
        validate(COVERAGE_UNIT, 86_400).unwrap();
        validate(COVERAGE_UNIT, 31_536_000).unwrap();
        assert!(matches!(
            validate(COVERAGE_UNIT, 31_536_001),
            Err(RelayError::DurationOutOfRange {
                duration_secs: 31_536_001,
                ..
            })
        ));
        assert!(validate_duration(86_399).is_err());
    }

    #[test]
    fn test_amount_checked_before_duration() {
        assert!(matches!(
            validate(0, 0),
            Err(RelayError::CoverageAmountOutOfRange { .. })
        ));
    }
}
