//! Property-based tests for the fixed-window admission check.

use std::sync::Arc;

use proptest::prelude::*;

use super::{ChainRegistry, InMemoryChainStore, RateLimitPolicy};
use crate::error::RelayError;
use crate::types::{Address, DestinationId};

const DESTINATION: DestinationId = DestinationId::new(10);

fn registry(window_secs: u64, limit: u32) -> ChainRegistry {
    let registry = ChainRegistry::new(
        Arc::new(InMemoryChainStore::new()),
        RateLimitPolicy {
            window_secs,
            default_limit: 100,
        },
        DestinationId::new(1),
    );
    registry
        .enable_chain(DESTINATION, Address::repeat_byte(7), limit, 0)
        .unwrap_or_else(|err| panic!("enable failed: {err}"));
    registry
}

/// Strategy for a sorted sequence of attempt times.
fn attempt_times() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..20_000, 0..200).prop_map(|mut times| {
        times.sort_unstable();
        times
    })
}

/// One registry operation in a generated sequence.
#[derive(Debug, Clone, Copy)]
enum Step {
    Admit,
    UpdateLimit(u32),
    Reenable(u32),
}

/// Strategy for timed operations, mostly admissions, sorted by time.
fn limit_steps() -> impl Strategy<Value = Vec<(u64, Step)>> {
    let step = prop_oneof![
        8 => Just(Step::Admit),
        1 => (0u32..20).prop_map(Step::UpdateLimit),
        1 => (0u32..20).prop_map(Step::Reenable),
    ];
    prop::collection::vec((0u64..20_000, step), 0..200).prop_map(|mut steps| {
        steps.sort_by_key(|(t, _)| *t);
        steps
    })
}

proptest! {
    /// Property: the window count never exceeds the limit, even when the
    /// limit is changed or the chain is re-enabled mid-window.
    #[test]
    fn prop_count_never_exceeds_limit(
        limit in 1u32..20,
        window_secs in 1u64..5_000,
        steps in limit_steps(),
    ) {
        let registry = registry(window_secs, limit);
        for (t, step) in steps {
            match step {
                Step::Admit => {
                    let _ = registry.admit(DESTINATION, t);
                },
                Step::UpdateLimit(new_limit) => {
                    registry.update_rate_limit(DESTINATION, new_limit).unwrap();
                },
                Step::Reenable(new_limit) => {
                    registry.disable_chain(DESTINATION).unwrap();
                    registry
                        .enable_chain(DESTINATION, Address::repeat_byte(7), new_limit, t)
                        .unwrap();
                },
            }
            let config = registry.get_config(DESTINATION).unwrap();
            prop_assert!(config.window_count <= config.rate_limit);
        }
    }

    /// Property: within one window the L-th attempt succeeds and the
    /// (L+1)-th fails; a full burst is admitted after the window elapses.
    #[test]
    fn prop_limit_then_reset(
        limit in 1u32..50,
        window_secs in 1u64..10_000,
        start in 1u64..1_000,
    ) {
        let registry = registry(window_secs, limit);

        // First attempt at `start` may reset the window opened at zero.
        for _ in 0..limit {
            prop_assert!(registry.admit(DESTINATION, start).is_ok());
        }
        let rejected = registry.admit(DESTINATION, start);
        let is_rate_limited = matches!(rejected, Err(RelayError::RateLimitExceeded { .. }));
        prop_assert!(is_rate_limited);

        let window_start = registry.get_config(DESTINATION).unwrap().window_start;
        let reopen = window_start + window_secs + 1;
        for _ in 0..limit {
            prop_assert!(registry.admit(DESTINATION, reopen).is_ok());
        }
        prop_assert!(registry.admit(DESTINATION, reopen).is_err());
    }

    /// Property: admissions within any single window never exceed the limit.
    #[test]
    fn prop_admissions_per_window_bounded(
        limit in 1u32..10,
        window_secs in 1u64..1_000,
        times in attempt_times(),
    ) {
        let registry = registry(window_secs, limit);
        let mut admitted_by_window = std::collections::BTreeMap::<u64, u32>::new();
        for t in times {
            if registry.admit(DESTINATION, t).is_ok() {
                let window_start = registry.get_config(DESTINATION).unwrap().window_start;
                *admitted_by_window.entry(window_start).or_default() += 1;
            }
        }
        for count in admitted_by_window.values() {
            prop_assert!(*count <= limit);
        }
    }
}
