// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Property-based tests for the reconnect backoff.
//!
//! These tests verify invariants that should hold for any parameter combination:
//! - Delays never exceed the cap (plus jitter)
//! - Linear delays follow `min(base * n, cap)` exactly without jitter
//! - Exactly `max_attempts` delays are produced before exhaustion
//! - Reset restores the initial behaviour

use std::time::Duration;

use hyperstream_network::backoff::{BackoffStrategy, ReconnectBackoff};
use proptest::prelude::*;
use rstest::rstest;

fn strategy_strategy() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        Just(BackoffStrategy::Linear),
        (1.0f64..=10.0f64).prop_map(|factor| BackoffStrategy::Exponential { factor }),
    ]
}

/// Generate valid backoff parameters.
fn backoff_params_strategy()
-> impl Strategy<Value = (Duration, Duration, BackoffStrategy, u64, u32)> {
    (
        1u64..=5000u64,   // base_ms: 1ms to 5s
        10u64..=60000u64, // max_ms: 10ms to 60s
        strategy_strategy(),
        0u64..=1000u64, // jitter_ms: 0 to 1s
        0u32..=20u32,   // max_attempts
    )
        .prop_filter("max >= base", |(base_ms, max_ms, _, _, _)| max_ms >= base_ms)
        .prop_map(|(base_ms, max_ms, strategy, jitter_ms, max_attempts)| {
            (
                Duration::from_millis(base_ms),
                Duration::from_millis(max_ms),
                strategy,
                jitter_ms,
                max_attempts,
            )
        })
}

proptest! {
    /// Property: every delay stays within the cap plus jitter and grows monotonically.
    #[rstest]
    fn backoff_delays_are_bounded_and_monotonic(
        (base, max, strategy, jitter_ms, max_attempts) in backoff_params_strategy(),
    ) {
        let backoff = ReconnectBackoff::new(base, max, strategy, jitter_ms, max_attempts)
            .expect("Valid backoff parameters");

        let mut last = Duration::ZERO;
        for attempt in 1..=max_attempts.max(1) {
            let delay = backoff.delay_for(attempt);
            prop_assert!(delay <= max, "Delay {delay:?} exceeds cap {max:?}");
            prop_assert!(delay >= last, "Delay shrank: {last:?} -> {delay:?}");
            last = delay;
        }
    }

    /// Property: exactly `max_attempts` delays are produced, each within jitter of its base.
    #[rstest]
    fn backoff_exhausts_after_max_attempts(
        (base, max, strategy, jitter_ms, max_attempts) in backoff_params_strategy(),
    ) {
        let mut backoff = ReconnectBackoff::new(base, max, strategy, jitter_ms, max_attempts)
            .expect("Valid backoff parameters");

        for attempt in 1..=max_attempts {
            let delay = backoff.next_duration();
            prop_assert!(delay.is_some(), "Attempt {attempt} should produce a delay");
            let delay = delay.unwrap();
            let expected = backoff.delay_for(attempt);
            prop_assert!(delay >= expected);
            prop_assert!(delay <= expected + Duration::from_millis(jitter_ms));
        }

        prop_assert!(backoff.next_duration().is_none());
        prop_assert!(backoff.is_exhausted());

        backoff.reset();
        prop_assert_eq!(backoff.attempt(), 0);
        prop_assert!(!backoff.is_exhausted());
    }

    /// Property: linear delays follow `min(base * n, cap)` exactly.
    #[rstest]
    fn linear_backoff_matches_formula(
        base_ms in 1u64..=5000u64,
        cap_ms in 1u64..=60000u64,
        attempt in 1u32..=100u32,
    ) {
        let base = Duration::from_millis(base_ms);
        let cap = Duration::from_millis(cap_ms.max(base_ms));
        let backoff = ReconnectBackoff::linear(base, cap, 100);

        let expected = std::cmp::min(base * attempt, cap);
        prop_assert_eq!(backoff.delay_for(attempt), expected);
    }
}
