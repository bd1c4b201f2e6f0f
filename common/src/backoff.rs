// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module providing utilities for retrying operations with exponential backoff.

use std::time::Duration;

pub use ::backoff::backoff::Backoff;
pub use ::backoff::Error as BackoffError;
pub use ::backoff::ExponentialBackoff;

/// Return a backoff policy for store accesses that may hit transient faults
/// (a locked database, a briefly exhausted connection pool).
///
/// The policy is bounded: once the elapsed budget is spent, the operation
/// stops retrying and the last error is surfaced to the caller.
pub fn store_access_policy() -> ExponentialBackoff {
    const INITIAL_INTERVAL: Duration = Duration::from_millis(50);
    const MAX_INTERVAL: Duration = Duration::from_secs(1);
    const MAX_ELAPSED_TIME: Duration = Duration::from_secs(10);
    store_access_policy_with_max(INITIAL_INTERVAL, MAX_INTERVAL, MAX_ELAPSED_TIME)
}

fn store_access_policy_with_max(
    initial_interval: Duration,
    max_interval: Duration,
    max_elapsed_time: Duration,
) -> ExponentialBackoff {
    let current_interval = initial_interval;
    ExponentialBackoff {
        current_interval,
        initial_interval,
        multiplier: 2.0,
        max_interval,
        max_elapsed_time: Some(max_elapsed_time),
        ..ExponentialBackoff::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_policy_is_bounded() {
        let policy = store_access_policy();
        assert!(policy.max_elapsed_time.is_some());
        assert_eq!(policy.max_interval, Duration::from_secs(1));
    }

    #[test]
    fn store_policy_starts_small() {
        let mut policy = store_access_policy();
        let first = policy.next_backoff().expect("fresh policy yields a delay");
        // 50ms nominal, up to 1.5x after randomization.
        assert!(first < Duration::from_millis(200), "first delay {first:?}");
    }
}
