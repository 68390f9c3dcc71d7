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

//! Provides a bounded reconnect backoff with optional jitter.
//!
//! The delay for retry number `n` (counting from 1) is capped at a configurable ceiling and
//! computed with one of two growth strategies:
//!
//! - [`BackoffStrategy::Linear`]: `min(base * n, cap)`.
//! - [`BackoffStrategy::Exponential`]: `min(base * factor^(n - 1), cap)`.
//!
//! The backoff also counts attempts and reports exhaustion once more than `max_attempts`
//! retries have been requested, so the caller can stop retrying and surface the failure.

use std::time::Duration;

use rand::RngExt;

/// Default delay for the first retry.
pub const DEFAULT_DELAY_BASE: Duration = Duration::from_secs(1);

/// Default ceiling for any retry delay.
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_secs(30);

/// Default number of retries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How the delay grows between consecutive retries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackoffStrategy {
    /// Delay grows by `base` on each retry.
    Linear,
    /// Delay is multiplied by `factor` on each retry.
    Exponential { factor: f64 },
}

#[derive(Clone, Debug)]
pub struct ReconnectBackoff {
    /// The delay used as the unit of growth.
    delay_base: Duration,
    /// The maximum delay to cap the backoff.
    delay_max: Duration,
    /// The growth strategy.
    strategy: BackoffStrategy,
    /// The maximum random jitter to add (in milliseconds).
    jitter_ms: u64,
    /// Retries allowed before the backoff reports exhaustion.
    max_attempts: u32,
    /// Retries requested since the last reset.
    attempt: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::linear(DEFAULT_DELAY_BASE, DEFAULT_DELAY_MAX, DEFAULT_MAX_ATTEMPTS)
    }
}

/// A bounded reconnect backoff.
///
/// Each call to [`ReconnectBackoff::next_duration`] counts one retry and returns the wait that
/// should precede it, or `None` once the retry budget is spent. A successful connection should
/// call [`ReconnectBackoff::reset`] so the next outage starts from the base delay again.
impl ReconnectBackoff {
    /// Creates a new [`ReconnectBackoff`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `delay_base` is zero.
    /// - `delay_max` is less than `delay_base`.
    /// - An exponential `factor` is not finite or is less than 1.0.
    pub fn new(
        delay_base: Duration,
        delay_max: Duration,
        strategy: BackoffStrategy,
        jitter_ms: u64,
        max_attempts: u32,
    ) -> anyhow::Result<Self> {
        if delay_base.is_zero() {
            anyhow::bail!("delay_base must be positive");
        }
        if delay_max < delay_base {
            anyhow::bail!("delay_max ({delay_max:?}) must be >= delay_base ({delay_base:?})");
        }
        if let BackoffStrategy::Exponential { factor } = strategy
            && (!factor.is_finite() || factor < 1.0)
        {
            anyhow::bail!("factor must be a finite value >= 1.0, was {factor}");
        }

        Ok(Self {
            delay_base,
            delay_max,
            strategy,
            jitter_ms,
            max_attempts,
            attempt: 0,
        })
    }

    /// Creates a linear backoff without jitter.
    #[must_use]
    pub const fn linear(delay_base: Duration, delay_max: Duration, max_attempts: u32) -> Self {
        Self {
            delay_base,
            delay_max,
            strategy: BackoffStrategy::Linear,
            jitter_ms: 0,
            max_attempts,
            attempt: 0,
        }
    }

    /// Counts one retry and returns the delay that should precede it.
    ///
    /// Returns `None` once the retry count exceeds `max_attempts`; the count keeps its value so
    /// [`ReconnectBackoff::is_exhausted`] stays true until [`ReconnectBackoff::reset`].
    pub fn next_duration(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt > self.max_attempts {
            return None;
        }

        let delay = self.delay_for(self.attempt);
        if self.jitter_ms == 0 {
            return Some(delay);
        }

        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        Some(delay + Duration::from_millis(jitter))
    }

    /// Returns the capped delay for retry number `attempt`, without jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Linear => self.delay_base.saturating_mul(attempt),
            BackoffStrategy::Exponential { factor } => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let nanos = self.delay_base.as_nanos() as f64 * factor.powi(exponent);
                if nanos >= self.delay_max.as_nanos() as f64 {
                    self.delay_max
                } else {
                    Duration::from_nanos(nanos as u64)
                }
            }
        };

        std::cmp::min(delay, self.delay_max)
    }

    /// Reset the retry count so the next delay starts from the base again.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Returns the number of retries counted since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if the retry budget has been spent.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempt > self.max_attempts
    }
}
