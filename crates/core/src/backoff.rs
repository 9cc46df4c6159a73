// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation exponential backoff.
//!
//! `delay(n) = min(max, base * 2^n + jitter)` where `n` is the number of
//! attempts already made and `jitter` is drawn uniformly from
//! `[0, jitter_ratio * base * 2^n)`. With `jitter_ratio < 1` consecutive
//! delays strictly increase until they reach `max`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Exponential backoff with jitter and a cap.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Fraction of the exponential delay added as random jitter, in `[0, 1)`.
    pub jitter_ratio: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300),
            jitter_ratio: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration, jitter_ratio: f64) -> Self {
        BackoffPolicy {
            base,
            max,
            jitter_ratio,
        }
    }

    /// Returns the delay before the next attempt, given `attempts` made so far.
    pub fn delay(&self, attempts: u32) -> Duration {
        self.delay_with(attempts, rand::thread_rng().gen::<f64>())
    }

    /// Deterministic variant of [`delay`](Self::delay): `unit` in `[0, 1)`
    /// selects the jitter fraction.
    pub fn delay_with(&self, attempts: u32, unit: f64) -> Duration {
        let exponential = self
            .base
            .saturating_mul(2u32.saturating_pow(attempts.min(31)));
        if exponential >= self.max {
            return self.max;
        }

        let ratio = self.jitter_ratio.clamp(0.0, 0.999) * unit.clamp(0.0, 1.0);
        if !ratio.is_finite() {
            return exponential;
        }
        let jitter = exponential.mul_f64(ratio);
        exponential.saturating_add(jitter).min(self.max)
    }

    /// Returns the instant before which the operation must not be retried.
    pub fn next_eligible_at(&self, now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
        let delay =
            chrono::Duration::from_std(self.delay(attempts)).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
