// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rolling daily byte budget.
//!
//! The tracker only answers whether a candidate batch still fits in the
//! current 24 hour window. Because the answer is given before sending and the
//! charge is applied after, the recorded total may overshoot the target by at
//! most one batch.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::SECONDS_PER_DAY;

pub const BUDGET_WINDOW: Duration = Duration::from_secs(SECONDS_PER_DAY);

/// Answer of [`BudgetTracker::accept`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// `remaining` is the time left until the current window ends.
    WouldExceed { remaining: Duration },
}

#[derive(Clone, Debug)]
pub struct BudgetTracker {
    target_bytes_per_day: u64,
    bytes_sent_in_window: u64,
    window_start: Instant,
}

impl BudgetTracker {
    #[must_use]
    pub fn new(target_bytes_per_day: u64, now: Instant) -> Self {
        Self {
            target_bytes_per_day,
            bytes_sent_in_window: 0,
            window_start: now,
        }
    }

    #[must_use]
    pub fn target_bytes_per_day(&self) -> u64 {
        self.target_bytes_per_day
    }

    #[must_use]
    pub fn bytes_sent_in_window(&self) -> u64 {
        self.bytes_sent_in_window
    }

    #[must_use]
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    pub fn accept(&self, candidate_bytes: u64, now: Instant) -> Admission {
        if self.bytes_sent_in_window.saturating_add(candidate_bytes) <= self.target_bytes_per_day {
            return Admission::Allowed;
        }
        let elapsed = now.saturating_duration_since(self.window_start);
        Admission::WouldExceed {
            remaining: BUDGET_WINDOW.saturating_sub(elapsed),
        }
    }

    /// Charges an attempted send, whatever its outcome.
    pub fn record(&mut self, bytes: u64) {
        self.bytes_sent_in_window = self.bytes_sent_in_window.saturating_add(bytes);
    }

    /// Starts a new window when the current one has run its course. Returns
    /// whether a reset happened; repeated calls at the same instant reset once.
    pub fn reset_if_window_elapsed(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= BUDGET_WINDOW {
            self.force_reset(now);
            true
        } else {
            false
        }
    }

    pub fn force_reset(&mut self, now: Instant) {
        debug!(
            "Resetting budget window after {} bytes",
            self.bytes_sent_in_window
        );
        self.bytes_sent_in_window = 0;
        self.window_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TARGET: u64 = 1_572_864;

    #[test]
    fn test_allowed_up_to_target() {
        let start = Instant::now();
        let mut tracker = BudgetTracker::new(TARGET, start);
        tracker.record(TARGET - 100);
        assert_eq!(tracker.accept(100, start), Admission::Allowed);
        assert_eq!(
            tracker.accept(101, start + Duration::from_secs(3600)),
            Admission::WouldExceed {
                remaining: Duration::from_secs(SECONDS_PER_DAY - 3600)
            }
        );
    }

    #[test]
    fn test_remaining_never_negative() {
        let start = Instant::now();
        let mut tracker = BudgetTracker::new(10, start);
        tracker.record(10);
        assert_eq!(
            tracker.accept(1, start + BUDGET_WINDOW + Duration::from_secs(30)),
            Admission::WouldExceed {
                remaining: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_record_charges_even_past_target() {
        let start = Instant::now();
        let mut tracker = BudgetTracker::new(1000, start);
        tracker.record(900);
        tracker.record(300);
        assert_eq!(tracker.bytes_sent_in_window(), 1200);
    }

    #[test]
    fn test_one_reset_per_elapsed_day() {
        let start = Instant::now();
        let mut tracker = BudgetTracker::new(TARGET, start);
        let mut resets = 0;
        // Step through three days in ten minute increments.
        for step in 1..=(3 * 144) {
            let now = start + Duration::from_secs(600 * step);
            tracker.record(10);
            if tracker.reset_if_window_elapsed(now) {
                resets += 1;
            }
        }
        assert_eq!(resets, 3);
    }

    #[test]
    fn test_reset_is_idempotent_within_overshoot() {
        let start = Instant::now();
        let mut tracker = BudgetTracker::new(TARGET, start);
        tracker.record(5000);
        let later = start + BUDGET_WINDOW + Duration::from_secs(42);
        assert!(tracker.reset_if_window_elapsed(later));
        assert_eq!(tracker.bytes_sent_in_window(), 0);
        assert_eq!(tracker.window_start(), later);

        tracker.record(10);
        assert!(!tracker.reset_if_window_elapsed(later));
        assert!(!tracker.reset_if_window_elapsed(later + Duration::from_secs(1)));
        assert_eq!(tracker.bytes_sent_in_window(), 10);
    }

    proptest! {
        #[test]
        fn accept_allows_whatever_fits(target in 0u64..10_000_000, sent_ratio in 0.0f64..=1.0, offset in 0u64..SECONDS_PER_DAY) {
            let start = Instant::now();
            let mut tracker = BudgetTracker::new(target, start);
            let sent = (target as f64 * sent_ratio) as u64;
            tracker.record(sent);
            let candidate = target - sent;
            prop_assert_eq!(tracker.accept(candidate, start + Duration::from_secs(offset)), Admission::Allowed);
        }

        #[test]
        fn accept_reports_time_left_when_over(sent in 0u64..1_000_000, extra in 1u64..1_000_000, offset in 0u64..SECONDS_PER_DAY) {
            let start = Instant::now();
            let mut tracker = BudgetTracker::new(1_000_000, start);
            tracker.record(sent);
            let candidate = 1_000_000 - sent + extra;
            let admission = tracker.accept(candidate, start + Duration::from_secs(offset));
            prop_assert_eq!(admission, Admission::WouldExceed {
                remaining: Duration::from_secs(SECONDS_PER_DAY - offset)
            });
        }
    }
}
