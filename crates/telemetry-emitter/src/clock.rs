// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Time sources for the emission loop.
//!
//! The loop never reads the system clock or sleeps directly; it goes through
//! [`Clock`] and [`Sleeper`] so a day can be simulated in a test.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Monotonic time, used for budget windows.
    fn now(&self) -> Instant;

    /// Wall clock time, stamped on generated records.
    fn wall_time(&self) -> DateTime<Utc>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl Sleeper for SystemClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated time. Sleeping returns immediately after advancing the clock by
/// the requested duration, which is also recorded.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(wall_origin: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    #[allow(clippy::expect_used)]
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().expect("lock poisoned");
        *elapsed += duration;
    }

    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("lock poisoned")
    }

    /// Every duration passed to [`Sleeper::sleep`] so far.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("lock poisoned").clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn wall_time(&self) -> DateTime<Utc> {
        // A simulated run never gets anywhere near chrono's range limits.
        self.wall_origin
            + chrono::Duration::from_std(self.elapsed()).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

#[async_trait]
impl Sleeper for ManualClock {
    #[allow(clippy::expect_used)]
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("lock poisoned").push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let wall = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(wall);
        let start = clock.now();

        clock.sleep(Duration::from_secs(90)).await;
        clock.advance(Duration::from_secs(10));

        assert_eq!(clock.now() - start, Duration::from_secs(100));
        assert_eq!(clock.wall_time(), wall + chrono::Duration::seconds(100));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(90)]);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
