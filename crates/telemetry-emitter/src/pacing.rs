// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Inter-batch delays.
//!
//! The average wait is chosen so that, at the estimated record size and the
//! average batch size, the daily target is reached in roughly one day:
//!
//! ```text
//! batches_per_day = (target_bytes_per_day / estimated_record_size) / records_per_batch
//! average_wait    = SECONDS_PER_DAY / batches_per_day
//! ```
//!
//! Each delay is drawn uniformly from `average ± 50%` (never below the
//! minimum wait) and, once in a while, stretched or squeezed to mimic bursts
//! and lulls.

use rand::{Rng, RngCore};
use std::time::Duration;

use crate::constants::{
    DEFAULT_BURST_MAX_MULTIPLIER, DEFAULT_BURST_MIN_MULTIPLIER, DEFAULT_BURST_PROBABILITY,
    JITTER_RATIO, SECONDS_PER_DAY,
};

/// Longest wait a [`Duration`] can hold, in seconds.
const MAX_WAIT_SECS: f64 = u64::MAX as f64;

/// Converts seconds to a [`Duration`], saturating instead of panicking on
/// values out of range.
pub(crate) fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstSettings {
    /// Chance that a delay gets scaled, in `[0, 1]`.
    pub probability: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            probability: DEFAULT_BURST_PROBABILITY,
            min_multiplier: DEFAULT_BURST_MIN_MULTIPLIER,
            max_multiplier: DEFAULT_BURST_MAX_MULTIPLIER,
        }
    }
}

impl BurstSettings {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            ..Self::default()
        }
    }
}

/// Derived once at startup, immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingConfig {
    pub target_batches_per_day: f64,
    pub average_wait_secs: f64,
    pub min_wait_secs: f64,
    pub jitter_secs: f64,
    pub lower_secs: f64,
    pub upper_secs: f64,
    pub burst: BurstSettings,
}

impl PacingConfig {
    #[must_use]
    pub fn derive(
        target_bytes_per_day: u64,
        estimated_avg_record_size: f64,
        avg_records_per_batch: f64,
        min_wait_secs: f64,
        burst: BurstSettings,
    ) -> Self {
        let seconds_per_day = SECONDS_PER_DAY as f64;
        let min_wait_secs = min_wait_secs.max(0.0).min(MAX_WAIT_SECS);
        let target_records_per_day = target_bytes_per_day as f64 / estimated_avg_record_size;
        let target_batches_per_day = target_records_per_day / avg_records_per_batch;

        let average = if target_batches_per_day.is_finite() && target_batches_per_day > 0.0 {
            seconds_per_day / target_batches_per_day
        } else {
            seconds_per_day
        };
        let average = average.min(MAX_WAIT_SECS).max(min_wait_secs);
        let jitter = average * JITTER_RATIO;
        let lower = min_wait_secs.max(average - jitter);
        let upper = (average + jitter).max(lower);

        Self {
            target_batches_per_day,
            average_wait_secs: average,
            min_wait_secs,
            jitter_secs: jitter,
            lower_secs: lower,
            upper_secs: upper,
            burst,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PacingScheduler {
    config: PacingConfig,
}

impl PacingScheduler {
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Draws the delay before the next batch. Always at least the minimum wait.
    pub fn next_delay(&self, rng: &mut dyn RngCore) -> Duration {
        let config = &self.config;
        let mut secs = rng.gen_range(config.lower_secs..=config.upper_secs);

        let burst = &config.burst;
        if burst.probability > 0.0 && rng.gen_bool(burst.probability.min(1.0)) {
            secs *= rng.gen_range(burst.min_multiplier..=burst.max_multiplier);
        }

        duration_from_secs(secs.max(config.min_wait_secs))
    }
}
