// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Length of a budget window.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Extra time slept past the end of a window before forcing a reset.
pub const WINDOW_RESET_BUFFER: Duration = Duration::from_secs(5);

/// Upper bound for the pause after a batch could not be encoded.
pub const SERIALIZATION_BACKOFF: Duration = Duration::from_secs(5);

/// Pause after an iteration failed in an unexpected way.
pub const FALLBACK_SLEEP: Duration = Duration::from_secs(60);

pub const DEFAULT_MIN_WAIT_SECONDS: f64 = 10.0;
pub const DEFAULT_BURST_PROBABILITY: f64 = 0.1;
pub const DEFAULT_BURST_MIN_MULTIPLIER: f64 = 0.2;
pub const DEFAULT_BURST_MAX_MULTIPLIER: f64 = 3.0;

/// Fraction of the average wait used as jitter on either side of it.
pub const JITTER_RATIO: f64 = 0.5;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const LOGS_INGRESS_URL: &str = "https://ingress.cx498.coralogix.com/api/v1/logs";
pub const METRICS_INGRESS_URL: &str = "https://ng-api-http.cx498.coralogix.com/metrics";

pub const MIB: u64 = 1024 * 1024;
