// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synthetic telemetry emitter.
//!
//! Fabricates audit events, log lines and metric samples and ships them to an
//! ingestion endpoint at a jittered rate, keeping the volume sent in every
//! 24 hour window under a configured byte budget.
//!
//! The moving parts, leaf first:
//! - [`generator`]: one synthetic [`record::Record`] per call
//! - [`batch`]: batch assembly with exact byte accounting
//! - [`budget`]: the rolling daily byte budget
//! - [`pacing`]: jittered, occasionally bursty inter-batch delays
//! - [`transport`]: a single HTTP POST per batch, never retried
//! - [`emission`]: the control loop tying everything together

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod budget;
pub mod clock;
pub mod config;
pub mod constants;
pub mod emission;
pub mod error;
pub mod generator;
pub mod http;
pub mod log_level;
pub mod logger;
pub mod pacing;
pub mod record;
pub mod transport;
