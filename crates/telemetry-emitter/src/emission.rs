// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The control loop of one telemetry stream.
//!
//! Every iteration checks whether the budget window has run out, assembles a
//! batch, asks the budget whether it fits and then either sends it or waits
//! for the next window. Nothing that happens during an iteration stops the
//! loop; only cancellation does.

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::BatchAssembler;
use crate::budget::{Admission, BudgetTracker};
use crate::clock::{Clock, Sleeper, SystemClock};
use crate::config::StreamConfig;
use crate::constants::{FALLBACK_SLEEP, MIB, SERIALIZATION_BACKOFF, WINDOW_RESET_BUFFER};
use crate::generator::{build_generator, RecordGenerator};
use crate::pacing::{duration_from_secs, PacingConfig, PacingScheduler};
use crate::transport::{HttpTransport, SendOutcome, Transport};

/// What a single iteration did, and how long to sleep before the next one.
#[derive(Debug)]
pub enum Step {
    /// The batch was handed to the transport and charged to the budget.
    Sent {
        records: usize,
        bytes: usize,
        outcome: SendOutcome,
        delay: Duration,
    },
    /// The batch did not fit; it is dropped and the window is reset after
    /// `delay`.
    WaitForWindow { bytes: usize, delay: Duration },
    /// The window ended while the batch was being assembled; the batch is
    /// dropped and a fresh window starts right away.
    WindowRolled,
    /// The batch could not be encoded.
    Skipped { delay: Duration },
    /// The batch alone is larger than the daily target. Waiting for the next
    /// window would never let it through, so it is dropped and pacing resumes.
    Oversized { bytes: usize, delay: Duration },
}

impl Step {
    #[must_use]
    pub fn delay(&self) -> Duration {
        match self {
            Step::Sent { delay, .. }
            | Step::WaitForWindow { delay, .. }
            | Step::Skipped { delay }
            | Step::Oversized { delay, .. } => *delay,
            Step::WindowRolled => Duration::ZERO,
        }
    }
}

pub struct EmissionLoopConfig {
    pub generator: Box<dyn RecordGenerator>,
    pub assembler: BatchAssembler,
    pub target_bytes_per_day: u64,
    pub pacing: PacingConfig,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
    pub sleeper: Arc<dyn Sleeper>,
    pub rng: StdRng,
}

pub struct EmissionLoop {
    generator: Box<dyn RecordGenerator>,
    assembler: BatchAssembler,
    budget: BudgetTracker,
    pacing: PacingScheduler,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    rng: StdRng,
}

impl EmissionLoop {
    /// The first budget window starts now.
    #[must_use]
    pub fn new(config: EmissionLoopConfig) -> Self {
        let budget = BudgetTracker::new(config.target_bytes_per_day, config.clock.now());
        Self {
            generator: config.generator,
            assembler: config.assembler,
            budget,
            pacing: PacingScheduler::new(config.pacing),
            transport: config.transport,
            clock: config.clock,
            sleeper: config.sleeper,
            rng: config.rng,
        }
    }

    #[must_use]
    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Runs one iteration up to, but not including, its sleep.
    pub async fn step(&mut self) -> Step {
        let now = self.clock.now();
        if self.budget.reset_if_window_elapsed(now) {
            info!("Starting a new budget window");
        }

        let batch = match self.assembler.assemble(
            self.generator.as_ref(),
            &mut self.rng,
            self.clock.wall_time(),
        ) {
            Ok(batch) => batch,
            Err(e) => {
                let delay = SERIALIZATION_BACKOFF.min(self.min_wait());
                error!("Skipping batch that could not be encoded: {e}");
                return Step::Skipped { delay };
            }
        };
        let bytes = batch.byte_size();
        let target = self.budget.target_bytes_per_day();

        if bytes as u64 > target {
            let delay = self.pacing.next_delay(&mut self.rng);
            warn!(
                "Dropping batch of {} bytes, larger than the daily target of {} bytes",
                bytes, target
            );
            return Step::Oversized { bytes, delay };
        }

        let admitted_at = self.clock.now();
        match self.budget.accept(bytes as u64, admitted_at) {
            Admission::Allowed => {}
            Admission::WouldExceed { remaining } if remaining.is_zero() => {
                self.budget.force_reset(admitted_at);
                info!("Budget window ended, starting a new one");
                return Step::WindowRolled;
            }
            Admission::WouldExceed { remaining } => {
                let delay = remaining + WINDOW_RESET_BUFFER;
                info!(
                    "Daily limit reached ({:.2} MB sent), waiting {}s for the next window",
                    self.budget.bytes_sent_in_window() as f64 / MIB as f64,
                    delay.as_secs()
                );
                return Step::WaitForWindow { bytes, delay };
            }
        }

        let records = batch.records().len();
        let outcome = self.transport.send(&batch).await;
        self.budget.record(bytes as u64);

        let status = outcome
            .status()
            .map_or_else(|| "unreachable".to_string(), |s| s.as_u16().to_string());
        info!(
            "Sent {} records ({} bytes), status {}, {:.1} KB sent in window",
            records,
            bytes,
            status,
            self.budget.bytes_sent_in_window() as f64 / 1024.0
        );

        let delay = self.pacing.next_delay(&mut self.rng);
        debug!("Next batch in {:.1}s", delay.as_secs_f64());
        Step::Sent {
            records,
            bytes,
            outcome,
            delay,
        }
    }

    /// One full iteration: [`EmissionLoop::step`], its sleep, and the window
    /// reset that follows a wait for the next window.
    pub async fn tick(&mut self) -> Step {
        let step = self.step().await;
        let delay = step.delay();
        if !delay.is_zero() {
            self.sleeper.sleep(delay).await;
        }
        if let Step::WaitForWindow { .. } = step {
            self.budget.force_reset(self.clock.now());
            info!("Starting a new budget window");
        }
        step
    }

    /// Loops until `cancel` fires. A panicking iteration is logged and
    /// followed by a fallback sleep; budget state carries over.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.log_startup();

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = AssertUnwindSafe(self.tick()).catch_unwind() => result,
            };

            if let Err(panic) = result {
                error!(
                    "Emission iteration failed: {}, retrying in {}s",
                    panic_message(panic.as_ref()),
                    FALLBACK_SLEEP.as_secs()
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = self.sleeper.sleep(FALLBACK_SLEEP) => {}
                }
            }
        }

        info!("Emission stopped");
    }

    fn log_startup(&self) {
        let pacing = self.pacing.config();
        info!(
            "Emitting {} records, target {:.2} MB/day ({:.1} batches/day)",
            self.generator.domain(),
            self.budget.target_bytes_per_day() as f64 / MIB as f64,
            pacing.target_batches_per_day
        );
        info!(
            "Average wait {:.1}s, jitter range {:.1}s to {:.1}s",
            pacing.average_wait_secs, pacing.lower_secs, pacing.upper_secs
        );
    }

    fn min_wait(&self) -> Duration {
        duration_from_secs(self.pacing.config().min_wait_secs)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Wires a production loop for `stream`: system clock, HTTP transport over
/// the shared `client`, and a random source seeded with `seed` when given.
#[must_use]
pub fn build_emission_loop(
    stream: &StreamConfig,
    client: reqwest::Client,
    seed: Option<u64>,
) -> EmissionLoop {
    let clock = Arc::new(SystemClock);
    let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let transport = HttpTransport::new(client, stream.url.clone(), &stream.auth());
    debug!("{} stream posting to {}", stream.domain, transport.url());

    EmissionLoop::new(EmissionLoopConfig {
        generator: build_generator(
            stream.domain,
            &stream.application_name,
            &stream.subsystem_name,
        ),
        assembler: BatchAssembler::new(stream.envelope_metadata(), stream.batch_size_range()),
        target_bytes_per_day: stream.target_bytes_per_day,
        pacing: stream.pacing_config(),
        transport: Arc::new(transport),
        clock: clock.clone(),
        sleeper: clock,
        rng,
    })
}
