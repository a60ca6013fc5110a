// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, str::FromStr};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use telemetry_emitter::{
    config::EmitterConfig, emission::build_emission_loop, error::EmitterError, http::get_client,
    log_level::LogLevel, logger::Formatter,
};

#[tokio::main]
pub async fn main() {
    // Read ahead of the full configuration so its warnings are not lost.
    let log_level = env::var("EMITTER_LOG_LEVEL")
        .ok()
        .and_then(|val| LogLevel::from_str(&val).ok())
        .unwrap_or_default();

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level.filter_directive())
                .expect("could not parse log level in configuration"),
        )
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    if let Err(e) = run().await {
        error!("{e}. Shutting down telemetry emitter.");
    }
}

async fn run() -> Result<(), EmitterError> {
    let config = EmitterConfig::from_env()?;

    let client = get_client(&config.http_settings());
    let cancel = CancellationToken::new();

    let mut handles = Vec::with_capacity(config.streams.len());
    for (index, stream) in config.streams.iter().enumerate() {
        let emission = build_emission_loop(stream, client.clone(), config.stream_seed(index));
        let span = info_span!("stream", domain = %stream.domain);
        handles.push(tokio::spawn(emission.run(cancel.clone()).instrument(span)));
    }
    info!(
        "Telemetry emitter started with {} stream(s){}",
        handles.len(),
        config
            .seed
            .map_or_else(String::new, |seed| format!(", seed {seed}"))
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, stopping streams");
            cancel.cancel();
        }
        Err(e) => error!("Unable to listen for shutdown signal: {e}"),
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Stream task ended abnormally: {e}");
        }
    }
    Ok(())
}
