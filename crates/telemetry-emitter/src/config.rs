// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Emitter configuration.
//!
//! Built once from the environment at process start, validated, then shared
//! read-only with every stream. Unparsable values are logged and replaced by
//! their defaults; values that parse but make no sense fail validation.
//!
//! Global variables: `EMITTER_STREAMS`, `EMITTER_LOG_LEVEL`, `EMITTER_SEED`,
//! `EMITTER_REQUEST_TIMEOUT_SECS`, `EMITTER_PROXY_HTTPS` (or `HTTPS_PROXY`).
//!
//! Per stream, prefixed with `EMITTER_AUDIT_`, `EMITTER_LOGS_` or
//! `EMITTER_METRICS_`: `URL`, `PRIVATE_KEY`, `APPLICATION_NAME`,
//! `SUBSYSTEM_NAME`, `TARGET_BYTES_PER_DAY`, `ESTIMATED_AVG_RECORD_SIZE`,
//! `MIN_BATCH_SIZE`, `MAX_BATCH_SIZE`, `AVG_RECORDS_PER_BATCH`,
//! `MIN_WAIT_SECONDS`, `BURST_PROBABILITY`, `BURST_MIN_MULTIPLIER`,
//! `BURST_MAX_MULTIPLIER`.

use std::collections::BTreeSet;
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::batch::EnvelopeMetadata;
use crate::constants::{
    DEFAULT_MIN_WAIT_SECONDS, DEFAULT_REQUEST_TIMEOUT_SECS, LOGS_INGRESS_URL, METRICS_INGRESS_URL,
    MIB, SECONDS_PER_DAY,
};
use crate::error::ConfigError;
use crate::http::HttpSettings;
use crate::log_level::LogLevel;
use crate::pacing::{BurstSettings, PacingConfig};
use crate::record::Domain;
use crate::transport::Auth;

/// Settings of one independent telemetry stream.
#[derive(Clone, PartialEq)]
pub struct StreamConfig {
    pub domain: Domain,
    pub url: String,
    /// Private key embedded in log payloads, or bearer token for metrics.
    pub credential: String,
    pub application_name: String,
    pub subsystem_name: String,
    pub target_bytes_per_day: u64,
    pub estimated_avg_record_size: f64,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub avg_records_per_batch: f64,
    pub min_wait_secs: f64,
    pub burst: BurstSettings,
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("domain", &self.domain)
            .field("url", &self.url)
            .field("credential", &"<redacted>")
            .field("application_name", &self.application_name)
            .field("subsystem_name", &self.subsystem_name)
            .field("target_bytes_per_day", &self.target_bytes_per_day)
            .field("estimated_avg_record_size", &self.estimated_avg_record_size)
            .field("min_batch_size", &self.min_batch_size)
            .field("max_batch_size", &self.max_batch_size)
            .field("avg_records_per_batch", &self.avg_records_per_batch)
            .field("min_wait_secs", &self.min_wait_secs)
            .field("burst", &self.burst)
            .finish()
    }
}

impl StreamConfig {
    /// Defaults for `domain`; the credential is left empty.
    #[must_use]
    pub fn defaults(domain: Domain) -> Self {
        let base = Self {
            domain,
            url: LOGS_INGRESS_URL.to_string(),
            credential: String::new(),
            application_name: String::new(),
            subsystem_name: String::new(),
            target_bytes_per_day: 3 * MIB / 2,
            estimated_avg_record_size: 500.0,
            min_batch_size: 3,
            max_batch_size: 15,
            avg_records_per_batch: 10.0,
            min_wait_secs: DEFAULT_MIN_WAIT_SECONDS,
            burst: BurstSettings::default(),
        };
        match domain {
            Domain::Audit => Self {
                application_name: "aws-cloudtrail".to_string(),
                subsystem_name: "production".to_string(),
                ..base
            },
            Domain::Logs => Self {
                application_name: "demo-app".to_string(),
                subsystem_name: "demo-subsystem".to_string(),
                target_bytes_per_day: MIB,
                estimated_avg_record_size: 200.0,
                min_batch_size: 5,
                ..base
            },
            Domain::Metrics => Self {
                url: METRICS_INGRESS_URL.to_string(),
                application_name: "k8s-infra-metrics".to_string(),
                subsystem_name: "production".to_string(),
                estimated_avg_record_size: 300.0,
                max_batch_size: 8,
                ..base
            },
        }
    }

    #[must_use]
    pub fn batch_size_range(&self) -> RangeInclusive<usize> {
        self.min_batch_size..=self.max_batch_size
    }

    #[must_use]
    pub fn pacing_config(&self) -> PacingConfig {
        PacingConfig::derive(
            self.target_bytes_per_day,
            self.estimated_avg_record_size,
            self.avg_records_per_batch,
            self.min_wait_secs,
            self.burst,
        )
    }

    #[must_use]
    pub fn envelope_metadata(&self) -> EnvelopeMetadata {
        EnvelopeMetadata {
            private_key: self.credential.clone(),
            application_name: self.application_name.clone(),
            subsystem_name: self.subsystem_name.clone(),
        }
    }

    /// Metrics authenticate with a bearer header; logs carry the key in the body.
    #[must_use]
    pub fn auth(&self) -> Auth {
        match self.domain {
            Domain::Metrics => Auth::Bearer(self.credential.clone()),
            Domain::Audit | Domain::Logs => Auth::None,
        }
    }

    fn from_lookup<F>(domain: Domain, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::defaults(domain);
        let vars = StreamVars {
            lookup,
            prefix: domain.env_prefix(),
        };
        let var = |name: &str| vars.get(name);

        Self {
            domain,
            url: var("URL").unwrap_or(defaults.url),
            credential: var("PRIVATE_KEY").unwrap_or_default(),
            application_name: var("APPLICATION_NAME").unwrap_or(defaults.application_name),
            subsystem_name: var("SUBSYSTEM_NAME").unwrap_or(defaults.subsystem_name),
            target_bytes_per_day: vars.parsed("TARGET_BYTES_PER_DAY", defaults.target_bytes_per_day),
            estimated_avg_record_size: vars.parsed(
                "ESTIMATED_AVG_RECORD_SIZE",
                defaults.estimated_avg_record_size,
            ),
            min_batch_size: vars.parsed("MIN_BATCH_SIZE", defaults.min_batch_size),
            max_batch_size: vars.parsed("MAX_BATCH_SIZE", defaults.max_batch_size),
            avg_records_per_batch: vars
                .parsed("AVG_RECORDS_PER_BATCH", defaults.avg_records_per_batch),
            min_wait_secs: vars.parsed("MIN_WAIT_SECONDS", defaults.min_wait_secs),
            burst: BurstSettings {
                probability: vars.parsed("BURST_PROBABILITY", defaults.burst.probability),
                min_multiplier: vars.parsed("BURST_MIN_MULTIPLIER", defaults.burst.min_multiplier),
                max_multiplier: vars.parsed("BURST_MAX_MULTIPLIER", defaults.burst.max_multiplier),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidConfig(msg));
        let domain = self.domain;

        if self.credential.trim().is_empty() {
            return Err(ConfigError::MissingCredential(domain));
        }
        for (name, value) in [
            ("URL", &self.url),
            ("APPLICATION_NAME", &self.application_name),
            ("SUBSYSTEM_NAME", &self.subsystem_name),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("{}{name} cannot be empty", domain.env_prefix()));
            }
        }
        if self.target_bytes_per_day == 0 {
            return invalid(format!("{domain} target bytes per day must be greater than 0"));
        }
        if !(self.estimated_avg_record_size.is_finite() && self.estimated_avg_record_size > 0.0) {
            return invalid(format!(
                "{domain} estimated record size must be a positive number"
            ));
        }
        if self.min_batch_size == 0 || self.min_batch_size > self.max_batch_size {
            return invalid(format!(
                "{domain} batch size range {}..={} is invalid",
                self.min_batch_size, self.max_batch_size
            ));
        }
        let avg = self.avg_records_per_batch;
        if !(avg.is_finite() && avg > 0.0) {
            return invalid(format!("{domain} average records per batch must be positive"));
        }
        if !(self.min_wait_secs.is_finite()
            && (0.0..=SECONDS_PER_DAY as f64).contains(&self.min_wait_secs))
        {
            return invalid(format!(
                "{domain} minimum wait must be between 0 and {SECONDS_PER_DAY} seconds"
            ));
        }
        let burst = &self.burst;
        if !(0.0..=1.0).contains(&burst.probability) {
            return invalid(format!("{domain} burst probability must be within [0, 1]"));
        }
        if !(burst.min_multiplier.is_finite()
            && burst.max_multiplier.is_finite()
            && burst.min_multiplier > 0.0
            && burst.min_multiplier <= burst.max_multiplier)
        {
            return invalid(format!(
                "{domain} burst multiplier range {}..={} is invalid",
                burst.min_multiplier, burst.max_multiplier
            ));
        }
        Ok(())
    }
}

/// Per-stream variables, looked up under the stream's prefix.
struct StreamVars<'a, F> {
    lookup: &'a F,
    prefix: &'static str,
}

impl<F> StreamVars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{}{name}", self.prefix))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, name: &str, default: T) -> T {
        parse_or(&format!("{}{name}", self.prefix), self.get(name), default)
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match raw {
        None => default,
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {name}='{raw}', using the default");
            default
        }),
    }
}

/// Process-wide settings plus one entry per enabled stream.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterConfig {
    pub streams: Vec<StreamConfig>,
    pub log_level: LogLevel,
    /// Seed for reproducible runs; streams derive their own seed from it.
    pub seed: Option<u64>,
    pub request_timeout: Duration,
    pub https_proxy: Option<String>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            log_level: LogLevel::default(),
            seed: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_proxy: None,
        }
    }
}

impl EmitterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EmitterConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_level = match var("EMITTER_LOG_LEVEL") {
            Some(raw) => LogLevel::from_str(&raw).map_err(ConfigError::InvalidConfig)?,
            None => LogLevel::default(),
        };

        let streams_raw = var("EMITTER_STREAMS").unwrap_or_else(|| Domain::Logs.to_string());
        let mut streams = Vec::new();
        for name in streams_raw.split(',').filter(|s| !s.trim().is_empty()) {
            let domain = Domain::from_str(name).map_err(ConfigError::InvalidConfig)?;
            streams.push(StreamConfig::from_lookup(domain, &lookup));
        }

        let seed = var("EMITTER_SEED").and_then(|raw| {
            let seed = raw.trim().parse::<u64>().ok();
            if seed.is_none() {
                warn!("Ignoring unparsable EMITTER_SEED='{raw}', seeding from entropy");
            }
            seed
        });

        let request_timeout = Duration::from_secs(parse_or(
            "EMITTER_REQUEST_TIMEOUT_SECS",
            var("EMITTER_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));

        let https_proxy = var("EMITTER_PROXY_HTTPS").or_else(|| var("HTTPS_PROXY"));

        let config = Self {
            streams,
            log_level,
            seed,
            request_timeout,
            https_proxy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streams.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "EMITTER_STREAMS must name at least one stream".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for stream in &self.streams {
            if !seen.insert(stream.domain) {
                return Err(ConfigError::InvalidConfig(format!(
                    "stream {} is listed more than once",
                    stream.domain
                )));
            }
            stream.validate()?;
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "EMITTER_REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout: self.request_timeout,
            https_proxy: self.https_proxy.clone(),
        }
    }

    /// Seed of the stream at `index`, if runs are reproducible.
    #[must_use]
    pub fn stream_seed(&self, index: usize) -> Option<u64> {
        self.seed
            .map(|seed| seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}
