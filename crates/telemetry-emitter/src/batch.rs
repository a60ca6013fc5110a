// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch assembly with exact byte accounting.

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use serde::Serialize;
use std::ops::RangeInclusive;

use crate::error::SerializationError;
use crate::generator::RecordGenerator;
use crate::record::{Domain, LogEntry, MetricSample, Record};

/// Identifies the sender inside every payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeMetadata {
    /// Only embedded in the logs envelope; metrics authenticate with a header.
    pub private_key: String,
    pub application_name: String,
    pub subsystem_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogsEnvelope<'a> {
    private_key: &'a str,
    application_name: &'a str,
    subsystem_name: &'a str,
    log_entries: Vec<LogEntry>,
}

#[derive(Serialize)]
struct MetricsEnvelope<'a> {
    application: &'a str,
    subsystem: &'a str,
    metrics: Vec<&'a MetricSample>,
}

/// Records plus the exact payload that will be sent for them.
///
/// Consumed once by the transport and then dropped.
#[derive(Clone, Debug)]
pub struct Batch {
    domain: Domain,
    records: Vec<Record>,
    payload: String,
}

impl Batch {
    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Length of the UTF-8 encoded payload.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Clone, Debug)]
pub struct BatchAssembler {
    metadata: EnvelopeMetadata,
    count_range: RangeInclusive<usize>,
}

impl BatchAssembler {
    #[must_use]
    pub fn new(metadata: EnvelopeMetadata, count_range: RangeInclusive<usize>) -> Self {
        Self {
            metadata,
            count_range,
        }
    }

    /// Pulls a uniformly chosen number of records from `generator` and encodes
    /// them into the envelope matching the generator's domain.
    pub fn assemble(
        &self,
        generator: &dyn RecordGenerator,
        rng: &mut dyn RngCore,
        now: DateTime<Utc>,
    ) -> Result<Batch, SerializationError> {
        let count = if self.count_range.is_empty() {
            *self.count_range.start()
        } else {
            rng.gen_range(self.count_range.clone())
        };
        let records = (0..count)
            .map(|_| generator.next_record(rng, now))
            .collect::<Vec<_>>();
        self.encode(generator.domain(), records)
    }

    /// Encodes already generated records.
    pub fn encode(&self, domain: Domain, records: Vec<Record>) -> Result<Batch, SerializationError> {
        let payload = match domain {
            Domain::Audit | Domain::Logs => {
                let log_entries = records
                    .iter()
                    .map(|record| match record {
                        Record::AuditEvent(event) => event.to_log_entry(),
                        Record::LogLine(line) => Ok(line.to_log_entry()),
                        Record::MetricSample(_) => Err(SerializationError::EnvelopeMismatch {
                            record: Domain::Metrics,
                            envelope: domain,
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                serde_json::to_string(&LogsEnvelope {
                    private_key: &self.metadata.private_key,
                    application_name: &self.metadata.application_name,
                    subsystem_name: &self.metadata.subsystem_name,
                    log_entries,
                })?
            }
            Domain::Metrics => {
                let metrics = records
                    .iter()
                    .map(|record| match record {
                        Record::MetricSample(sample) => Ok(sample),
                        other => Err(SerializationError::EnvelopeMismatch {
                            record: other.domain(),
                            envelope: Domain::Metrics,
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                serde_json::to_string(&MetricsEnvelope {
                    application: &self.metadata.application_name,
                    subsystem: &self.metadata.subsystem_name,
                    metrics,
                })?
            }
        };

        Ok(Batch {
            domain,
            records,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{build_generator, LogLineGenerator, LogPools};
    use crate::record::{LogLine, Severity};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn assembler(range: RangeInclusive<usize>) -> BatchAssembler {
        BatchAssembler::new(
            EnvelopeMetadata {
                private_key: "private-key".to_string(),
                application_name: "demo-app".to_string(),
                subsystem_name: "demo-subsystem".to_string(),
            },
            range,
        )
    }

    fn log_line(message: &str) -> Record {
        Record::LogLine(LogLine {
            timestamp: now(),
            message: message.to_string(),
            severity: Severity::Info,
            trace_id: "0".repeat(32),
            span_id: "1".repeat(16),
            application: "démo".to_string(),
            subsystem: "子系统".to_string(),
        })
    }

    #[test]
    fn test_record_count_within_range() {
        let assembler = assembler(3..=15);
        let mut rng = StdRng::seed_from_u64(5);
        for domain in Domain::ALL {
            let generator = build_generator(domain, "app", "sub");
            for _ in 0..50 {
                let batch = assembler.assemble(generator.as_ref(), &mut rng, now()).unwrap();
                assert!((3..=15).contains(&batch.records().len()));
                assert_eq!(batch.domain(), domain);
            }
        }
    }

    #[test]
    fn test_logs_envelope_shape() {
        let assembler = assembler(2..=2);
        let generator = LogLineGenerator::new(LogPools::default(), "demo-app", "demo-subsystem");
        let mut rng = StdRng::seed_from_u64(9);
        let batch = assembler.assemble(&generator, &mut rng, now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(batch.payload()).unwrap();
        assert_eq!(json["privateKey"], "private-key");
        assert_eq!(json["applicationName"], "demo-app");
        assert_eq!(json["subsystemName"], "demo-subsystem");
        assert_eq!(json["logEntries"].as_array().unwrap().len(), 2);
        let severity = json["logEntries"][0]["severity"].as_u64().unwrap();
        assert!((1..=6).contains(&severity));
    }

    #[test]
    fn test_metrics_envelope_shape() {
        let assembler = assembler(4..=4);
        let generator = build_generator(Domain::Metrics, "k8s-infra-metrics", "production");
        let mut rng = StdRng::seed_from_u64(9);
        let batch = assembler.assemble(generator.as_ref(), &mut rng, now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(batch.payload()).unwrap();
        assert_eq!(json["application"], "demo-app");
        assert_eq!(json["subsystem"], "demo-subsystem");
        assert!(json.get("privateKey").is_none());
        let metrics = json["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0]["timestamp"], now().timestamp_millis());
    }

    #[test]
    fn test_byte_size_counts_multibyte_characters() {
        let batch = assembler(1..=1)
            .encode(Domain::Logs, vec![log_line("naïve café ✓ 日本語 🚀")])
            .unwrap();
        assert_eq!(batch.byte_size(), batch.payload().as_bytes().len());
        assert!(batch.byte_size() > batch.payload().chars().count());
    }

    #[test]
    fn test_non_finite_metric_fails() {
        let sample = Record::MetricSample(MetricSample {
            name: "cpu_usage".to_string(),
            value: f64::NAN,
            timestamp: 0,
            labels: BTreeMap::new(),
        });
        let result = assembler(1..=1).encode(Domain::Metrics, vec![sample]);
        assert!(matches!(result, Err(SerializationError::Json(_))));
    }

    #[test]
    fn test_mismatched_record_fails() {
        let result = assembler(1..=1).encode(Domain::Metrics, vec![log_line("hello")]);
        assert!(matches!(
            result,
            Err(SerializationError::EnvelopeMismatch {
                record: Domain::Logs,
                envelope: Domain::Metrics
            })
        ));
    }

    proptest! {
        #[test]
        fn byte_size_is_exact_utf8_length(messages in proptest::collection::vec(any::<String>(), 1..12)) {
            let records = messages.iter().map(|m| log_line(m)).collect();
            let batch = assembler(1..=1).encode(Domain::Logs, records).unwrap();
            let reencoded = serde_json::to_vec(&serde_json::from_str::<serde_json::Value>(batch.payload()).unwrap()).unwrap();
            prop_assert_eq!(batch.byte_size(), batch.payload().as_bytes().len());
            prop_assert_eq!(batch.byte_size(), reencoded.len());
        }
    }
}
