// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record generators.
//!
//! Each generator is a pure function of the random source it is handed and
//! its value pools: calls are independent and only consume entropy.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde_json::json;
use std::collections::BTreeMap;

use crate::record::{
    AuditEvent, CloudTrailEvent, Domain, LogLine, MetricSample, Record, SessionContext,
    SessionIssuer, Severity, TlsDetails, UserIdentity,
};

const HEX: &[u8] = b"0123456789abcdef";
const UPPER_ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const DIGITS: &[u8] = b"0123456789";

/// Produces one synthetic record per call.
pub trait RecordGenerator: Send + Sync {
    fn domain(&self) -> Domain;

    fn next_record(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Record;
}

/// Builds the generator variant for `domain`.
#[must_use]
pub fn build_generator(
    domain: Domain,
    application: &str,
    subsystem: &str,
) -> Box<dyn RecordGenerator> {
    match domain {
        Domain::Audit => Box::new(AuditEventGenerator::new(
            AuditPools::default(),
            application,
            subsystem,
        )),
        Domain::Logs => Box::new(LogLineGenerator::new(
            LogPools::default(),
            application,
            subsystem,
        )),
        Domain::Metrics => Box::new(MetricSampleGenerator::new(
            MetricPools::default(),
            application,
            subsystem,
        )),
    }
}

fn pick<'a>(rng: &mut dyn RngCore, pool: &'a [String]) -> &'a str {
    pool.choose(rng).map_or("", String::as_str)
}

fn random_string(rng: &mut dyn RngCore, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}

fn random_uuid(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Value pools for CloudTrail-style audit events.
#[derive(Clone, Debug)]
pub struct AuditPools {
    pub account_id: String,
    pub regions: Vec<String>,
    /// Event names per AWS service.
    pub event_names: BTreeMap<String, Vec<String>>,
    pub user_arns: Vec<String>,
    pub user_agents: Vec<String>,
    pub instance_types: Vec<String>,
    pub error_codes: Vec<String>,
    /// Probability that an event carries response elements instead of an error.
    pub success_rate: f64,
}

impl Default for AuditPools {
    fn default() -> Self {
        let account_id = "123456789012".to_string();
        let event_names = [
            (
                "ec2",
                &[
                    "RunInstances",
                    "StopInstances",
                    "TerminateInstances",
                    "DescribeInstances",
                ][..],
            ),
            (
                "s3",
                &["CreateBucket", "DeleteBucket", "PutObject", "GetObject"][..],
            ),
            (
                "iam",
                &["CreateUser", "DeleteUser", "AttachUserPolicy", "ListUsers"][..],
            ),
            (
                "lambda",
                &["CreateFunction", "InvokeFunction", "DeleteFunction"][..],
            ),
            (
                "rds",
                &[
                    "CreateDBInstance",
                    "DeleteDBInstance",
                    "DescribeDBInstances",
                ][..],
            ),
            (
                "cloudformation",
                &["CreateStack", "DeleteStack", "UpdateStack"][..],
            ),
            (
                "dynamodb",
                &["CreateTable", "DeleteTable", "PutItem", "Query"][..],
            ),
        ]
        .into_iter()
        .map(|(service, names)| (service.to_string(), strings(names)))
        .collect();

        Self {
            user_arns: vec![
                format!("arn:aws:iam::{account_id}:user/admin"),
                format!("arn:aws:iam::{account_id}:user/developer"),
                format!("arn:aws:iam::{account_id}:user/ci-cd"),
                format!("arn:aws:sts::{account_id}:assumed-role/Admin/session"),
            ],
            account_id,
            regions: strings(&["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"]),
            event_names,
            user_agents: strings(&[
                "aws-cli/1.29.29 Python/3.9.11 Darwin/22.6.0 botocore/1.31.29",
                "Boto3/1.28.29 Python/3.10.12 Linux/5.15.0-1042-aws botocore/1.31.29",
                "console.amazonaws.com",
                "CloudFormation",
            ]),
            instance_types: strings(&["t2.micro", "t3.medium", "m5.large"]),
            error_codes: strings(&["AccessDenied", "UnauthorizedOperation", "ThrottlingException"]),
            success_rate: 0.9,
        }
    }
}

pub struct AuditEventGenerator {
    pools: AuditPools,
    services: Vec<String>,
    application: String,
    subsystem: String,
}

impl AuditEventGenerator {
    #[must_use]
    pub fn new(pools: AuditPools, application: &str, subsystem: &str) -> Self {
        let services = pools.event_names.keys().cloned().collect();
        Self {
            pools,
            services,
            application: application.to_string(),
            subsystem: subsystem.to_string(),
        }
    }

    fn source_ip(rng: &mut dyn RngCore) -> String {
        match rng.gen_range(0..4) {
            0 => format!("54.240.197.{}/32", rng.gen_range(1..=255)),
            1 => format!(
                "52.95.{}.{}/32",
                rng.gen_range(0..=255),
                rng.gen_range(0..=255)
            ),
            2 => format!("203.0.113.{}/32", rng.gen_range(1..=254)),
            _ => format!("198.51.100.{}/32", rng.gen_range(1..=254)),
        }
    }

    fn request_parameters(
        &self,
        rng: &mut dyn RngCore,
        service: &str,
        event_name: &str,
    ) -> Option<serde_json::Value> {
        match (service, event_name) {
            ("ec2", "RunInstances") => Some(json!({
                "instancesSet": {
                    "items": [{
                        "imageId": format!("ami-{}", random_string(rng, HEX, 8)),
                        "instanceType": pick(rng, &self.pools.instance_types),
                        "minCount": 1,
                        "maxCount": 1
                    }]
                }
            })),
            ("s3", "CreateBucket") => Some(json!({
                "bucketName": format!("my-bucket-{}", random_string(rng, DIGITS, 12)),
                "x-amz-acl": "private"
            })),
            _ => None,
        }
    }
}

impl RecordGenerator for AuditEventGenerator {
    fn domain(&self) -> Domain {
        Domain::Audit
    }

    fn next_record(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Record {
        let event_id = random_uuid(rng);
        let region = pick(rng, &self.pools.regions).to_string();
        let service = pick(rng, &self.services).to_string();
        let event_name = self
            .pools
            .event_names
            .get(&service)
            .map(|names| pick(rng, names).to_string())
            .unwrap_or_default();
        let user_arn = pick(rng, &self.pools.user_arns).to_string();
        let user_agent = pick(rng, &self.pools.user_agents).to_string();
        let source_ip = Self::source_ip(rng);

        let user_identity = UserIdentity {
            identity_type: if user_arn.contains("user/") {
                "IAMUser"
            } else {
                "AssumedRole"
            }
            .to_string(),
            principal_id: format!("AIDA{}", random_string(rng, UPPER_ALPHANUMERIC, 16)),
            arn: user_arn.clone(),
            account_id: self.pools.account_id.clone(),
            access_key_id: format!("AKIA{}", random_string(rng, UPPER_ALPHANUMERIC, 16)),
            session_context: SessionContext {
                session_issuer: SessionIssuer {
                    issuer_type: if user_arn.contains("assumed-role") {
                        "Role"
                    } else {
                        "IAMUser"
                    }
                    .to_string(),
                    arn: user_arn,
                },
            },
        };

        let request_parameters = self.request_parameters(rng, &service, &event_name);
        let request_id = random_uuid(rng);

        let (response_elements, error_code, error_message) =
            if rng.gen_bool(self.pools.success_rate.clamp(0.0, 1.0)) {
                (Some(json!({"_return": true})), None, None)
            } else {
                (
                    None,
                    Some(pick(rng, &self.pools.error_codes).to_string()),
                    Some("User is not authorized to perform this action".to_string()),
                )
            };

        Record::AuditEvent(AuditEvent {
            event: CloudTrailEvent {
                event_version: "1.08".to_string(),
                user_identity,
                event_time: now.to_rfc3339_opts(SecondsFormat::Micros, true),
                event_source: format!("{service}.amazonaws.com"),
                read_only: ["Describe", "List", "Get"]
                    .iter()
                    .any(|prefix| event_name.starts_with(prefix)),
                event_name,
                source_ip_address: source_ip,
                user_agent,
                request_id,
                event_id,
                resources: Vec::new(),
                event_type: "AwsApiCall".to_string(),
                management_event: true,
                recipient_account_id: self.pools.account_id.clone(),
                event_category: "Management".to_string(),
                tls_details: TlsDetails {
                    tls_version: "TLSv1.2".to_string(),
                    cipher_suite: "ECDHE-RSA-AES128-GCM-SHA256".to_string(),
                    client_provided_host_header: format!("{service}.{region}.amazonaws.com"),
                },
                aws_region: region,
                request_parameters,
                response_elements,
                error_code,
                error_message,
            },
            application: self.application.clone(),
            subsystem: self.subsystem.clone(),
        })
    }
}

/// Value pools for application log lines.
#[derive(Clone, Debug)]
pub struct LogPools {
    pub messages: Vec<String>,
    pub severities: Vec<Severity>,
}

impl Default for LogPools {
    fn default() -> Self {
        Self {
            messages: strings(&[
                "processing request",
                "fetching data from upstream service",
                "database query successful",
                "response sent to client",
                "error encountered in processing",
                "retrying failed operation",
                "user login successful",
                "background task completed",
                "cache refresh initiated",
                "configuration reloaded",
            ]),
            severities: Severity::ALL.to_vec(),
        }
    }
}

pub struct LogLineGenerator {
    pools: LogPools,
    application: String,
    subsystem: String,
}

impl LogLineGenerator {
    #[must_use]
    pub fn new(pools: LogPools, application: &str, subsystem: &str) -> Self {
        Self {
            pools,
            application: application.to_string(),
            subsystem: subsystem.to_string(),
        }
    }
}

impl RecordGenerator for LogLineGenerator {
    fn domain(&self) -> Domain {
        Domain::Logs
    }

    fn next_record(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Record {
        let trace_id = random_string(rng, HEX, 32);
        let span_id = random_string(rng, HEX, 16);
        let severity = self
            .pools
            .severities
            .choose(rng)
            .copied()
            .unwrap_or(Severity::Info);
        let message = pick(rng, &self.pools.messages).to_string();

        Record::LogLine(LogLine {
            timestamp: now,
            message,
            severity,
            trace_id,
            span_id,
            application: self.application.clone(),
            subsystem: self.subsystem.clone(),
        })
    }
}

/// Value pools for infrastructure metric samples.
#[derive(Clone, Debug)]
pub struct MetricPools {
    pub names: Vec<String>,
    pub namespaces: Vec<String>,
    pub pods: Vec<String>,
    pub nodes: Vec<String>,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for MetricPools {
    fn default() -> Self {
        Self {
            names: strings(&["cpu_usage", "memory_usage", "network_bytes", "disk_io"]),
            namespaces: strings(&["default", "kube-system", "monitoring"]),
            pods: strings(&["nginx-123", "redis-456", "app-backend-789"]),
            nodes: strings(&["node-1", "node-2"]),
            min_value: 0.1,
            max_value: 99.9,
        }
    }
}

pub struct MetricSampleGenerator {
    pools: MetricPools,
    application: String,
    subsystem: String,
}

impl MetricSampleGenerator {
    #[must_use]
    pub fn new(pools: MetricPools, application: &str, subsystem: &str) -> Self {
        Self {
            pools,
            application: application.to_string(),
            subsystem: subsystem.to_string(),
        }
    }
}

impl RecordGenerator for MetricSampleGenerator {
    fn domain(&self) -> Domain {
        Domain::Metrics
    }

    fn next_record(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Record {
        let name = pick(rng, &self.pools.names).to_string();
        let raw = rng.gen_range(self.pools.min_value..=self.pools.max_value);
        let labels = BTreeMap::from([
            (
                "namespace".to_string(),
                pick(rng, &self.pools.namespaces).to_string(),
            ),
            ("pod".to_string(), pick(rng, &self.pools.pods).to_string()),
            ("node".to_string(), pick(rng, &self.pools.nodes).to_string()),
            ("app".to_string(), self.application.clone()),
            ("subsystem".to_string(), self.subsystem.clone()),
        ]);

        Record::MetricSample(MetricSample {
            name,
            value: (raw * 100.0).round() / 100.0,
            timestamp: now.timestamp_millis(),
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_seed_same_records() {
        for domain in Domain::ALL {
            let generator = build_generator(domain, "app", "sub");
            let mut a = StdRng::seed_from_u64(7);
            let mut b = StdRng::seed_from_u64(7);
            for _ in 0..20 {
                assert_eq!(
                    generator.next_record(&mut a, now()),
                    generator.next_record(&mut b, now())
                );
            }
        }
    }

    #[test]
    fn test_generator_domain_matches_records() {
        let mut rng = StdRng::seed_from_u64(1);
        for domain in Domain::ALL {
            let generator = build_generator(domain, "app", "sub");
            assert_eq!(generator.domain(), domain);
            assert_eq!(generator.next_record(&mut rng, now()).domain(), domain);
        }
    }

    #[test]
    fn test_audit_event_shape() {
        let generator = AuditEventGenerator::new(AuditPools::default(), "aws-cloudtrail", "production");
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let Record::AuditEvent(audit) = generator.next_record(&mut rng, now()) else {
                panic!("expected an audit event");
            };
            let event = &audit.event;
            let service = event.event_source.trim_end_matches(".amazonaws.com");
            assert!(AuditPools::default().event_names[service].contains(&event.event_name));
            assert_eq!(
                event.read_only,
                event.event_name.starts_with("Describe")
                    || event.event_name.starts_with("List")
                    || event.event_name.starts_with("Get")
            );
            assert_ne!(event.response_elements.is_some(), event.error_code.is_some());
            assert!(event.user_identity.principal_id.starts_with("AIDA"));
            assert_eq!(event.user_identity.access_key_id.len(), 20);
            assert!(uuid::Uuid::parse_str(&event.event_id).is_ok());
            if event.event_name == "RunInstances" || event.event_name == "CreateBucket" {
                assert!(event.request_parameters.is_some());
            }

            let entry = audit.to_log_entry().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&entry.text).unwrap();
            assert_eq!(parsed["eventID"], event.event_id.as_str());
            assert_eq!(entry.severity, Severity::Info);
            assert_eq!(entry.resource["aws_region"], event.aws_region);
        }
    }

    #[test]
    fn test_log_line_ids() {
        let generator = LogLineGenerator::new(LogPools::default(), "demo-app", "demo-subsystem");
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let Record::LogLine(line) = generator.next_record(&mut rng, now()) else {
                panic!("expected a log line");
            };
            assert_eq!(line.trace_id.len(), 32);
            assert_eq!(line.span_id.len(), 16);
            assert!(line.trace_id.bytes().all(|b| HEX.contains(&b)));
            assert!(LogPools::default().messages.contains(&line.message));
        }
    }

    #[test]
    fn test_metric_values_in_range_and_rounded() {
        let generator = MetricSampleGenerator::new(MetricPools::default(), "k8s", "production");
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let Record::MetricSample(sample) = generator.next_record(&mut rng, now()) else {
                panic!("expected a metric sample");
            };
            assert!((0.1..=99.9).contains(&sample.value));
            assert!(((sample.value * 100.0).round() - sample.value * 100.0).abs() < 1e-6);
            assert_eq!(sample.timestamp, now().timestamp_millis());
            assert_eq!(sample.labels["app"], "k8s");
            assert_eq!(sample.labels.len(), 5);
        }
    }
}
