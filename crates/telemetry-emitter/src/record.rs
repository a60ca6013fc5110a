// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synthetic records and their wire representation.
//!
//! Audit events and log lines both travel as log entries
//! (`{text, severity, resource, attributes}`); metric samples travel as
//! `{name, value, timestamp, labels}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SerializationError;

/// The kind of telemetry a stream emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Audit,
    Logs,
    Metrics,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Audit, Domain::Logs, Domain::Metrics];

    /// Prefix of the per-stream environment variables, e.g. `EMITTER_AUDIT_`.
    #[must_use]
    pub fn env_prefix(self) -> &'static str {
        match self {
            Domain::Audit => "EMITTER_AUDIT_",
            Domain::Logs => "EMITTER_LOGS_",
            Domain::Metrics => "EMITTER_METRICS_",
        }
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        match self {
            Domain::Audit => "audit",
            Domain::Logs => "logs",
            Domain::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "audit" | "events" | "cloudtrail" => Ok(Domain::Audit),
            "logs" | "log" => Ok(Domain::Logs),
            "metrics" | "metric" => Ok(Domain::Metrics),
            _ => Err(format!(
                "Invalid stream: '{s}'. Valid streams are: audit, logs, metrics"
            )),
        }
    }
}

/// Log severity as understood by the ingestion endpoint, 1 through 6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Debug = 1,
    Verbose = 2,
    Info = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Debug,
        Severity::Verbose,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// One synthetic datum.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    AuditEvent(AuditEvent),
    LogLine(LogLine),
    MetricSample(MetricSample),
}

impl Record {
    #[must_use]
    pub fn domain(&self) -> Domain {
        match self {
            Record::AuditEvent(_) => Domain::Audit,
            Record::LogLine(_) => Domain::Logs,
            Record::MetricSample(_) => Domain::Metrics,
        }
    }
}

/// Entry of the logs/events envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub text: String,
    pub severity: Severity,
    pub resource: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIssuer {
    #[serde(rename = "type")]
    pub issuer_type: String,
    pub arn: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub session_issuer: SessionIssuer,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    pub principal_id: String,
    pub arn: String,
    pub account_id: String,
    pub access_key_id: String,
    pub session_context: SessionContext,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsDetails {
    pub tls_version: String,
    pub cipher_suite: String,
    pub client_provided_host_header: String,
}

/// A CloudTrail-shaped management event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailEvent {
    pub event_version: String,
    pub user_identity: UserIdentity,
    pub event_time: String,
    pub event_source: String,
    pub event_name: String,
    pub aws_region: String,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
    pub user_agent: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub read_only: bool,
    pub resources: Vec<serde_json::Value>,
    pub event_type: String,
    pub management_event: bool,
    pub recipient_account_id: String,
    pub event_category: String,
    pub tls_details: TlsDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_elements: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuditEvent {
    pub event: CloudTrailEvent,
    pub application: String,
    pub subsystem: String,
}

impl AuditEvent {
    /// The event body is itself JSON, embedded as the entry text.
    pub fn to_log_entry(&self) -> Result<LogEntry, SerializationError> {
        let text = serde_json::to_string(&self.event)?;
        let event = &self.event;
        Ok(LogEntry {
            text,
            severity: Severity::Info,
            resource: BTreeMap::from([
                ("application".to_string(), self.application.clone()),
                ("subsystem".to_string(), self.subsystem.clone()),
                ("aws_account".to_string(), event.recipient_account_id.clone()),
                ("aws_region".to_string(), event.aws_region.clone()),
            ]),
            attributes: BTreeMap::from([
                ("event_id".to_string(), event.event_id.clone()),
                ("event_name".to_string(), event.event_name.clone()),
                ("event_source".to_string(), event.event_source.clone()),
                ("user_arn".to_string(), event.user_identity.arn.clone()),
            ]),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub trace_id: String,
    pub span_id: String,
    pub application: String,
    pub subsystem: String,
}

impl LogLine {
    #[must_use]
    pub fn to_log_entry(&self) -> LogEntry {
        LogEntry {
            text: format!(
                "{} {} trace_id={} span_id={}",
                self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.message,
                self.trace_id,
                self.span_id
            ),
            severity: self.severity,
            resource: BTreeMap::from([
                ("application".to_string(), self.application.clone()),
                ("subsystem".to_string(), self.subsystem.clone()),
            ]),
            attributes: BTreeMap::from([
                ("trace_id".to_string(), self.trace_id.clone()),
                ("span_id".to_string(), self.span_id.clone()),
            ]),
        }
    }
}

/// Entry of the metrics envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: String,
    #[serde(serialize_with = "serialize_finite")]
    pub value: f64,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub labels: BTreeMap<String, String>,
}

// serde_json quietly writes NaN and infinities as `null`, which the metrics
// endpoint rejects; refuse to encode them instead.
fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(serde::ser::Error::custom(format!(
            "metric value {value} is not finite"
        )))
    }
}
