// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of a batch to the ingestion endpoint.
//!
//! One POST per batch, no retries: a failed batch is simply gone. Every
//! failure is turned into a [`SendOutcome`] so nothing propagates into the
//! emission loop.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, error};

use crate::batch::Batch;
use crate::error::TransportError;

#[derive(Debug)]
pub enum SendOutcome {
    /// The endpoint answered with a 2xx status.
    Delivered { status: StatusCode },
    /// The endpoint answered with anything else.
    Rejected { status: StatusCode, body: String },
    /// The endpoint could not be reached.
    Failed(TransportError),
}

impl SendOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SendOutcome::Delivered { status } | SendOutcome::Rejected { status, .. } => {
                Some(*status)
            }
            SendOutcome::Failed(_) => None,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &Batch) -> SendOutcome;
}

/// How requests authenticate, besides whatever the payload carries.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "Auth::None"),
            Auth::Bearer(_) => write!(f, "Auth::Bearer(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: reqwest::Client, url: String, auth: &Auth) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Auth::Bearer(token) = auth {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => error!("Bearer token is not a valid header value, sending without it: {e}"),
            }
        }
        Self {
            client,
            url,
            headers,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &Batch) -> SendOutcome {
        debug!("POST {} ({} bytes)", self.url, batch.byte_size());
        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(batch.payload().to_owned())
            .send()
            .await;

        match resp {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    SendOutcome::Delivered { status }
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    error!("{}: Failed to push to {}: {:?}", status, self.url, body);
                    SendOutcome::Rejected { status, body }
                }
            }
            Err(e) => {
                error!("Error sending {} records: {}", batch.records().len(), e);
                SendOutcome::Failed(TransportError::Request(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchAssembler, EnvelopeMetadata};
    use crate::generator::build_generator;
    use crate::record::Domain;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn batch(domain: Domain) -> Batch {
        let assembler = BatchAssembler::new(
            EnvelopeMetadata {
                private_key: "mock-private-key".to_string(),
                application_name: "app".to_string(),
                subsystem_name: "sub".to_string(),
            },
            3..=3,
        );
        let generator = build_generator(domain, "app", "sub");
        let mut rng = StdRng::seed_from_u64(1);
        assembler
            .assemble(generator.as_ref(), &mut rng, Utc::now())
            .unwrap()
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_logs_are_posted_as_json() {
        let mut server = Server::new_async().await;
        let batch = batch(Domain::Logs);
        let mock = server
            .mock("POST", "/api/v1/logs")
            .match_header("Content-Type", "application/json")
            .match_header("Authorization", Matcher::Missing)
            .match_body(Matcher::Exact(batch.payload().to_string()))
            .with_status(200)
            .create_async()
            .await;

        let transport = HttpTransport::new(
            client(),
            format!("{}/api/v1/logs", server.url()),
            &Auth::None,
        );
        let outcome = transport.send(&batch).await;

        mock.assert_async().await;
        assert!(outcome.is_success());
        assert_eq!(outcome.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_metrics_use_bearer_auth() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/metrics")
            .match_header("Content-Type", "application/json")
            .match_header("Authorization", "Bearer mock-token")
            .with_status(202)
            .create_async()
            .await;

        let transport = HttpTransport::new(
            client(),
            format!("{}/metrics", server.url()),
            &Auth::Bearer("mock-token".to_string()),
        );
        let outcome = transport.send(&batch(Domain::Metrics)).await;

        mock.assert_async().await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/logs")
            .with_status(403)
            .with_body("{\"error\":\"invalid private key\"}")
            .expect(1)
            .create_async()
            .await;

        let transport = HttpTransport::new(
            client(),
            format!("{}/api/v1/logs", server.url()),
            &Auth::None,
        );
        let outcome = transport.send(&batch(Domain::Audit)).await;

        mock.assert_async().await;
        match outcome {
            SendOutcome::Rejected { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(body.contains("invalid private key"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_failed_outcome() {
        // Nothing listens on port 9 of the loopback interface.
        let transport = HttpTransport::new(
            client(),
            "http://127.0.0.1:9/api/v1/logs".to_string(),
            &Auth::None,
        );
        let outcome = transport.send(&batch(Domain::Logs)).await;
        assert!(matches!(outcome, SendOutcome::Failed(TransportError::Request(_))));
        assert_eq!(outcome.status(), None);
    }

    #[test]
    fn test_auth_debug_redacts_token() {
        let auth = Auth::Bearer("secret".to_string());
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
