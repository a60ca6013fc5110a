// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client shared by every stream.
//!
//! The client carries the request timeout, connection pooling and TCP
//! keep-alive settings, plus an HTTPS proxy when one is configured. An
//! unparsable proxy never stops the emitter: it falls back to a direct
//! connection, and to reqwest's defaults as a last resort.

use core::time::Duration;
use std::error::Error;
use tracing::error;

/// Settings that shape the outbound client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub https_proxy: Option<String>,
}

#[must_use]
pub fn get_client(settings: &HttpSettings) -> reqwest::Client {
    match build_client(settings, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(settings, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(
    settings: &HttpSettings,
    allow_proxy: bool,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &settings.https_proxy {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    Ok(client.build()?)
}
