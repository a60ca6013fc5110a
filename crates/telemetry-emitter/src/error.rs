// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::record::Domain;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No credential configured for the {0} stream")]
    MissingCredential(Domain),
}

/// A batch could not be encoded into its wire envelope.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("failed to encode payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{record} record cannot be placed in a {envelope} envelope")]
    EnvelopeMismatch { record: Domain, envelope: Domain },
}

/// The destination could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
