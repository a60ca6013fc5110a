// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log level of the emitter's own diagnostics.
//!
//! Parsed case-insensitively from `EMITTER_LOG_LEVEL`; the default is `info`.

use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl LogLevel {
    /// `EnvFilter` directive: the chosen level for the emitter, with the
    /// chattiest transport crates silenced.
    #[must_use]
    pub fn filter_directive(self) -> String {
        format!("h2=off,hyper=off,rustls=off,reqwest=off,{}", self.as_ref())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: error, warn, info, debug, trace",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(LogLevel::from_str("debug").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str(" Warn ").unwrap(), LogLevel::Warn);
    }

    #[test]
    fn test_parse_invalid() {
        let err = LogLevel::from_str("verbose").unwrap_err();
        assert!(err.contains("verbose"));
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            LogLevel::Trace.filter_directive(),
            "h2=off,hyper=off,rustls=off,reqwest=off,trace"
        );
    }
}
