// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the `uawatch` binary.
//!
//! Every failure maps to a process exit code:
//!
//! | Code | Cause |
//! |------|-------|
//! | 1 | invalid configuration |
//! | 2 | logging could not be installed |
//! | 3 | a demo command failed |
//! | 4 | I/O |
//! | 5 | an OPC UA request failed |

use thiserror::Error;
use uawatch_config::ConfigError;
use uawatch_opcua::UaError;

/// Result type alias for uawatch-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors surfaced by the `uawatch` commands.
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration is unusable for the requested command.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// A demo command stopped before completing.
    #[error("{command} demo failed: {message}")]
    Demo {
        /// Command name (`server`, `client`, `watch`, ...).
        command: &'static str,
        /// What went wrong.
        message: String,
    },

    /// I/O failure.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// OPC UA request failed.
    #[error("OPC UA request failed: {0}")]
    Ua(#[from] UaError),
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a logging initialization error.
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    /// Creates a demo failure for `command`.
    pub fn demo(command: &'static str, message: impl Into<String>) -> Self {
        Self::Demo {
            command,
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Logging(_) => 2,
            Self::Demo { .. } => 3,
            Self::Io(_) => 4,
            Self::Ua(_) => 5,
        }
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::demo("uawatch", format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Writes `error` and its source chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("uawatch: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports `error` and exits with its exit code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BinError::config("missing endpoint").to_string(),
            "invalid configuration: missing endpoint"
        );
        assert_eq!(
            BinError::demo("watch", "notification channel closed").to_string(),
            "watch demo failed: notification channel closed"
        );
        let err = BinError::from(ConfigError::validation("server.endpoint", "cannot be empty"));
        assert_eq!(err.to_string(), "Validation failed for 'server.endpoint': cannot be empty");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("x").exit_code(), 1);
        assert_eq!(BinError::logging("x").exit_code(), 2);
        assert_eq!(BinError::demo("client", "x").exit_code(), 3);
        assert_eq!(BinError::from(std::io::Error::other("x")).exit_code(), 4);
        assert_eq!(BinError::from(UaError::not_connected()).exit_code(), 5);
    }

    #[test]
    fn test_from_anyhow_keeps_chain() {
        let err: BinError = anyhow::anyhow!("inner").context("outer").into();
        assert_eq!(err.to_string(), "uawatch demo failed: outer: inner");
        assert_eq!(err.exit_code(), 3);
    }
}
