// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```yaml
//! server:
//!   name: AsyncUA Example Server
//!   endpoint: opc.tcp://0.0.0.0:4840/asyncua/server/
//!   namespace_uri: http://examples.asyncua.server
//!   subscription_period_ms: 500
//!   monitored_variable: temperature
//!
//! client:
//!   server_url: opc.tcp://localhost:4840/asyncua/server/
//!   request_timeout_ms: 5000
//!
//! dispatch:
//!   listener_timeout_ms: 5000   # 0 disables the timeout
//!
//! logging:
//!   level: info
//!   format: text
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

const OPC_TCP_SCHEME: &str = "opc.tcp://";

/// Default application namespace.
pub const DEFAULT_NAMESPACE_URI: &str = "http://examples.asyncua.server";

/// Default subscription publishing interval in milliseconds.
pub const DEFAULT_SUBSCRIPTION_PERIOD_MS: u64 = 500;

/// Default client request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default per-listener timeout in milliseconds.
pub const DEFAULT_LISTENER_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Root
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UawatchConfig {
    /// Demo server settings.
    pub server: ServerConfig,

    /// Demo client settings.
    pub client: ClientConfig,

    /// Notification dispatch settings.
    pub dispatch: DispatchConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl UawatchConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.client.validate()?;
        Ok(())
    }
}

// =============================================================================
// Server
// =============================================================================

/// Demo server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name.
    pub name: String,

    /// Endpoint URL.
    pub endpoint: String,

    /// Application namespace uri.
    pub namespace_uri: String,

    /// Product URI reported in the build info.
    pub product_uri: String,

    /// Manufacturer reported in the build info.
    pub manufacturer: String,

    /// Product name reported in the build info.
    pub product_name: String,

    /// Software version reported in the build info.
    pub software_version: String,

    /// Build number reported in the build info.
    pub build_number: String,

    /// Subscription publishing interval in milliseconds.
    pub subscription_period_ms: u64,

    /// Variable whose changes reach the listeners.
    pub monitored_variable: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "AsyncUA Example Server".to_string(),
            endpoint: "opc.tcp://0.0.0.0:4840/asyncua/server/".to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            product_uri: "urn:asyncua:example:server".to_string(),
            manufacturer: "AsyncUA Examples".to_string(),
            product_name: "AsyncUA Example Server".to_string(),
            software_version: "1.0.0".to_string(),
            build_number: "1".to_string(),
            subscription_period_ms: DEFAULT_SUBSCRIPTION_PERIOD_MS,
            monitored_variable: "temperature".to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns the subscription publishing interval.
    pub fn subscription_period(&self) -> Duration {
        Duration::from_millis(self.subscription_period_ms)
    }

    /// Validates the server settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::validation("server.name", "cannot be empty"));
        }
        validate_endpoint("server.endpoint", &self.endpoint)?;
        if self.namespace_uri.is_empty() {
            return Err(ConfigError::validation("server.namespace_uri", "cannot be empty"));
        }
        if self.subscription_period_ms == 0 {
            return Err(ConfigError::validation(
                "server.subscription_period_ms",
                "must be greater than 0",
            ));
        }
        if self.monitored_variable.is_empty() {
            return Err(ConfigError::validation("server.monitored_variable", "cannot be empty"));
        }
        Ok(())
    }
}

// =============================================================================
// Client
// =============================================================================

/// Demo client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server endpoint URL.
    pub server_url: String,

    /// Namespace uri resolved on connect.
    pub namespace_uri: String,

    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "opc.tcp://localhost:4840/asyncua/server/".to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Returns the request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates the client settings.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_endpoint("client.server_url", &self.server_url)?;
        if self.namespace_uri.is_empty() {
            return Err(ConfigError::validation("client.namespace_uri", "cannot be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "client.request_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Notification dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Per-listener timeout in milliseconds; `0` disables it.
    pub listener_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            listener_timeout_ms: DEFAULT_LISTENER_TIMEOUT_MS,
        }
    }
}

impl DispatchConfig {
    /// Returns the per-listener timeout, if enabled.
    pub fn listener_timeout(&self) -> Option<Duration> {
        (self.listener_timeout_ms > 0).then(|| Duration::from_millis(self.listener_timeout_ms))
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    pub level: LogLevel,

    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as used by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::validation(
                "logging.level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// Condensed text.
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
            LogFormat::Compact => f.write_str("compact"),
        }
    }
}

fn validate_endpoint(field: &str, url: &str) -> ConfigResult<()> {
    match url.strip_prefix(OPC_TCP_SCHEME) {
        Some(rest) if !rest.is_empty() => Ok(()),
        Some(_) => Err(ConfigError::validation(field, "missing host")),
        None => Err(ConfigError::validation(
            field,
            format!("must start with {}", OPC_TCP_SCHEME),
        )),
    }
}
