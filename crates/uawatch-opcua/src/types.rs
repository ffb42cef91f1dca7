// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server and client settings.
//!
//! - **ServerConfig**: identity, endpoint and subscription settings of the
//!   demo server, with a builder
//! - **BuildInfo**: build metadata reported by the server
//! - **ClientConfig**: where a client connects and which namespace it uses
//! - **EndpointUrl**: parsed `opc.tcp://host:port/path` URL
//!
//! # Examples
//!
//! ```
//! use uawatch_opcua::types::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .endpoint("opc.tcp://0.0.0.0:4841/demo/")
//!     .monitored_variable("counter")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.monitored_variable, "counter");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ConnectionError, UaError, UaResult};

/// Default server name.
pub const DEFAULT_SERVER_NAME: &str = "AsyncUA Example Server";

/// Default server endpoint.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://0.0.0.0:4840/asyncua/server/";

/// Default client endpoint.
pub const DEFAULT_CLIENT_URL: &str = "opc.tcp://localhost:4840/asyncua/server/";

/// Default application namespace.
pub const DEFAULT_NAMESPACE_URI: &str = "http://examples.asyncua.server";

/// Default subscription publishing interval.
pub const DEFAULT_SUBSCRIPTION_PERIOD: Duration = Duration::from_millis(500);

/// Default monitored variable.
pub const DEFAULT_MONITORED_VARIABLE: &str = "temperature";

/// Default client request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const OPC_TCP_SCHEME: &str = "opc.tcp://";
const DEFAULT_PORT: u16 = 4840;

// =============================================================================
// EndpointUrl
// =============================================================================

/// A parsed `opc.tcp://` endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    /// Host name or address.
    pub host: String,
    /// TCP port (4840 when omitted).
    pub port: u16,
    /// Path, always starting with `/`.
    pub path: String,
}

impl EndpointUrl {
    /// Returns `true` if `self` and `other` address the same endpoint.
    ///
    /// `localhost`, `127.0.0.1` and `0.0.0.0` are treated as one host and a
    /// trailing slash on the path is ignored.
    pub fn is_equivalent(&self, other: &EndpointUrl) -> bool {
        fn local(host: &str) -> bool {
            matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0")
        }
        let same_host = self.host.eq_ignore_ascii_case(&other.host)
            || (local(&self.host) && local(&other.host));
        same_host
            && self.port == other.port
            && self.path.trim_end_matches('/') == other.path.trim_end_matches('/')
    }
}

impl FromStr for EndpointUrl {
    type Err = UaError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let rest = url
            .strip_prefix(OPC_TCP_SCHEME)
            .ok_or_else(|| ConnectionError::invalid_endpoint(url, "Endpoint must start with opc.tcp://"))?;

        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| ConnectionError::invalid_endpoint(url, format!("Invalid port: {}", e)))?;
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ConnectionError::invalid_endpoint(url, "Missing host").into());
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}{}", OPC_TCP_SCHEME, self.host, self.port, self.path)
    }
}

// =============================================================================
// BuildInfo
// =============================================================================

/// Build metadata reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Product URI.
    pub product_uri: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Product name.
    pub product_name: String,
    /// Software version.
    pub software_version: String,
    /// Build number.
    pub build_number: String,
    /// Build date.
    pub build_date: DateTime<Utc>,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            product_uri: "urn:asyncua:example:server".to_string(),
            manufacturer_name: "AsyncUA Examples".to_string(),
            product_name: DEFAULT_SERVER_NAME.to_string(),
            software_version: "1.0.0".to_string(),
            build_number: "1".to_string(),
            build_date: Utc::now(),
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Demo server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Server name.
    pub name: String,

    /// Endpoint URL the server listens on.
    pub endpoint: String,

    /// Application namespace registered at init.
    pub namespace_uri: String,

    /// Build metadata.
    pub build_info: BuildInfo,

    /// Publishing interval of the server-side subscription.
    pub subscription_period: Duration,

    /// Variable watched by the server's router.
    pub monitored_variable: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            build_info: BuildInfo::default(),
            subscription_period: DEFAULT_SUBSCRIPTION_PERIOD,
            monitored_variable: DEFAULT_MONITORED_VARIABLE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> UaResult<()> {
        self.endpoint.parse::<EndpointUrl>()?;

        if self.namespace_uri.is_empty() {
            return Err(ConfigurationError::invalid_parameter("namespace_uri", "must not be empty").into());
        }

        if self.subscription_period.is_zero() {
            return Err(
                ConfigurationError::invalid_parameter("subscription_period", "must be greater than zero").into(),
            );
        }

        if self.monitored_variable.is_empty() {
            return Err(ConfigurationError::invalid_parameter("monitored_variable", "must not be empty").into());
        }

        Ok(())
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    name: Option<String>,
    endpoint: Option<String>,
    namespace_uri: Option<String>,
    build_info: Option<BuildInfo>,
    subscription_period: Option<Duration>,
    monitored_variable: Option<String>,
}

impl ServerConfigBuilder {
    /// Sets the server name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the application namespace.
    pub fn namespace_uri(mut self, uri: impl Into<String>) -> Self {
        self.namespace_uri = Some(uri.into());
        self
    }

    /// Sets the build metadata.
    pub fn build_info(mut self, info: BuildInfo) -> Self {
        self.build_info = Some(info);
        self
    }

    /// Sets the subscription publishing interval.
    pub fn subscription_period(mut self, period: Duration) -> Self {
        self.subscription_period = Some(period);
        self
    }

    /// Sets the monitored variable.
    pub fn monitored_variable(mut self, name: impl Into<String>) -> Self {
        self.monitored_variable = Some(name.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> UaResult<ServerConfig> {
        let defaults = ServerConfig::default();
        let config = ServerConfig {
            name: self.name.unwrap_or(defaults.name),
            endpoint: self.endpoint.unwrap_or(defaults.endpoint),
            namespace_uri: self.namespace_uri.unwrap_or(defaults.namespace_uri),
            build_info: self.build_info.unwrap_or(defaults.build_info),
            subscription_period: self.subscription_period.unwrap_or(defaults.subscription_period),
            monitored_variable: self.monitored_variable.unwrap_or(defaults.monitored_variable),
        };
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server endpoint URL.
    pub server_url: String,

    /// Namespace resolved on connect.
    pub namespace_uri: String,

    /// Timeout applied to each request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_CLIENT_URL.to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `server_url` with default settings.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Sets the namespace uri.
    pub fn with_namespace_uri(mut self, uri: impl Into<String>) -> Self {
        self.namespace_uri = uri.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates this configuration.
    pub fn validate(&self) -> UaResult<()> {
        self.server_url.parse::<EndpointUrl>()?;
        if self.namespace_uri.is_empty() {
            return Err(ConfigurationError::invalid_parameter("namespace_uri", "must not be empty").into());
        }
        if self.request_timeout.is_zero() {
            return Err(
                ConfigurationError::invalid_parameter("request_timeout", "must be greater than zero").into(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let url: EndpointUrl = DEFAULT_ENDPOINT.parse().unwrap();
        assert_eq!(url.host, "0.0.0.0");
        assert_eq!(url.port, 4840);
        assert_eq!(url.path, "/asyncua/server/");
        assert_eq!(url.to_string(), DEFAULT_ENDPOINT);

        let bare: EndpointUrl = "opc.tcp://plc".parse().unwrap();
        assert_eq!(bare.port, 4840);
        assert_eq!(bare.path, "/");

        assert!("http://localhost:4840".parse::<EndpointUrl>().is_err());
        assert!("opc.tcp://localhost:port/".parse::<EndpointUrl>().is_err());
        assert!("opc.tcp://:4840/".parse::<EndpointUrl>().is_err());
    }

    #[test]
    fn test_endpoint_equivalence() {
        let server: EndpointUrl = DEFAULT_ENDPOINT.parse().unwrap();
        let client: EndpointUrl = DEFAULT_CLIENT_URL.parse().unwrap();
        assert!(server.is_equivalent(&client));

        let loopback: EndpointUrl = "opc.tcp://127.0.0.1:4840/asyncua/server".parse().unwrap();
        assert!(server.is_equivalent(&loopback));

        let other_port: EndpointUrl = "opc.tcp://localhost:4841/asyncua/server/".parse().unwrap();
        assert!(!server.is_equivalent(&other_port));

        let other_host: EndpointUrl = "opc.tcp://plc-01:4840/asyncua/server/".parse().unwrap();
        assert!(!server.is_equivalent(&other_host));
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.name, "AsyncUA Example Server");
        assert_eq!(config.subscription_period, Duration::from_millis(500));
        assert_eq!(config.monitored_variable, "temperature");
        assert_eq!(config.build_info.software_version, "1.0.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_builder_validates() {
        assert!(ServerConfig::builder().endpoint("tcp://x").build().is_err());
        assert!(ServerConfig::builder()
            .subscription_period(Duration::ZERO)
            .build()
            .is_err());
        assert!(ServerConfig::builder().monitored_variable("").build().is_err());
    }

    #[test]
    fn test_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, DEFAULT_CLIENT_URL);
        assert!(config.validate().is_ok());
        assert!(ClientConfig::new("opc.tcp://h:1/").with_namespace_uri("").validate().is_err());
    }
}
