// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built test data for consistent and reproducible testing.

use std::sync::Arc;
use std::time::Duration;

use uawatch_core::{ChangeEvent, NodeId, NotificationPayload, NotificationRouter, Value};
use uawatch_opcua::{ClientConfig, LocalTransport, ServerConfig, UaClient, UaServer};

// =============================================================================
// Event Fixtures
// =============================================================================

/// Fixture providing change notifications.
pub struct EventFixtures;

impl EventFixtures {
    /// Demo namespace index used by the fixtures.
    pub const NS: u16 = 1;

    /// A data change of the demo temperature.
    pub fn temperature(value: f32) -> ChangeEvent {
        Self::change("temperature", Value::Float(value))
    }

    /// A data change of the demo counter.
    pub fn counter(value: i32) -> ChangeEvent {
        Self::change("counter", Value::Int32(value))
    }

    /// A data change of any string-identified node.
    pub fn change(key: &str, value: Value) -> ChangeEvent {
        ChangeEvent::data_change(NodeId::string(Self::NS, key), 1, value)
    }

    /// A data change whose monitored item has an empty identifier.
    pub fn without_identity() -> ChangeEvent {
        ChangeEvent::data_change(NodeId::string(Self::NS, ""), 1, Value::Float(0.0))
    }

    /// A notification that is not a data change.
    pub fn not_a_data_change() -> ChangeEvent {
        ChangeEvent::with_payload(
            NodeId::string(Self::NS, "temperature"),
            Value::Float(0.0),
            NotificationPayload::Other {
                description: "status change".to_string(),
            },
        )
    }

    /// The sweep written by the subscription demo: `15 + 2i`, then the alerts.
    pub fn temperature_sweep() -> Vec<f32> {
        (0..10u8)
            .map(|i| 15.0 + f32::from(i) * 2.0)
            .chain([35.0, 5.0, 22.5])
            .collect()
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML configuration.
    pub fn yaml_full() -> &'static str {
        r#"
server:
  name: "Line 4 Server"
  endpoint: "opc.tcp://0.0.0.0:4841/line4/"
  namespace_uri: "urn:plant:line4"
  subscription_period_ms: 250
  monitored_variable: "counter"
client:
  server_url: "opc.tcp://localhost:4841/line4/"
  namespace_uri: "urn:plant:line4"
  request_timeout_ms: 2000
dispatch:
  listener_timeout_ms: 1000
logging:
  level: debug
  format: json
"#
    }

    /// A minimal TOML configuration.
    pub fn toml_minimal() -> &'static str {
        r#"
[server]
monitored_variable = "status"
"#
    }

    /// A JSON configuration with a placeholder endpoint.
    pub fn json_with_placeholder(var: &str) -> String {
        format!(
            r#"{{
  "server": {{
    "endpoint": "${{{var}:opc.tcp://localhost:4840/asyncua/server/}}"
  }}
}}"#
        )
    }

    /// A fast server configuration for tests.
    pub fn server_config() -> ServerConfig {
        ServerConfig {
            subscription_period: Duration::from_millis(100),
            ..ServerConfig::default()
        }
    }

    /// A client configuration matching [`server_config`](Self::server_config).
    pub fn client_config() -> ClientConfig {
        ClientConfig::default().with_request_timeout(Duration::from_secs(1))
    }
}

// =============================================================================
// Server Fixtures
// =============================================================================

/// Fixture providing running servers and connected clients.
pub struct ServerFixtures;

impl ServerFixtures {
    /// A running demo server feeding `router`.
    pub fn running(router: Arc<NotificationRouter>) -> Arc<UaServer> {
        let server = Arc::new(UaServer::with_router(ConfigFixtures::server_config(), router));
        server.init().expect("Failed to init server");
        server.start().expect("Failed to start server");
        server
    }

    /// A running server and a client connected to it.
    pub async fn connected() -> (Arc<UaServer>, UaClient<LocalTransport>, u16) {
        let server = Self::running(Arc::new(NotificationRouter::new()));
        let config = ConfigFixtures::client_config();
        let transport = LocalTransport::new(config.server_url.clone(), server.clone());
        let mut client = UaClient::new(config, transport);
        let ns = client.connect().await.expect("Failed to connect");
        (server, client, ns)
    }
}
