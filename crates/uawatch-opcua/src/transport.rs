// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client transport abstraction.
//!
//! [`UaTransport`] is the seam between [`UaClient`](crate::client::UaClient)
//! and a server. [`LocalTransport`] talks to an in-process [`UaServer`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uawatch_core::{NodeId, Value};

use crate::address_space::DataValue;
use crate::error::{ConnectionError, UaError, UaResult};
use crate::server::UaServer;
use crate::subscription::{MonitoredItemId, SubscriptionCallback, SubscriptionId};
use crate::types::EndpointUrl;

// =============================================================================
// TransportState
// =============================================================================

/// Connection state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// Not connected.
    #[default]
    Disconnected,

    /// Connected and ready.
    Connected,

    /// Last connection attempt failed.
    Failed,
}

impl TransportState {
    /// Returns `true` if the transport is connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// UaTransport
// =============================================================================

/// Operations a client performs against a server.
#[async_trait]
pub trait UaTransport: Send + Sync {
    /// Connects to the server.
    async fn connect(&mut self) -> UaResult<()>;

    /// Disconnects from the server.
    async fn disconnect(&mut self) -> UaResult<()>;

    /// Returns the current state.
    fn state(&self) -> TransportState;

    /// Returns `true` if connected.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns the endpoint URL.
    fn endpoint(&self) -> &str;

    /// Resolves a namespace uri to its index.
    async fn get_namespace_index(&self, uri: &str) -> UaResult<u16>;

    /// Reads a variable.
    async fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue>;

    /// Writes a variable.
    async fn write_value(&self, node_id: &NodeId, value: Value) -> UaResult<()>;

    /// Calls `method` on `object`.
    async fn call_method(&self, object: &NodeId, method: &NodeId, args: &[Value]) -> UaResult<Vec<Value>>;

    /// Creates a subscription delivering to `callback`.
    async fn create_subscription(
        &self,
        publishing_interval: Duration,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> UaResult<SubscriptionId>;

    /// Monitors a variable.
    async fn create_monitored_item(&self, subscription_id: SubscriptionId, node_id: &NodeId) -> UaResult<MonitoredItemId>;

    /// Removes monitored items.
    async fn delete_monitored_items(&self, subscription_id: SubscriptionId, items: &[MonitoredItemId]) -> UaResult<()>;

    /// Deletes a subscription.
    async fn delete_subscription(&self, subscription_id: SubscriptionId) -> UaResult<()>;
}

// =============================================================================
// LocalTransport
// =============================================================================

/// Transport bound to an in-process [`UaServer`].
pub struct LocalTransport {
    endpoint: String,
    server: Arc<UaServer>,
    state: TransportState,
}

impl LocalTransport {
    /// Creates a transport for `endpoint` served by `server`.
    pub fn new(endpoint: impl Into<String>, server: Arc<UaServer>) -> Self {
        Self {
            endpoint: endpoint.into(),
            server,
            state: TransportState::Disconnected,
        }
    }

    fn server(&self) -> UaResult<&UaServer> {
        if !self.state.is_connected() {
            return Err(UaError::not_connected());
        }
        Ok(&self.server)
    }

    fn check_endpoint(&self) -> UaResult<()> {
        let wanted: EndpointUrl = self.endpoint.parse()?;
        let offered: EndpointUrl = self.server.endpoint().parse()?;
        if !wanted.is_equivalent(&offered) {
            return Err(ConnectionError::refused(self.endpoint.as_str()).into());
        }
        if !self.server.state().is_running() {
            return Err(ConnectionError::server_not_running(self.endpoint.as_str()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl UaTransport for LocalTransport {
    async fn connect(&mut self) -> UaResult<()> {
        if let Err(e) = self.check_endpoint() {
            self.state = TransportState::Failed;
            return Err(e);
        }
        self.state = TransportState::Connected;
        debug!(endpoint = %self.endpoint, "Local transport connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> UaResult<()> {
        self.state = TransportState::Disconnected;
        Ok(())
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_namespace_index(&self, uri: &str) -> UaResult<u16> {
        self.server()?.get_namespace_index(uri)
    }

    async fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue> {
        self.server()?.read_value(node_id)
    }

    async fn write_value(&self, node_id: &NodeId, value: Value) -> UaResult<()> {
        self.server()?.write_value(node_id, value)
    }

    async fn call_method(&self, object: &NodeId, method: &NodeId, args: &[Value]) -> UaResult<Vec<Value>> {
        self.server()?.call_method(object, method, args)
    }

    async fn create_subscription(
        &self,
        publishing_interval: Duration,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> UaResult<SubscriptionId> {
        self.server()?.create_subscription(publishing_interval, callback)
    }

    async fn create_monitored_item(&self, subscription_id: SubscriptionId, node_id: &NodeId) -> UaResult<MonitoredItemId> {
        self.server()?.create_monitored_item(subscription_id, node_id)
    }

    async fn delete_monitored_items(&self, subscription_id: SubscriptionId, items: &[MonitoredItemId]) -> UaResult<()> {
        self.server()?.delete_monitored_items(subscription_id, items)
    }

    async fn delete_subscription(&self, subscription_id: SubscriptionId) -> UaResult<()> {
        self.server()?.delete_subscription(subscription_id)
    }
}

impl fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransport")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerConfig;

    async fn server() -> Arc<UaServer> {
        let server = Arc::new(UaServer::new(ServerConfig::default()));
        server.init().unwrap();
        server.start().unwrap();
        server
    }

    #[tokio::test]
    async fn test_connect_equivalent_host() {
        let server = server().await;
        let mut transport = LocalTransport::new("opc.tcp://localhost:4840/asyncua/server/", server);
        assert_eq!(transport.state(), TransportState::Disconnected);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(
            transport.get_namespace_index("http://examples.asyncua.server").await.unwrap(),
            1
        );

        transport.disconnect().await.unwrap();
        let err = transport.read_value(&NodeId::string(1, "counter")).await.unwrap_err();
        assert!(matches!(err, UaError::Connection(ConnectionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_wrong_endpoint() {
        let server = server().await;
        let mut transport = LocalTransport::new("opc.tcp://localhost:4999/asyncua/server/", server);
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, UaError::Connection(ConnectionError::Refused { .. })));
        assert_eq!(transport.state(), TransportState::Failed);
    }

    #[tokio::test]
    async fn test_connect_stopped_server() {
        let server = server().await;
        server.stop();
        let mut transport = LocalTransport::new("opc.tcp://127.0.0.1:4840/asyncua/server/", server);
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, UaError::Connection(ConnectionError::ServerNotRunning { .. })));
    }
}
