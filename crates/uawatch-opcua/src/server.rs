// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The in-process demo server.
//!
//! A [`UaServer`] owns the address space, the subscription service and a
//! [`NotificationRouter`]. `init` builds the `Device` nodes and a server-side
//! subscription on the monitored variable whose notifications feed the router.
//!
//! ```text
//! Created ──init()──► Initialized ──start()──► Running ──stop()──► Stopped
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uawatch_core::{EventNotification, NodeId, NotificationRouter, Value};

use crate::address_space::{AddressSpace, DataValue};
use crate::demo::{build_demo_address_space, DemoNodes};
use crate::error::{ConfigurationError, ConnectionError, OperationError, UaResult};
use crate::subscription::{
    MonitoredItemId, RouterCallback, SubscriptionCallback, SubscriptionId, SubscriptionService,
};
use crate::types::{BuildInfo, ServerConfig};

// =============================================================================
// ServerState
// =============================================================================

/// Lifecycle state of a [`UaServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Constructed, nothing built yet.
    #[default]
    Created,
    /// Address space and subscription built.
    Initialized,
    /// Accepting client operations.
    Running,
    /// Stopped; cannot be restarted.
    Stopped,
}

impl ServerState {
    /// Returns `true` if the server accepts client operations.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Initialized => write!(f, "Initialized"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

// =============================================================================
// UaServer
// =============================================================================

/// In-process OPC UA demo server.
pub struct UaServer {
    config: ServerConfig,
    space: Arc<AddressSpace>,
    subscriptions: Arc<SubscriptionService>,
    router: Arc<NotificationRouter>,
    state: RwLock<ServerState>,
    nodes: RwLock<Option<DemoNodes>>,
    subscription: RwLock<Option<SubscriptionId>>,
}

impl UaServer {
    /// Creates a server with a router logging through `tracing`.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_router(config, Arc::new(NotificationRouter::new()))
    }

    /// Creates a server feeding `router`.
    pub fn with_router(config: ServerConfig, router: Arc<NotificationRouter>) -> Self {
        Self {
            config,
            space: Arc::new(AddressSpace::new()),
            subscriptions: Arc::new(SubscriptionService::new()),
            router,
            state: RwLock::new(ServerState::Created),
            nodes: RwLock::new(None),
            subscription: RwLock::new(None),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Builds the address space and the monitored-variable subscription.
    ///
    /// Returns the index of the application namespace. Must be called from
    /// within a tokio runtime.
    pub fn init(&self) -> UaResult<u16> {
        self.expect_state(ServerState::Created)?;
        self.config.validate()?;

        let ns = self.space.register_namespace(&self.config.namespace_uri);
        info!("Registered namespace: {} with index {}", self.config.namespace_uri, ns);

        let nodes = build_demo_address_space(&self.space, ns)?;

        let monitored = &self.config.monitored_variable;
        let target = nodes
            .variable(monitored)
            .cloned()
            .ok_or_else(|| OperationError::node_not_found(monitored.as_str()))?;

        let callback: Arc<dyn SubscriptionCallback> = Arc::new(RouterCallback::new(self.router.clone()));
        let sub = self
            .subscriptions
            .create_subscription(self.config.subscription_period, callback)?;
        let initial = self.space.read_value(&target)?;
        self.subscriptions.create_monitored_item(sub, target, initial)?;
        info!("Monitoring variable: {}", monitored);

        self.router.set_watched_key(monitored.as_str());

        *self.nodes.write() = Some(nodes);
        *self.subscription.write() = Some(sub);
        *self.state.write() = ServerState::Initialized;
        Ok(ns)
    }

    /// Starts accepting client operations.
    pub fn start(&self) -> UaResult<()> {
        self.expect_state(ServerState::Initialized)?;
        *self.state.write() = ServerState::Running;
        info!("Server started at {}", self.config.endpoint);
        info!("Server namespace: {}", self.config.namespace_uri);
        Ok(())
    }

    /// Deletes every subscription and stops the server. Idempotent.
    pub fn stop(&self) {
        let previous = {
            let mut state = self.state.write();
            let previous = *state;
            if previous == ServerState::Stopped {
                return;
            }
            *state = ServerState::Stopped;
            previous
        };

        if let Some(sub) = self.subscription.write().take() {
            if let Ok(stats) = self.subscriptions.subscription_stats(sub) {
                info!(
                    subscription = %stats.id,
                    notifications = stats.notification_count,
                    dropped = stats.queued,
                    "Deleting server subscription"
                );
            }
            let _ = self.subscriptions.delete_subscription(sub);
        }
        self.subscriptions.shutdown();

        if previous.is_running() {
            info!("Server stopped");
        } else {
            debug!(state = %previous, "Server stopped before running");
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Returns the build metadata.
    pub fn build_info(&self) -> &BuildInfo {
        &self.config.build_info
    }

    /// Returns the router fed by the server-side subscription.
    pub fn router(&self) -> &Arc<NotificationRouter> {
        &self.router
    }

    /// Returns the address space.
    pub fn address_space(&self) -> &Arc<AddressSpace> {
        &self.space
    }

    /// Returns the subscription service.
    pub fn subscriptions(&self) -> &Arc<SubscriptionService> {
        &self.subscriptions
    }

    /// Returns the demo nodes, once initialized.
    pub fn demo_nodes(&self) -> Option<DemoNodes> {
        self.nodes.read().clone()
    }

    /// Returns the server-side subscription, once initialized.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        *self.subscription.read()
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    /// Resolves a namespace uri.
    pub fn get_namespace_index(&self, uri: &str) -> UaResult<u16> {
        self.ensure_running()?;
        self.space
            .get_namespace_index(uri)
            .ok_or_else(|| ConfigurationError::namespace_not_found(uri).into())
    }

    /// Reads a variable.
    pub fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue> {
        self.ensure_running()?;
        self.space.read_value(node_id)
    }

    /// Writes a variable on behalf of a client and notifies subscriptions.
    pub fn write_value(&self, node_id: &NodeId, value: Value) -> UaResult<()> {
        self.ensure_running()?;
        let written = self.space.write_value(node_id, value)?;
        self.subscriptions.notify_data_change(node_id, &written);
        Ok(())
    }

    /// Writes a variable from the server side, ignoring access level.
    pub fn set_value(&self, node_id: &NodeId, value: Value) -> UaResult<()> {
        let written = self.space.set_value(node_id, value)?;
        self.subscriptions.notify_data_change(node_id, &written);
        Ok(())
    }

    /// Calls a method on an object.
    pub fn call_method(&self, object: &NodeId, method: &NodeId, args: &[Value]) -> UaResult<Vec<Value>> {
        self.ensure_running()?;
        self.space.call_method(object, method, args)
    }

    /// Raises an event on every subscription.
    pub fn raise_event(&self, event: EventNotification) {
        debug!(source = %event.source, severity = event.severity, "Raising event");
        self.subscriptions.raise_event(event);
    }

    /// Creates a client subscription.
    pub fn create_subscription(
        &self,
        publishing_interval: Duration,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> UaResult<SubscriptionId> {
        self.ensure_running()?;
        self.subscriptions.create_subscription(publishing_interval, callback)
    }

    /// Monitors a variable; its current value is the first notification.
    pub fn create_monitored_item(&self, subscription_id: SubscriptionId, node_id: &NodeId) -> UaResult<MonitoredItemId> {
        self.ensure_running()?;
        let initial = self.space.read_value(node_id)?;
        self.subscriptions
            .create_monitored_item(subscription_id, node_id.clone(), initial)
    }

    /// Removes monitored items.
    pub fn delete_monitored_items(&self, subscription_id: SubscriptionId, items: &[MonitoredItemId]) -> UaResult<()> {
        self.ensure_running()?;
        self.subscriptions.delete_monitored_items(subscription_id, items)
    }

    /// Deletes a client subscription.
    pub fn delete_subscription(&self, subscription_id: SubscriptionId) -> UaResult<()> {
        self.ensure_running()?;
        self.subscriptions.delete_subscription(subscription_id)
    }

    fn expect_state(&self, expected: ServerState) -> UaResult<()> {
        let actual = self.state();
        if actual != expected {
            return Err(ConfigurationError::invalid_state(expected, actual).into());
        }
        Ok(())
    }

    fn ensure_running(&self) -> UaResult<()> {
        if !self.state().is_running() {
            return Err(ConnectionError::server_not_running(self.config.endpoint.as_str()).into());
        }
        Ok(())
    }
}

impl Drop for UaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for UaServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaServer")
            .field("name", &self.config.name)
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StatusCode, UaError};
    use uawatch_core::{ChannelListener, MemorySink};

    fn running_server() -> (UaServer, u16) {
        let server = UaServer::new(ServerConfig::default());
        let ns = server.init().unwrap();
        server.start().unwrap();
        (server, ns)
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let server = UaServer::new(ServerConfig::default());
        assert_eq!(server.state(), ServerState::Created);
        assert!(server.start().is_err());

        let ns = server.init().unwrap();
        assert_eq!(ns, 1);
        assert_eq!(server.state(), ServerState::Initialized);
        assert!(server.init().is_err());
        assert_eq!(server.router().watched_key().as_deref(), Some("temperature"));
        assert_eq!(server.subscriptions().subscription_count(), 1);

        server.start().unwrap();
        assert!(server.state().is_running());

        server.stop();
        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        assert_eq!(server.subscriptions().subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_operations_require_running() {
        let server = UaServer::new(ServerConfig::default());
        server.init().unwrap();
        let err = server
            .read_value(&NodeId::string(1, "temperature"))
            .unwrap_err();
        assert!(matches!(err, UaError::Connection(ConnectionError::ServerNotRunning { .. })));
    }

    #[tokio::test]
    async fn test_unknown_monitored_variable() {
        let config = ServerConfig::builder().monitored_variable("pressure").build().unwrap();
        let server = UaServer::new(config);
        let err = server.init().unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::BadNodeIdUnknown));
    }

    #[tokio::test]
    async fn test_read_write_call() {
        let (server, ns) = running_server();
        assert_eq!(server.get_namespace_index("http://examples.asyncua.server").unwrap(), ns);
        assert!(server.get_namespace_index("urn:missing").is_err());

        let counter = NodeId::string(ns, "counter");
        server.write_value(&counter, Value::Int32(42)).unwrap();
        assert_eq!(server.read_value(&counter).unwrap().value, Value::Int32(42));

        let err = server.write_value(&counter, Value::Float(1.0)).unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::BadTypeMismatch));

        let out = server
            .call_method(
                &NodeId::string(ns, "Device"),
                &NodeId::string(ns, "increment_value"),
                &[Value::Int32(10)],
            )
            .unwrap();
        assert_eq!(out, vec![Value::Int32(11)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_reaches_router() {
        let sink = MemorySink::new();
        let router = Arc::new(NotificationRouter::with_sink(Arc::new(sink.clone())));
        let (listener, mut rx) = ChannelListener::with_channel("ack", 8);
        router.add_listener(Arc::new(listener));

        let server = UaServer::with_router(ServerConfig::default(), router.clone());
        let ns = server.init().unwrap();
        server.start().unwrap();

        // Initial value first.
        let (key, value) = rx.recv().await.unwrap();
        assert_eq!((key.as_str(), value), ("temperature", Value::Float(22.5)));

        server
            .write_value(&NodeId::string(ns, "counter"), Value::Int32(5))
            .unwrap();
        server
            .write_value(&NodeId::string(ns, "temperature"), Value::Float(25.5))
            .unwrap();
        let (_, value) = rx.recv().await.unwrap();
        assert_eq!(value, Value::Float(25.5));

        server.raise_event(EventNotification::new(NodeId::SERVER, "maintenance", 300));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.events().len(), 1);
        assert_eq!(router.stats().snapshot().dispatched, 2);
    }
}
