// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Demo client.
//!
//! [`UaClient`] addresses variables by their string identifier in the
//! application namespace, so `read_variable("temperature", ns)` reads
//! `ns=<ns>;s=temperature`. Every operation is bounded by the configured
//! request timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use uawatch_core::{NodeId, NotificationRouter, Value};

use crate::error::{ConnectionError, UaError, UaResult};
use crate::subscription::{MonitoredItemId, RouterCallback, SubscriptionId};
use crate::transport::UaTransport;
use crate::types::ClientConfig;

/// Client over a [`UaTransport`].
pub struct UaClient<T: UaTransport> {
    config: ClientConfig,
    transport: T,
}

impl<T: UaTransport> UaClient<T> {
    /// Creates a disconnected client.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns `true` if connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connects and resolves the configured namespace.
    pub async fn connect(&mut self) -> UaResult<u16> {
        let url = self.config.server_url.clone();
        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, self.transport.connect()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::timed_out(url.as_str(), timeout).into()),
        };
        if let Err(e) = result {
            error!("Failed to connect: {}", e);
            return Err(e);
        }
        info!("Connected to server at {}", url);

        let uri = self.config.namespace_uri.clone();
        let ns = self
            .request("get namespace index", self.transport.get_namespace_index(&uri))
            .await
            .map_err(|e| {
                error!("Failed to connect: {}", e);
                e
            })?;
        info!("Namespace index for {} is {}", uri, ns);
        Ok(ns)
    }

    /// Disconnects. Does nothing when not connected.
    pub async fn disconnect(&mut self) -> UaResult<()> {
        if !self.transport.is_connected() {
            return Ok(());
        }
        self.transport.disconnect().await?;
        info!("Disconnected from server");
        Ok(())
    }

    /// Reads the variable `name` in namespace `ns`.
    pub async fn read_variable(&self, name: &str, ns: u16) -> UaResult<Value> {
        let node = NodeId::string(ns, name);
        match self.request("read", self.transport.read_value(&node)).await {
            Ok(data) => {
                info!("Read variable {}: {}", name, data.value);
                Ok(data.value)
            }
            Err(e) => {
                error!("Failed to read variable {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Writes the variable `name` in namespace `ns`.
    pub async fn write_variable(&self, name: &str, ns: u16, value: impl Into<Value>) -> UaResult<()> {
        let node = NodeId::string(ns, name);
        let value = value.into();
        match self
            .request("write", self.transport.write_value(&node, value.clone()))
            .await
        {
            Ok(()) => {
                info!("Wrote variable {}: {}", name, value);
                Ok(())
            }
            Err(e) => {
                error!("Failed to write variable {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Calls `method` on the object `parent`, both in namespace `ns`.
    pub async fn call_method(&self, method: &str, parent: &str, ns: u16, args: &[Value]) -> UaResult<Vec<Value>> {
        let object = NodeId::string(ns, parent);
        let method_node = NodeId::string(ns, method);
        match self
            .request("call", self.transport.call_method(&object, &method_node, args))
            .await
        {
            Ok(result) => {
                info!("Called method {}({}): {}", method, join(args), join(&result));
                Ok(result)
            }
            Err(e) => {
                error!("Failed to call method {}: {}", method, e);
                Err(e)
            }
        }
    }

    /// Subscribes to `names` in namespace `ns`, feeding changes to `router`.
    pub async fn subscribe(
        &self,
        period: Duration,
        router: Arc<NotificationRouter>,
        names: &[&str],
        ns: u16,
    ) -> UaResult<WatchHandle> {
        let callback = Arc::new(RouterCallback::new(router));
        let subscription_id = self
            .request("create subscription", self.transport.create_subscription(period, callback))
            .await
            .map_err(|e| {
                error!("Failed to create subscription: {}", e);
                e
            })?;
        info!(subscription = %subscription_id, "Created subscription");

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let node = NodeId::string(ns, *name);
            let item = match self
                .request("monitor", self.transport.create_monitored_item(subscription_id, &node))
                .await
            {
                Ok(item) => item,
                Err(e) => {
                    error!("Failed to subscribe to {}: {}", name, e);
                    let _ = self.transport.delete_subscription(subscription_id).await;
                    return Err(e);
                }
            };
            info!(item = %item, "Subscribed to data change for {}", name);
            items.push((name.to_string(), item));
        }

        Ok(WatchHandle { subscription_id, items })
    }

    async fn request<R>(&self, operation: &str, fut: impl Future<Output = UaResult<R>>) -> UaResult<R> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(operation = operation, "Request timed out");
                Err(UaError::from(ConnectionError::timed_out(self.config.server_url.as_str(), timeout)))
            }
        }
    }
}

fn join(values: &[Value]) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}

// =============================================================================
// WatchHandle
// =============================================================================

/// A client subscription created by [`UaClient::subscribe`].
#[derive(Debug)]
pub struct WatchHandle {
    subscription_id: SubscriptionId,
    items: Vec<(String, MonitoredItemId)>,
}

impl WatchHandle {
    /// Returns the subscription id.
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Returns the monitored items by variable name.
    pub fn items(&self) -> &[(String, MonitoredItemId)] {
        &self.items
    }

    /// Stops monitoring `name`. Unknown names are ignored.
    pub async fn unsubscribe<T: UaTransport>(&mut self, client: &UaClient<T>, name: &str) -> UaResult<()> {
        let Some(pos) = self.items.iter().position(|(n, _)| n == name) else {
            return Ok(());
        };
        let (_, item) = &self.items[pos];
        client
            .request(
                "unsubscribe",
                client.transport.delete_monitored_items(self.subscription_id, &[*item]),
            )
            .await
            .map_err(|e| {
                error!("Failed to unsubscribe {}: {}", name, e);
                e
            })?;
        self.items.remove(pos);
        info!("Unsubscribed from {}", name);
        Ok(())
    }

    /// Deletes the subscription.
    pub async fn delete<T: UaTransport>(self, client: &UaClient<T>) -> UaResult<()> {
        client
            .request(
                "delete subscription",
                client.transport.delete_subscription(self.subscription_id),
            )
            .await
            .map_err(|e| {
                error!("Failed to delete subscription: {}", e);
                e
            })?;
        info!(subscription = %self.subscription_id, "Deleted subscription");
        Ok(())
    }
}
