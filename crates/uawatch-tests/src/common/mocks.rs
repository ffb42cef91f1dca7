// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mocks for testing the router and the client in isolation.
//!
//! - [`RecordingListener`] records invocations into a shared [`CallLog`] and
//!   can fail, panic or stall on demand.
//! - [`MockTransport`] keeps variables in memory, counts requests and
//!   supports error and latency injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uawatch_core::{Listener, ListenerError, NodeId, Value};
use uawatch_opcua::{
    ConnectionError, DataValue, MonitoredItemId, OperationError, SubscriptionCallback, SubscriptionId,
    SubscriptionService, TransportState, UaResult, UaTransport,
};

// =============================================================================
// Recording Listener
// =============================================================================

/// Shared, ordered record of `(listener, key, value)` invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, String, Value)>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().clone()
    }

    /// Returns the listener names in invocation order.
    pub fn order(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _, _)| name.clone()).collect()
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    fn push(&self, name: &str, key: &str, value: &Value) {
        self.calls
            .lock()
            .push((name.to_string(), key.to_string(), value.clone()));
    }
}

/// What a [`RecordingListener`] does after recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Return `Ok`.
    Succeed,
    /// Return an error.
    Fail,
    /// Panic.
    Panic,
    /// Sleep before returning `Ok`.
    Stall(Duration),
}

/// Listener that records every invocation.
#[derive(Debug)]
pub struct RecordingListener {
    name: String,
    log: CallLog,
    behavior: Behavior,
}

impl RecordingListener {
    /// Creates a listener that records and succeeds.
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Self::with_behavior(name, log, Behavior::Succeed)
    }

    /// Creates a listener with the given behavior.
    pub fn with_behavior(name: &str, log: &CallLog, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            behavior,
        })
    }
}

#[async_trait]
impl Listener for RecordingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
        match self.behavior {
            Behavior::Succeed => {
                self.log.push(&self.name, key, value);
                Ok(())
            }
            Behavior::Fail => {
                self.log.push(&self.name, key, value);
                Err(ListenerError::new(format!("{} rejected {}", self.name, value)))
            }
            Behavior::Panic => {
                self.log.push(&self.name, key, value);
                panic!("{} panicked", self.name);
            }
            Behavior::Stall(delay) => {
                tokio::time::sleep(delay).await;
                self.log.push(&self.name, key, value);
                Ok(())
            }
        }
    }
}

// =============================================================================
// Mock Transport
// =============================================================================

/// In-memory transport with request counting and error injection.
///
/// Variables live in a map keyed by node id; writes feed a real
/// [`SubscriptionService`] so subscriptions behave like the server's.
pub struct MockTransport {
    endpoint: String,
    namespaces: Vec<String>,
    values: Mutex<HashMap<NodeId, Value>>,
    subscriptions: SubscriptionService,
    state: TransportState,
    latency: Mutex<Duration>,
    fail_connection: AtomicBool,
    fail_next_request: AtomicBool,
    request_count: AtomicU64,
    write_history: Mutex<Vec<(NodeId, Value)>>,
}

impl MockTransport {
    /// Creates a transport knowing `namespace_uri` at index 1.
    pub fn new(endpoint: impl Into<String>, namespace_uri: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespaces: vec!["http://opcfoundation.org/UA/".to_string(), namespace_uri.into()],
            values: Mutex::new(HashMap::new()),
            subscriptions: SubscriptionService::new(),
            state: TransportState::Disconnected,
            latency: Mutex::new(Duration::ZERO),
            fail_connection: AtomicBool::new(false),
            fail_next_request: AtomicBool::new(false),
            request_count: AtomicU64::new(0),
            write_history: Mutex::new(Vec::new()),
        }
    }

    /// Sets a variable.
    pub fn with_value(self, node_id: NodeId, value: Value) -> Self {
        self.values.lock().insert(node_id, value);
        self
    }

    /// Delays every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Makes the next connect attempt fail.
    pub fn fail_connection(&self, fail: bool) {
        self.fail_connection.store(fail, Ordering::SeqCst);
    }

    /// Makes the next request fail.
    pub fn fail_next_request(&self) {
        self.fail_next_request.store(true, Ordering::SeqCst);
    }

    /// Number of requests served (including failed ones).
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Values written, in order.
    pub fn write_history(&self) -> Vec<(NodeId, Value)> {
        self.write_history.lock().clone()
    }

    async fn begin(&self) -> UaResult<()> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if !self.state.is_connected() {
            return Err(ConnectionError::NotConnected.into());
        }
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_next_request.swap(false, Ordering::SeqCst) {
            return Err(ConnectionError::refused(self.endpoint.as_str()).into());
        }
        Ok(())
    }

    fn lookup(&self, node_id: &NodeId) -> UaResult<Value> {
        self.values
            .lock()
            .get(node_id)
            .cloned()
            .ok_or_else(|| OperationError::node_not_found(node_id.to_string()).into())
    }
}

#[async_trait]
impl UaTransport for MockTransport {
    async fn connect(&mut self) -> UaResult<()> {
        if self.fail_connection.load(Ordering::SeqCst) {
            self.state = TransportState::Failed;
            return Err(ConnectionError::refused(self.endpoint.as_str()).into());
        }
        self.state = TransportState::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> UaResult<()> {
        self.subscriptions.shutdown();
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
        self.begin().await?;
        self.namespaces
            .iter()
            .position(|ns| ns == uri)
            .map(|i| i as u16)
            .ok_or_else(|| uawatch_opcua::ConfigurationError::namespace_not_found(uri).into())
    }

    async fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue> {
        self.begin().await?;
        self.lookup(node_id).map(DataValue::now)
    }

    async fn write_value(&self, node_id: &NodeId, value: Value) -> UaResult<()> {
        self.begin().await?;
        let current = self.lookup(node_id)?;
        if current.data_type() != value.data_type() {
            return Err(
                OperationError::type_mismatch(node_id.to_string(), current.data_type(), value.data_type()).into(),
            );
        }
        self.values.lock().insert(node_id.clone(), value.clone());
        self.write_history.lock().push((node_id.clone(), value.clone()));
        self.subscriptions.notify_data_change(node_id, &DataValue::now(value));
        Ok(())
    }

    async fn call_method(&self, _object: &NodeId, method: &NodeId, args: &[Value]) -> UaResult<Vec<Value>> {
        self.begin().await?;
        match args {
            [Value::Int32(v)] => Ok(vec![Value::Int32(v.saturating_add(1))]),
            _ => Err(OperationError::method_invalid("mock", method.to_string()).into()),
        }
    }

    async fn create_subscription(
        &self,
        publishing_interval: Duration,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> UaResult<SubscriptionId> {
        self.begin().await?;
        self.subscriptions.create_subscription(publishing_interval, callback)
    }

    async fn create_monitored_item(&self, subscription_id: SubscriptionId, node_id: &NodeId) -> UaResult<MonitoredItemId> {
        self.begin().await?;
        let initial = DataValue::now(self.lookup(node_id)?);
        self.subscriptions
            .create_monitored_item(subscription_id, node_id.clone(), initial)
    }

    async fn delete_monitored_items(&self, subscription_id: SubscriptionId, items: &[MonitoredItemId]) -> UaResult<()> {
        self.begin().await?;
        self.subscriptions.delete_monitored_items(subscription_id, items)
    }

    async fn delete_subscription(&self, subscription_id: SubscriptionId) -> UaResult<()> {
        self.begin().await?;
        self.subscriptions.delete_subscription(subscription_id)
    }
}
