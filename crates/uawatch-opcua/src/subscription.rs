// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscriptions and monitored items.
//!
//! # Architecture
//!
//! ```text
//!  write_value ──► SubscriptionService::notify_data_change
//!                         │  (value changed?)
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!    ┌──────────┐   ┌──────────┐   ┌──────────┐
//!    │  sub-1   │   │  sub-2   │   │  sub-3   │   queue per subscription
//!    └────┬─────┘   └────┬─────┘   └────┬─────┘
//!         ▼              ▼              ▼
//!   publishing task (one per subscription, every publishing interval)
//!         │
//!         ▼
//!   SubscriptionCallback::on_data_change / on_event / on_keep_alive
//! ```
//!
//! Notifications are delivered to a callback strictly one at a time, in the
//! order they were queued.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use uawatch_core::{ChangeEvent, EventNotification, NodeId, NotificationRouter, Value};

use crate::address_space::DataValue;
use crate::error::{SubscriptionError, UaError, UaResult};

/// Empty publishing cycles before a keep-alive is sent.
pub const DEFAULT_KEEP_ALIVE_COUNT: u32 = 10;

// =============================================================================
// IDs
// =============================================================================

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

impl SubscriptionId {
    /// Returns the raw ID value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Unique identifier for a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoredItemId(pub u32);

impl MonitoredItemId {
    /// Returns the raw ID value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MonitoredItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mi-{}", self.0)
    }
}

// =============================================================================
// Subscription State
// =============================================================================

/// State of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Publishing.
    Active,
    /// Deleted; no further notifications.
    Deleted,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Deleted => write!(f, "Deleted"),
        }
    }
}

// =============================================================================
// Data Change Notification
// =============================================================================

/// Notification for a data value change.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChangeNotification {
    /// Subscription that generated this notification.
    pub subscription_id: SubscriptionId,

    /// Monitored item.
    pub monitored_item_id: MonitoredItemId,

    /// Client-provided handle.
    pub client_handle: u32,

    /// Node ID of the changed node.
    pub node_id: NodeId,

    /// New value.
    pub value: Value,

    /// Source timestamp.
    pub source_timestamp: DateTime<Utc>,

    /// Server timestamp.
    pub server_timestamp: DateTime<Utc>,

    /// Sequence number within the subscription.
    pub sequence_number: u32,
}

impl DataChangeNotification {
    /// Converts this notification into the event handed to the router.
    pub fn to_change_event(&self) -> ChangeEvent {
        ChangeEvent::data_change(self.node_id.clone(), self.client_handle, self.value.clone())
    }
}

// =============================================================================
// Subscription Callback
// =============================================================================

/// Receiver of subscription notifications.
#[async_trait]
pub trait SubscriptionCallback: Send + Sync {
    /// Called for every data change notification.
    async fn on_data_change(&self, notification: DataChangeNotification);

    /// Called for every event notification.
    async fn on_event(&self, _subscription_id: SubscriptionId, _event: EventNotification) {}

    /// Called when a publishing cycle has nothing to deliver for a while.
    async fn on_keep_alive(&self, _subscription_id: SubscriptionId) {}

    /// Called when the subscription state changes.
    async fn on_state_change(&self, _subscription_id: SubscriptionId, _state: SubscriptionState) {}
}

/// Feeds notifications into a [`NotificationRouter`].
#[derive(Debug, Clone)]
pub struct RouterCallback {
    router: Arc<NotificationRouter>,
}

impl RouterCallback {
    /// Wraps a router.
    pub fn new(router: Arc<NotificationRouter>) -> Self {
        Self { router }
    }

    /// Returns the wrapped router.
    pub fn router(&self) -> &Arc<NotificationRouter> {
        &self.router
    }
}

#[async_trait]
impl SubscriptionCallback for RouterCallback {
    async fn on_data_change(&self, notification: DataChangeNotification) {
        self.router
            .on_notification(&notification.to_change_event())
            .await;
    }

    async fn on_event(&self, _subscription_id: SubscriptionId, event: EventNotification) {
        self.router.on_event(event);
    }

    async fn on_keep_alive(&self, subscription_id: SubscriptionId) {
        trace!(subscription = %subscription_id, "Keep-alive");
    }
}

/// A channel-based callback implementation.
pub struct ChannelCallback {
    sender: mpsc::Sender<DataChangeNotification>,
}

impl ChannelCallback {
    /// Creates a new channel callback.
    pub fn new(sender: mpsc::Sender<DataChangeNotification>) -> Self {
        Self { sender }
    }

    /// Creates a new channel callback with a receiver.
    pub fn with_channel(capacity: usize) -> (Self, mpsc::Receiver<DataChangeNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl SubscriptionCallback for ChannelCallback {
    async fn on_data_change(&self, notification: DataChangeNotification) {
        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(notification).await;
    }
}

// =============================================================================
// Internal State
// =============================================================================

struct MonitoredItem {
    node_id: NodeId,
    client_handle: u32,
    last_value: Value,
}

enum Queued {
    Data(DataChangeNotification),
    Event(EventNotification),
}

struct SubscriptionEntry {
    id: SubscriptionId,
    publishing_interval: Duration,
    callback: Arc<dyn SubscriptionCallback>,
    items: Mutex<HashMap<MonitoredItemId, MonitoredItem>>,
    queue: Mutex<VecDeque<Queued>>,
    sequence: AtomicU32,
    published: AtomicU64,
    created_at: DateTime<Utc>,
    last_publish: Mutex<Option<DateTime<Utc>>>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionEntry {
    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn enqueue(&self, item: MonitoredItemId, node_id: &NodeId, client_handle: u32, value: &DataValue) {
        let notification = DataChangeNotification {
            subscription_id: self.id,
            monitored_item_id: item,
            client_handle,
            node_id: node_id.clone(),
            value: value.value.clone(),
            source_timestamp: value.source_timestamp,
            server_timestamp: value.server_timestamp,
            sequence_number: self.next_sequence(),
        };
        self.queue.lock().push_back(Queued::Data(notification));
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Per-subscription statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStats {
    /// Subscription ID.
    pub id: SubscriptionId,
    /// Number of monitored items.
    pub monitored_item_count: usize,
    /// Notifications delivered to the callback.
    pub notification_count: u64,
    /// Notifications waiting for the next publishing cycle.
    pub queued: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last publishing cycle that delivered something.
    pub last_publish: Option<DateTime<Utc>>,
    /// Publishing interval.
    pub publishing_interval: Duration,
}

/// Service-wide counters.
#[derive(Debug, Default)]
pub struct SubscriptionServiceStats {
    subscriptions_created: AtomicU64,
    subscriptions_deleted: AtomicU64,
    notifications_queued: AtomicU64,
    events_raised: AtomicU64,
}

impl SubscriptionServiceStats {
    /// Returns total subscriptions created.
    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    /// Returns total subscriptions deleted.
    pub fn subscriptions_deleted(&self) -> u64 {
        self.subscriptions_deleted.load(Ordering::Relaxed)
    }

    /// Returns total data change notifications queued.
    pub fn notifications_queued(&self) -> u64 {
        self.notifications_queued.load(Ordering::Relaxed)
    }

    /// Returns total events raised.
    pub fn events_raised(&self) -> u64 {
        self.events_raised.load(Ordering::Relaxed)
    }
}

// =============================================================================
// SubscriptionService
// =============================================================================

/// Server-side subscription engine.
///
/// Must be used from within a tokio runtime: each subscription owns a
/// publishing task.
pub struct SubscriptionService {
    subscriptions: DashMap<SubscriptionId, Arc<SubscriptionEntry>>,
    next_subscription_id: AtomicU32,
    next_item_id: AtomicU32,
    keep_alive_count: u32,
    stats: SubscriptionServiceStats,
}

impl SubscriptionService {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::with_keep_alive_count(DEFAULT_KEEP_ALIVE_COUNT)
    }

    /// Creates a service sending a keep-alive after `count` empty cycles.
    pub fn with_keep_alive_count(count: u32) -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_subscription_id: AtomicU32::new(1),
            next_item_id: AtomicU32::new(1),
            keep_alive_count: count.max(1),
            stats: SubscriptionServiceStats::default(),
        }
    }

    /// Creates a subscription and starts its publishing task.
    pub fn create_subscription(
        &self,
        publishing_interval: Duration,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> UaResult<SubscriptionId> {
        if publishing_interval.is_zero() {
            return Err(SubscriptionError::InvalidInterval {
                interval: publishing_interval,
            }
            .into());
        }

        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(SubscriptionEntry {
            id,
            publishing_interval,
            callback,
            items: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            sequence: AtomicU32::new(0),
            published: AtomicU64::new(0),
            created_at: Utc::now(),
            last_publish: Mutex::new(None),
            token: CancellationToken::new(),
            task: Mutex::new(None),
        });

        let handle = tokio::spawn(run_publisher(entry.clone(), self.keep_alive_count));
        *entry.task.lock() = Some(handle);
        self.subscriptions.insert(id, entry);
        self.stats.subscriptions_created.fetch_add(1, Ordering::Relaxed);

        info!(subscription = %id, interval_ms = publishing_interval.as_millis() as u64, "Created subscription");
        Ok(id)
    }

    /// Adds a monitored item for `node_id`.
    ///
    /// `initial` is the node's current value; it is queued as the first
    /// notification of the item.
    pub fn create_monitored_item(
        &self,
        subscription_id: SubscriptionId,
        node_id: NodeId,
        initial: DataValue,
    ) -> UaResult<MonitoredItemId> {
        let entry = self.entry(subscription_id)?;
        let id = MonitoredItemId(self.next_item_id.fetch_add(1, Ordering::Relaxed));
        let client_handle = id.value();

        entry.enqueue(id, &node_id, client_handle, &initial);
        self.stats.notifications_queued.fetch_add(1, Ordering::Relaxed);

        debug!(subscription = %subscription_id, item = %id, node_id = %node_id, "Created monitored item");
        entry.items.lock().insert(
            id,
            MonitoredItem {
                node_id,
                client_handle,
                last_value: initial.value,
            },
        );
        Ok(id)
    }

    /// Removes monitored items. Unknown ids fail without removing anything.
    pub fn delete_monitored_items(
        &self,
        subscription_id: SubscriptionId,
        items: &[MonitoredItemId],
    ) -> UaResult<()> {
        let entry = self.entry(subscription_id)?;
        let mut map = entry.items.lock();
        if let Some(missing) = items.iter().find(|id| !map.contains_key(id)) {
            return Err(SubscriptionError::monitored_item_not_found(missing.value()).into());
        }
        for id in items {
            map.remove(id);
        }
        debug!(subscription = %subscription_id, count = items.len(), "Deleted monitored items");
        Ok(())
    }

    /// Deletes a subscription and stops its publishing task.
    ///
    /// Notifications still queued are discarded.
    pub fn delete_subscription(&self, subscription_id: SubscriptionId) -> UaResult<()> {
        let (_, entry) = self
            .subscriptions
            .remove(&subscription_id)
            .ok_or_else(|| UaError::from(SubscriptionError::not_found(subscription_id.value())))?;
        entry.token.cancel();
        entry.queue.lock().clear();
        self.stats.subscriptions_deleted.fetch_add(1, Ordering::Relaxed);
        info!(subscription = %subscription_id, "Deleted subscription");
        Ok(())
    }

    /// Deletes every subscription.
    pub fn shutdown(&self) {
        let ids: Vec<SubscriptionId> = self.subscriptions.iter().map(|e| *e.key()).collect();
        for id in ids {
            let _ = self.delete_subscription(id);
        }
    }

    /// Queues a notification for every monitored item on `node_id` whose
    /// value differs from the last one reported.
    pub fn notify_data_change(&self, node_id: &NodeId, value: &DataValue) -> usize {
        let mut queued = 0;
        for entry in self.subscriptions.iter() {
            let mut items = entry.items.lock();
            for (id, item) in items.iter_mut() {
                if &item.node_id != node_id || item.last_value == value.value {
                    continue;
                }
                item.last_value = value.value.clone();
                entry.enqueue(*id, node_id, item.client_handle, value);
                queued += 1;
            }
        }
        if queued > 0 {
            self.stats
                .notifications_queued
                .fetch_add(queued as u64, Ordering::Relaxed);
            trace!(node_id = %node_id, queued = queued, "Queued data change");
        }
        queued
    }

    /// Queues an event notification on every subscription.
    pub fn raise_event(&self, event: EventNotification) {
        for entry in self.subscriptions.iter() {
            entry.queue.lock().push_back(Queued::Event(event.clone()));
        }
        self.stats.events_raised.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if the subscription exists.
    pub fn contains(&self, subscription_id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&subscription_id)
    }

    /// Returns statistics for one subscription.
    pub fn subscription_stats(&self, subscription_id: SubscriptionId) -> UaResult<SubscriptionStats> {
        let entry = self.entry(subscription_id)?;
        let stats = SubscriptionStats {
            id: entry.id,
            monitored_item_count: entry.items.lock().len(),
            notification_count: entry.published.load(Ordering::Relaxed),
            queued: entry.queue.lock().len(),
            created_at: entry.created_at,
            last_publish: *entry.last_publish.lock(),
            publishing_interval: entry.publishing_interval,
        };
        Ok(stats)
    }

    /// Returns service-wide counters.
    pub fn stats(&self) -> &SubscriptionServiceStats {
        &self.stats
    }

    fn entry(&self, subscription_id: SubscriptionId) -> UaResult<Arc<SubscriptionEntry>> {
        self.subscriptions
            .get(&subscription_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| SubscriptionError::not_found(subscription_id.value()).into())
    }
}

impl Default for SubscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionService {
    fn drop(&mut self) {
        for entry in self.subscriptions.iter() {
            entry.token.cancel();
            if let Some(task) = entry.task.lock().take() {
                task.abort();
            }
        }
    }
}

impl fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("subscriptions", &self.subscriptions.len())
            .field("keep_alive_count", &self.keep_alive_count)
            .finish()
    }
}

// =============================================================================
// Publishing Task
// =============================================================================

async fn run_publisher(entry: Arc<SubscriptionEntry>, keep_alive_count: u32) {
    let mut ticker = tokio::time::interval(entry.publishing_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut idle_cycles = 0u32;

    entry
        .callback
        .on_state_change(entry.id, SubscriptionState::Active)
        .await;

    'publish: loop {
        tokio::select! {
            _ = entry.token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let batch: Vec<Queued> = entry.queue.lock().drain(..).collect();
        if batch.is_empty() {
            idle_cycles += 1;
            if idle_cycles >= keep_alive_count {
                idle_cycles = 0;
                entry.callback.on_keep_alive(entry.id).await;
            }
            continue;
        }

        idle_cycles = 0;
        *entry.last_publish.lock() = Some(Utc::now());
        for queued in batch {
            if entry.token.is_cancelled() {
                break 'publish;
            }
            match queued {
                Queued::Data(notification) => {
                    trace!(
                        subscription = %entry.id,
                        sequence = notification.sequence_number,
                        "Publishing data change"
                    );
                    entry.callback.on_data_change(notification).await;
                }
                Queued::Event(event) => entry.callback.on_event(entry.id, event).await,
            }
            entry.published.fetch_add(1, Ordering::Relaxed);
        }
    }

    entry
        .callback
        .on_state_change(entry.id, SubscriptionState::Deleted)
        .await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use uawatch_core::MemorySink;

    fn node() -> NodeId {
        NodeId::string(2, "temperature")
    }

    #[derive(Default)]
    struct Counting {
        keep_alives: AtomicUsize,
        events: AtomicUsize,
        states: Mutex<Vec<SubscriptionState>>,
    }

    #[async_trait]
    impl SubscriptionCallback for Counting {
        async fn on_data_change(&self, _notification: DataChangeNotification) {}

        async fn on_event(&self, _id: SubscriptionId, _event: EventNotification) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_keep_alive(&self, _id: SubscriptionId) {
            self.keep_alives.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_state_change(&self, _id: SubscriptionId, state: SubscriptionState) {
            self.states.lock().push(state);
        }
    }

    #[test]
    fn test_id_display() {
        assert_eq!(SubscriptionId(3).to_string(), "sub-3");
        assert_eq!(MonitoredItemId(7).to_string(), "mi-7");
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let service = SubscriptionService::new();
        let (callback, _rx) = ChannelCallback::with_channel(4);
        let err = service
            .create_subscription(Duration::ZERO, Arc::new(callback))
            .unwrap_err();
        assert!(matches!(
            err,
            UaError::Subscription(SubscriptionError::InvalidInterval { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_and_changed_values_only() {
        let service = SubscriptionService::new();
        let (callback, mut rx) = ChannelCallback::with_channel(16);
        let sub = service
            .create_subscription(Duration::from_millis(100), Arc::new(callback))
            .unwrap();
        let item = service
            .create_monitored_item(sub, node(), DataValue::now(Value::Float(22.5)))
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.value, Value::Float(22.5));
        assert_eq!(first.monitored_item_id, item);
        assert_eq!(first.sequence_number, 1);

        assert_eq!(service.notify_data_change(&node(), &DataValue::now(Value::Float(22.5))), 0);
        assert_eq!(service.notify_data_change(&node(), &DataValue::now(Value::Float(25.0))), 1);
        assert_eq!(
            service.notify_data_change(&NodeId::string(2, "counter"), &DataValue::now(Value::Int32(1))),
            0
        );

        let second = rx.recv().await.unwrap();
        assert_eq!(second.value, Value::Float(25.0));
        assert_eq!(second.sequence_number, 2);
        assert_eq!(second.client_handle, item.value());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_delivered_in_order() {
        let service = SubscriptionService::new();
        let (callback, mut rx) = ChannelCallback::with_channel(16);
        let sub = service
            .create_subscription(Duration::from_millis(100), Arc::new(callback))
            .unwrap();
        service
            .create_monitored_item(sub, node(), DataValue::now(Value::Float(0.0)))
            .unwrap();
        for i in 1..=3 {
            service.notify_data_change(&node(), &DataValue::now(Value::Float(i as f32)));
        }

        let mut values = Vec::new();
        for _ in 0..4 {
            values.push(rx.recv().await.unwrap().value);
        }
        assert_eq!(
            values,
            vec![Value::Float(0.0), Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_and_events() {
        let service = SubscriptionService::with_keep_alive_count(2);
        let callback = Arc::new(Counting::default());
        let sub = service
            .create_subscription(Duration::from_millis(50), callback.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_millis(275)).await;
        assert!(callback.keep_alives.load(Ordering::SeqCst) >= 2);

        service.raise_event(EventNotification::new(NodeId::SERVER, "overheat", 700));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(callback.events.load(Ordering::SeqCst), 1);

        service.delete_subscription(sub).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            *callback.states.lock(),
            vec![SubscriptionState::Active, SubscriptionState::Deleted]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_subscription_stops_delivery() {
        let service = SubscriptionService::new();
        let (callback, mut rx) = ChannelCallback::with_channel(16);
        let sub = service
            .create_subscription(Duration::from_millis(100), Arc::new(callback))
            .unwrap();
        service
            .create_monitored_item(sub, node(), DataValue::now(Value::Float(0.0)))
            .unwrap();
        rx.recv().await.unwrap();

        service.delete_subscription(sub).unwrap();
        assert!(!service.contains(sub));
        assert_eq!(service.notify_data_change(&node(), &DataValue::now(Value::Float(9.0))), 0);

        // The publisher drops its callback (and sender) when it exits.
        assert!(rx.recv().await.is_none());

        let err = service.delete_subscription(sub).unwrap_err();
        assert!(matches!(
            err,
            UaError::Subscription(SubscriptionError::NotFound { .. })
        ));
        assert_eq!(service.stats().subscriptions_deleted(), 1);
    }

    #[tokio::test]
    async fn test_delete_monitored_items() {
        let service = SubscriptionService::new();
        let (callback, _rx) = ChannelCallback::with_channel(16);
        let sub = service
            .create_subscription(Duration::from_millis(100), Arc::new(callback))
            .unwrap();
        let item = service
            .create_monitored_item(sub, node(), DataValue::now(Value::Float(0.0)))
            .unwrap();

        assert!(service
            .delete_monitored_items(sub, &[MonitoredItemId(999)])
            .is_err());
        service.delete_monitored_items(sub, &[item]).unwrap();
        assert_eq!(service.subscription_stats(sub).unwrap().monitored_item_count, 0);
        assert_eq!(service.notify_data_change(&node(), &DataValue::now(Value::Float(1.0))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_callback_feeds_router() {
        let sink = MemorySink::new();
        let router = Arc::new(NotificationRouter::with_sink(Arc::new(sink.clone())));
        let (listener, mut rx) = uawatch_core::ChannelListener::with_channel("ack", 8);
        router.set_watched_key("temperature");
        router.add_listener(Arc::new(listener));

        let service = SubscriptionService::new();
        let sub = service
            .create_subscription(
                Duration::from_millis(100),
                Arc::new(RouterCallback::new(router.clone())),
            )
            .unwrap();
        service
            .create_monitored_item(sub, node(), DataValue::now(Value::Float(22.5)))
            .unwrap();
        service
            .create_monitored_item(sub, NodeId::string(2, "counter"), DataValue::now(Value::Int32(0)))
            .unwrap();

        let (key, value) = rx.recv().await.unwrap();
        assert_eq!(key, "temperature");
        assert_eq!(value, Value::Float(22.5));

        service.raise_event(EventNotification::new(NodeId::SERVER, "hello", 100));
        service.notify_data_change(&node(), &DataValue::now(Value::Float(30.5)));
        let (_, value) = rx.recv().await.unwrap();
        assert_eq!(value, Value::Float(30.5));

        let stats = router.stats().snapshot();
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.events, 1);
        assert_eq!(sink.events().len(), 1);
    }
}
