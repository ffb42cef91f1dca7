// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed data-change notification router.
//!
//! The router sits between the subscription transport and application code.
//! It holds one watched variable key and an ordered list of listeners. Every
//! data change whose key equals the watched key is fanned out to all
//! listeners, in registration order, with each listener isolated from the
//! failures of the others.
//!
//! # Dispatch
//!
//! ```text
//! ChangeEvent ──► on_notification ──► logical key ──► on_change
//!                       │                                 │
//!                  Malformed                 key == watched_key ?
//!                                             │             │
//!                                          Filtered     L1 → L2 → … → Ln
//!                                                     (spawned, timed, isolated)
//! ```
//!
//! Each listener runs on its own tokio task which is awaited before the next
//! one starts. A listener that errors, panics or exceeds the
//! [`DispatchPolicy`] timeout is reported to the [`DiagnosticSink`] and the
//! dispatch moves on. Nothing is ever returned to the transport as an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uawatch_core::{FnListener, NotificationRouter, Value};
//!
//! # async fn demo() {
//! let router = Arc::new(NotificationRouter::new());
//! router.set_watched_key("temperature");
//! router.add_listener(FnListener::shared("print", |key, value| {
//!     println!("{key} changed to {value}");
//!     Ok(())
//! }));
//!
//! router.on_change("temperature", &Value::Float(25.5)).await;
//! # }
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{DispatchError, ListenerError};
use crate::event::{ChangeEvent, EventNotification};
use crate::listener::{FnListener, Listener};
use crate::types::Value;

/// Default per-listener time limit.
pub const DEFAULT_LISTENER_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// DispatchPolicy
// =============================================================================

/// Limits applied to listener invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Time limit for a single listener invocation. `None` waits forever.
    pub listener_timeout: Option<Duration>,
}

impl DispatchPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds each listener invocation by `timeout`.
    pub fn with_listener_timeout(mut self, timeout: Duration) -> Self {
        self.listener_timeout = Some(timeout);
        self
    }

    /// Disables the listener time limit.
    pub fn without_timeout(mut self) -> Self {
        self.listener_timeout = None;
        self
    }

    /// Creates a policy from a millisecond limit, where 0 disables it.
    pub fn from_millis(millis: u64) -> Self {
        Self {
            listener_timeout: (millis > 0).then(|| Duration::from_millis(millis)),
        }
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            listener_timeout: Some(DEFAULT_LISTENER_TIMEOUT),
        }
    }
}

// =============================================================================
// DispatchOutcome
// =============================================================================

/// What a single dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No watched key, or the key did not match. No listener ran.
    Filtered,

    /// Every registered listener was invoked.
    Dispatched {
        /// Listeners invoked.
        invoked: usize,
        /// Listeners that failed.
        failed: usize,
    },

    /// The notification carried no usable key.
    Malformed,

    /// Dispatch stopped before all listeners ran.
    Cancelled {
        /// Listeners that completed before cancellation.
        invoked: usize,
    },
}

impl DispatchOutcome {
    /// Returns `true` if listeners were dispatched to.
    #[inline]
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }

    /// Returns the number of listeners that ran.
    pub fn invoked(&self) -> usize {
        match self {
            Self::Dispatched { invoked, .. } | Self::Cancelled { invoked } => *invoked,
            Self::Filtered | Self::Malformed => 0,
        }
    }
}

// =============================================================================
// RouterStats
// =============================================================================

/// Router counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    notifications: AtomicU64,
    filtered: AtomicU64,
    dispatched: AtomicU64,
    listener_invocations: AtomicU64,
    listener_failures: AtomicU64,
    malformed: AtomicU64,
    cancelled: AtomicU64,
    events: AtomicU64,
}

impl RouterStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            notifications: self.notifications.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            listener_invocations: self.listener_invocations.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStatsSnapshot {
    /// Data changes received (filtered, dispatched, malformed or cancelled).
    pub notifications: u64,
    /// Changes ignored by the key filter.
    pub filtered: u64,
    /// Changes fanned out to listeners.
    pub dispatched: u64,
    /// Individual listener invocations.
    pub listener_invocations: u64,
    /// Failed listener invocations.
    pub listener_failures: u64,
    /// Notifications without a usable key.
    pub malformed: u64,
    /// Cancelled dispatches.
    pub cancelled: u64,
    /// Non-data-change events received.
    pub events: u64,
}

// =============================================================================
// NotificationRouter
// =============================================================================

/// Filters data changes by variable key and fans them out to listeners.
///
/// Dispatch must be awaited from within a tokio runtime: every listener runs
/// on a spawned task.
///
/// # Panics
///
/// [`on_change`](Self::on_change), [`on_change_cancellable`](Self::on_change_cancellable)
/// and [`on_notification`](Self::on_notification) panic when polled outside a
/// tokio runtime and a listener is due to run.
pub struct NotificationRouter {
    watched_key: RwLock<Option<String>>,
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
    sink: Arc<dyn DiagnosticSink>,
    policy: DispatchPolicy,
    stats: RouterStats,
}

enum Invocation {
    Completed(Result<(), ListenerError>),
    Cancelled,
}

impl NotificationRouter {
    /// Creates a router with no watched key, no listeners and a [`TracingSink`].
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink::new()))
    }

    /// Creates a router reporting to `sink`.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            watched_key: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
            sink,
            policy: DispatchPolicy::default(),
            stats: RouterStats::default(),
        }
    }

    /// Returns a builder.
    pub fn builder() -> NotificationRouterBuilder {
        NotificationRouterBuilder::new()
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Sets the variable key to react to. Last write wins.
    ///
    /// Only dispatches that start after this call see the new key.
    pub fn set_watched_key(&self, key: impl Into<String>) {
        let key = key.into();
        info!(key = %key, "Set monitored variable: {}", key);
        *self.watched_key.write() = Some(key);
    }

    /// Clears the watched key. Every notification is then filtered.
    pub fn clear_watched_key(&self) {
        debug!("Cleared monitored variable");
        *self.watched_key.write() = None;
    }

    /// Returns the current watched key.
    pub fn watched_key(&self) -> Option<String> {
        self.watched_key.read().clone()
    }

    /// Appends a listener. Duplicates are allowed and invoked once per entry.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        info!(listener = %listener.name(), "Registered listener: {}", listener.name());
        self.listeners.write().push(listener);
    }

    /// Appends a closure listener.
    pub fn add_fn_listener<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&str, &Value) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.add_listener(FnListener::shared(name, func));
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns the dispatch policy.
    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Returns the router counters.
    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Handles a raw change notification from the subscription transport.
    ///
    /// The key comes from the monitored item in the payload. A payload with
    /// no usable key is reported as a malformed event.
    pub async fn on_notification(&self, event: &ChangeEvent) -> DispatchOutcome {
        match event.logical_key() {
            Ok(key) => {
                info!(key = %key, value = %event.value, "Variable changed: {} = {}", key, event.value);
                self.on_change(&key, &event.value).await
            }
            Err(error) => {
                RouterStats::inc(&self.stats.notifications);
                RouterStats::inc(&self.stats.malformed);
                self.report(None, error);
                DispatchOutcome::Malformed
            }
        }
    }

    /// Dispatches a change of `changed_key` to every listener if it is the
    /// watched key.
    pub async fn on_change(&self, changed_key: &str, value: &Value) -> DispatchOutcome {
        self.dispatch(changed_key, value, None).await
    }

    /// Like [`on_change`](Self::on_change), but stops as soon as `token` is
    /// cancelled. A listener still running at that point is aborted.
    pub async fn on_change_cancellable(
        &self,
        changed_key: &str,
        value: &Value,
        token: &CancellationToken,
    ) -> DispatchOutcome {
        self.dispatch(changed_key, value, Some(token)).await
    }

    /// Handles a non-data-change event. Never dispatches to listeners.
    pub fn on_event(&self, event: EventNotification) {
        RouterStats::inc(&self.stats.events);
        self.sink.record(&Diagnostic::Event(event));
    }

    async fn dispatch(
        &self,
        changed_key: &str,
        value: &Value,
        token: Option<&CancellationToken>,
    ) -> DispatchOutcome {
        RouterStats::inc(&self.stats.notifications);

        let matches = self.watched_key.read().as_deref() == Some(changed_key);
        if !matches {
            trace!(key = %changed_key, "Change filtered");
            RouterStats::inc(&self.stats.filtered);
            return DispatchOutcome::Filtered;
        }

        let listeners: Vec<Arc<dyn Listener>> = self.listeners.read().clone();
        info!(
            key = %changed_key,
            listeners = listeners.len(),
            "Monitored variable {} changed to {}",
            changed_key,
            value
        );

        let mut invoked = 0;
        let mut failed = 0;

        for listener in listeners {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return self.cancelled(changed_key, invoked);
            }

            let name = listener.name().to_string();
            match self.invoke(listener, changed_key, value, token).await {
                Invocation::Cancelled => return self.cancelled(changed_key, invoked),
                Invocation::Completed(result) => {
                    invoked += 1;
                    RouterStats::inc(&self.stats.listener_invocations);
                    match result {
                        Ok(()) => debug!(listener = %name, "Called listener: {}", name),
                        Err(cause) => {
                            failed += 1;
                            RouterStats::inc(&self.stats.listener_failures);
                            self.report(
                                Some(changed_key),
                                DispatchError::listener_failure(name, cause),
                            );
                        }
                    }
                }
            }
        }

        RouterStats::inc(&self.stats.dispatched);
        DispatchOutcome::Dispatched { invoked, failed }
    }

    async fn invoke(
        &self,
        listener: Arc<dyn Listener>,
        key: &str,
        value: &Value,
        token: Option<&CancellationToken>,
    ) -> Invocation {
        let key = key.to_string();
        let value = value.clone();
        let handle = tokio::spawn(async move { listener.on_change(&key, &value).await });
        let abort = handle.abort_handle();

        let limit = self.policy.listener_timeout;
        let join = async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, handle)
                    .await
                    .map_err(|_| limit),
                None => Ok(handle.await),
            }
        };

        let joined = match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    abort.abort();
                    return Invocation::Cancelled;
                }
                joined = join => joined,
            },
            None => join.await,
        };

        match joined {
            Ok(Ok(result)) => Invocation::Completed(result),
            Ok(Err(join_error)) => Invocation::Completed(Err(join_failure(join_error))),
            Err(limit) => {
                abort.abort();
                Invocation::Completed(Err(ListenerError::TimedOut(limit)))
            }
        }
    }

    fn cancelled(&self, key: &str, invoked: usize) -> DispatchOutcome {
        RouterStats::inc(&self.stats.cancelled);
        self.report(Some(key), DispatchError::Cancelled { invoked });
        DispatchOutcome::Cancelled { invoked }
    }

    fn report(&self, key: Option<&str>, error: DispatchError) {
        self.sink.record(&Diagnostic::from_error(key, error));
    }
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationRouter")
            .field("watched_key", &*self.watched_key.read())
            .field("listeners", &self.listener_count())
            .field("sink", &self.sink.name())
            .field("policy", &self.policy)
            .finish()
    }
}

fn join_failure(error: JoinError) -> ListenerError {
    if error.is_panic() {
        ListenerError::Panicked(panic_message(error.into_panic()))
    } else {
        ListenerError::new("listener task was cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// =============================================================================
// NotificationRouterBuilder
// =============================================================================

/// Builder for [`NotificationRouter`].
#[derive(Default)]
pub struct NotificationRouterBuilder {
    watched_key: Option<String>,
    listeners: Vec<Arc<dyn Listener>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    policy: DispatchPolicy,
}

impl NotificationRouterBuilder {
    /// Creates a builder with the default policy and a tracing sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial watched key.
    pub fn watched_key(mut self, key: impl Into<String>) -> Self {
        self.watched_key = Some(key.into());
        self
    }

    /// Appends a listener.
    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Sets the diagnostic sink.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the dispatch policy.
    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the per-listener timeout.
    pub fn listener_timeout(mut self, timeout: Duration) -> Self {
        self.policy.listener_timeout = Some(timeout);
        self
    }

    /// Builds the router.
    pub fn build(self) -> NotificationRouter {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink::new()));
        NotificationRouter {
            watched_key: RwLock::new(self.watched_key),
            listeners: RwLock::new(self.listeners),
            sink,
            policy: self.policy,
            stats: RouterStats::default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::event::{MonitoredItemRef, NotificationPayload};
    use crate::node::NodeId;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    type Calls = Arc<Mutex<Vec<(String, String, Value)>>>;

    /// Records `(listener, key, value)` into a shared log, optionally failing.
    struct Recorder {
        name: String,
        calls: Calls,
        fail: bool,
    }

    impl Recorder {
        fn new(name: &str, calls: &Calls) -> Arc<dyn Listener> {
            Arc::new(Self {
                name: name.to_string(),
                calls: calls.clone(),
                fail: false,
            })
        }

        fn failing(name: &str, calls: &Calls) -> Arc<dyn Listener> {
            Arc::new(Self {
                name: name.to_string(),
                calls: calls.clone(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Listener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
            self.calls
                .lock()
                .push((self.name.clone(), key.to_string(), value.clone()));
            if self.fail {
                Err(ListenerError::new("listener rejected value"))
            } else {
                Ok(())
            }
        }
    }

    struct Panicking;

    #[async_trait]
    impl Listener for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn on_change(&self, _key: &str, _value: &Value) -> Result<(), ListenerError> {
            panic!("listener exploded");
        }
    }

    struct Sleeper(Duration);

    #[async_trait]
    impl Listener for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn on_change(&self, _key: &str, _value: &Value) -> Result<(), ListenerError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn router_with_memory() -> (NotificationRouter, MemorySink) {
        let sink = MemorySink::new();
        let router = NotificationRouter::with_sink(Arc::new(sink.clone()));
        (router, sink)
    }

    fn names(calls: &Calls) -> Vec<String> {
        calls.lock().iter().map(|(n, _, _)| n.clone()).collect()
    }

    #[tokio::test]
    async fn test_non_matching_key_invokes_nothing() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));

        let outcome = router.on_change("counter", &Value::Int32(42)).await;

        assert_eq!(outcome, DispatchOutcome::Filtered);
        assert!(calls.lock().is_empty());
        assert!(sink.is_empty());
        assert_eq!(router.stats().snapshot().filtered, 1);
    }

    #[tokio::test]
    async fn test_no_watched_key_filters_everything() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.add_listener(Recorder::new("l1", &calls));

        assert_eq!(
            router.on_change("temperature", &Value::Float(1.0)).await,
            DispatchOutcome::Filtered
        );
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_matching_key_invokes_all_in_order() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        for name in ["l1", "l2", "l3"] {
            router.add_listener(Recorder::new(name, &calls));
        }

        let outcome = router.on_change("temperature", &Value::Float(22.5)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 3, failed: 0 });
        assert_eq!(names(&calls), vec!["l1", "l2", "l3"]);
        for (_, key, value) in calls.lock().iter() {
            assert_eq!(key, "temperature");
            assert_eq!(value, &Value::Float(22.5));
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_skip_later_listeners() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));
        router.add_listener(Recorder::failing("l2", &calls));
        router.add_listener(Recorder::new("l3", &calls));

        let outcome = router.on_change("temperature", &Value::Float(30.0)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 3, failed: 1 });
        assert_eq!(names(&calls), vec!["l1", "l2", "l3"]);

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].listener(), Some("l2"));
        assert_eq!(router.stats().snapshot().listener_failures, 1);
    }

    #[tokio::test]
    async fn test_failing_first_listener_scenario() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::failing("l1", &calls));
        router.add_listener(Recorder::new("l2", &calls));

        router.on_change("temperature", &Value::Float(25.5)).await;

        let recorded = calls.lock().clone();
        assert_eq!(
            recorded[1],
            ("l2".to_string(), "temperature".to_string(), Value::Float(25.5))
        );
        match &sink.failures()[0] {
            Diagnostic::ListenerFailure { listener, key, .. } => {
                assert_eq!(listener, "l1");
                assert_eq!(key, "temperature");
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_listener_is_isolated() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Arc::new(Panicking));
        router.add_listener(Recorder::new("after", &calls));

        let outcome = router.on_change("temperature", &Value::Float(1.0)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 2, failed: 1 });
        assert_eq!(names(&calls), vec!["after"]);
        match &sink.failures()[0] {
            Diagnostic::ListenerFailure { cause, .. } => {
                assert!(cause.is_panic());
                assert!(cause.to_string().contains("listener exploded"));
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_listener_times_out() {
        let sink = MemorySink::new();
        let calls = Calls::default();
        let router = NotificationRouter::builder()
            .watched_key("temperature")
            .sink(Arc::new(sink.clone()))
            .listener_timeout(Duration::from_millis(50))
            .listener(Arc::new(Sleeper(Duration::from_secs(60))))
            .listener(Recorder::new("after", &calls))
            .build();

        let outcome = router.on_change("temperature", &Value::Float(1.0)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 2, failed: 1 });
        assert_eq!(names(&calls), vec!["after"]);
        match &sink.failures()[0] {
            Diagnostic::ListenerFailure { listener, cause, .. } => {
                assert_eq!(listener, "sleeper");
                assert!(cause.is_timeout());
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    fn poll_once<F: std::future::Future>(fut: F) -> std::task::Poll<F::Output> {
        struct NoopWake;
        impl std::task::Wake for NoopWake {
            fn wake(self: Arc<Self>) {}
        }
        let waker = std::task::Waker::from(Arc::new(NoopWake));
        let mut cx = std::task::Context::from_waker(&waker);
        let mut fut = std::pin::pin!(fut);
        std::future::Future::poll(fut.as_mut(), &mut cx)
    }

    #[test]
    fn test_filtered_change_needs_no_runtime() {
        let router = NotificationRouter::new();
        router.set_watched_key("temperature");
        router.add_fn_listener("noop", |_, _| Ok(()));

        let poll = poll_once(router.on_change("counter", &Value::Int32(1)));
        assert_eq!(poll, std::task::Poll::Ready(DispatchOutcome::Filtered));
    }

    #[test]
    #[should_panic]
    fn test_dispatch_outside_runtime_panics() {
        let router = NotificationRouter::new();
        router.set_watched_key("temperature");
        router.add_fn_listener("noop", |_, _| Ok(()));

        let _ = poll_once(router.on_change("temperature", &Value::Float(1.0)));
    }

    #[tokio::test]
    async fn test_blocking_closure_times_out() {
        let sink = MemorySink::new();
        let calls = Calls::default();
        let router = NotificationRouter::builder()
            .watched_key("temperature")
            .sink(Arc::new(sink.clone()))
            .listener_timeout(Duration::from_millis(50))
            .listener(FnListener::shared("blocking", |_, _| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            }))
            .listener(Recorder::new("after", &calls))
            .build();

        let started = std::time::Instant::now();
        let outcome = router.on_change("temperature", &Value::Float(1.0)).await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 2, failed: 1 });
        assert_eq!(names(&calls), vec!["after"]);
        match &sink.failures()[0] {
            Diagnostic::ListenerFailure { listener, cause, .. } => {
                assert_eq!(listener, "blocking");
                assert!(cause.is_timeout());
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_closure_is_reported_as_panic() {
        let (router, sink) = router_with_memory();
        router.set_watched_key("temperature");
        router.add_fn_listener("boom", |_, _| panic!("closure exploded"));

        let outcome = router.on_change("temperature", &Value::Float(1.0)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 1, failed: 1 });
        match &sink.failures()[0] {
            Diagnostic::ListenerFailure { cause, .. } => {
                assert!(cause.is_panic());
                assert!(cause.to_string().contains("closure exploded"));
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_newly_added_listener_is_included() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));
        router.on_change("temperature", &Value::Float(1.0)).await;

        router.add_listener(Recorder::new("l2", &calls));
        let outcome = router.on_change("temperature", &Value::Float(2.0)).await;

        assert_eq!(outcome.invoked(), 2);
        assert_eq!(names(&calls), vec!["l1", "l1", "l2"]);
    }

    #[tokio::test]
    async fn test_duplicate_listener_invoked_per_entry() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        let listener = Recorder::new("dup", &calls);
        router.set_watched_key("temperature");
        router.add_listener(listener.clone());
        router.add_listener(listener);

        router.on_change("temperature", &Value::Float(1.0)).await;
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_set_watched_key_idempotent_and_last_wins() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.add_listener(Recorder::new("l1", &calls));

        router.set_watched_key("temperature");
        router.set_watched_key("temperature");
        assert_eq!(router.watched_key().as_deref(), Some("temperature"));
        router.on_change("temperature", &Value::Float(1.0)).await;
        assert_eq!(calls.lock().len(), 1);

        router.set_watched_key("counter");
        assert_eq!(
            router.on_change("temperature", &Value::Float(2.0)).await,
            DispatchOutcome::Filtered
        );
        assert!(router.on_change("counter", &Value::Int32(1)).await.is_dispatched());

        router.clear_watched_key();
        assert_eq!(
            router.on_change("counter", &Value::Int32(2)).await,
            DispatchOutcome::Filtered
        );
    }

    #[tokio::test]
    async fn test_zero_listeners_is_noop() {
        let (router, sink) = router_with_memory();
        router.set_watched_key("temperature");

        let outcome = router.on_change("temperature", &Value::Float(1.0)).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 0, failed: 0 });
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_on_notification_extracts_key() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));

        let event = ChangeEvent::data_change(NodeId::string(2, "temperature"), 1, Value::Float(25.5));
        assert!(router.on_notification(&event).await.is_dispatched());

        let event = ChangeEvent::data_change(NodeId::string(2, "counter"), 2, Value::Int32(42));
        assert_eq!(router.on_notification(&event).await, DispatchOutcome::Filtered);

        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_notification() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));

        let event = ChangeEvent::with_payload(
            NodeId::string(2, "temperature"),
            Value::Float(1.0),
            NotificationPayload::Other {
                description: "status_change".into(),
            },
        );
        assert_eq!(router.on_notification(&event).await, DispatchOutcome::Malformed);

        let event = ChangeEvent::with_payload(
            NodeId::string(2, "temperature"),
            Value::Float(1.0),
            NotificationPayload::DataChange {
                monitored_item: MonitoredItemRef::new(NodeId::string(2, ""), 1),
            },
        );
        assert_eq!(router.on_notification(&event).await, DispatchOutcome::Malformed);

        assert!(calls.lock().is_empty());
        assert_eq!(sink.failures().len(), 2);
        assert_eq!(sink.failures()[0].kind(), "malformed_event");
        assert_eq!(router.stats().snapshot().malformed, 2);
    }

    #[tokio::test]
    async fn test_on_event_records_without_dispatch() {
        let (router, sink) = router_with_memory();
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();
        router.set_watched_key("temperature");
        router.add_fn_listener("count", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        router.on_event(EventNotification::new(NodeId::SERVER, "overheat", 800));

        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(sink.events()[0].message, "overheat");
        assert_eq!(router.stats().snapshot().events, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let (router, sink) = router_with_memory();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));

        let token = CancellationToken::new();
        token.cancel();
        let outcome = router
            .on_change_cancellable("temperature", &Value::Float(1.0), &token)
            .await;

        assert_eq!(outcome, DispatchOutcome::Cancelled { invoked: 0 });
        assert!(calls.lock().is_empty());
        assert_eq!(sink.entries()[0].kind(), "cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_running_listener() {
        let router = Arc::new(
            NotificationRouter::builder()
                .watched_key("temperature")
                .policy(DispatchPolicy::new().without_timeout())
                .build(),
        );
        let calls = Calls::default();
        router.add_listener(Recorder::new("l1", &calls));
        router.add_listener(Arc::new(Sleeper(Duration::from_secs(3600))));
        router.add_listener(Recorder::new("l3", &calls));

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let outcome = router
            .on_change_cancellable("temperature", &Value::Float(1.0), &token)
            .await;

        assert_eq!(outcome, DispatchOutcome::Cancelled { invoked: 1 });
        assert_eq!(names(&calls), vec!["l1"]);
        assert_eq!(router.stats().snapshot().cancelled, 1);
    }

    #[tokio::test]
    async fn test_uncancelled_token_dispatches_fully() {
        let router = NotificationRouter::new();
        let calls = Calls::default();
        router.set_watched_key("temperature");
        router.add_listener(Recorder::new("l1", &calls));

        let token = CancellationToken::new();
        let outcome = router
            .on_change_cancellable("temperature", &Value::Float(1.0), &token)
            .await;
        assert_eq!(outcome, DispatchOutcome::Dispatched { invoked: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_concurrent_registration_and_dispatch() {
        let router = Arc::new(NotificationRouter::new());
        router.set_watched_key("temperature");

        let mut tasks = Vec::new();
        for i in 0..8 {
            let router = router.clone();
            tasks.push(tokio::spawn(async move {
                router.add_fn_listener(format!("l{i}"), |_, _| Ok(()));
                router.on_change("temperature", &Value::Int32(i)).await
            }));
        }
        for task in tasks {
            let outcome = task.await.unwrap();
            assert!(outcome.is_dispatched());
            assert!(outcome.invoked() >= 1);
        }
        assert_eq!(router.listener_count(), 8);
    }

    #[test]
    fn test_policy_from_millis() {
        assert_eq!(DispatchPolicy::from_millis(0).listener_timeout, None);
        assert_eq!(
            DispatchPolicy::from_millis(250).listener_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            DispatchPolicy::default().listener_timeout,
            Some(DEFAULT_LISTENER_TIMEOUT)
        );
    }
}
