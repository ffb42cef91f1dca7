// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Listener capability invoked by the router.
//!
//! A listener receives `(key, value)` for every change of the watched
//! variable. Implement [`Listener`] directly for stateful or async handlers,
//! or wrap a plain closure with [`FnListener`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ListenerError;
use crate::types::Value;

// =============================================================================
// Listener Trait
// =============================================================================

/// Handler for changes of the watched variable.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Identity used in diagnostics. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called with the variable key and its new value.
    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError>;
}

// =============================================================================
// FnListener
// =============================================================================

/// Adapts a synchronous closure into a [`Listener`].
///
/// The closure runs on tokio's blocking pool, so a closure that blocks the
/// thread is still bounded by the router's listener timeout. A timed-out
/// closure is abandoned, not interrupted: it keeps its blocking thread until
/// it returns.
///
/// # Example
///
/// ```
/// use uawatch_core::listener::FnListener;
///
/// let listener = FnListener::new("print", |key, value| {
///     println!("{key} = {value}");
///     Ok(())
/// });
/// ```
pub struct FnListener<F> {
    name: String,
    func: Arc<F>,
}

impl<F> FnListener<F>
where
    F: Fn(&str, &Value) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    /// Creates a named closure listener.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Creates the listener already wrapped for registration.
    pub fn shared(name: impl Into<String>, func: F) -> Arc<dyn Listener> {
        Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&str, &Value) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
        let func = Arc::clone(&self.func);
        let key = key.to_string();
        let value = value.clone();
        match tokio::task::spawn_blocking(move || (*func)(&key, &value)).await {
            Ok(result) => result,
            // Re-raised so the router reports it as a panic.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ListenerError::new("blocking listener was cancelled")),
        }
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").field("name", &self.name).finish()
    }
}

// =============================================================================
// ChannelListener
// =============================================================================

/// Forwards every change onto a tokio channel.
///
/// Useful to sequence a driver against notification delivery: write a value,
/// then await the matching change on the receiver.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    name: String,
    sender: mpsc::Sender<(String, Value)>,
}

impl ChannelListener {
    /// Creates a channel listener around an existing sender.
    pub fn new(name: impl Into<String>, sender: mpsc::Sender<(String, Value)>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Creates a channel listener together with its receiver.
    pub fn with_channel(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<(String, Value)>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }
}

#[async_trait]
impl Listener for ChannelListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_change(&self, key: &str, value: &Value) -> Result<(), ListenerError> {
        self.sender
            .send((key.to_string(), value.clone()))
            .await
            .map_err(|e| ListenerError::with_source("receiver dropped", e))
    }
}

// =============================================================================
// Tests
// =============================================================================
