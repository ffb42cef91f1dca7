// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uawatch-core
//!
//! Typed data-change notification routing for OPC UA subscriptions.
//!
//! - **Types**: the closed [`Value`] union and its [`DataType`]
//! - **Node**: [`NodeId`] parsing and formatting
//! - **Event**: [`ChangeEvent`] and [`EventNotification`] as delivered by a transport
//! - **Listener**: the [`Listener`] capability and closure/channel adapters
//! - **Router**: [`NotificationRouter`], key filtering and isolated fan-out
//! - **Diagnostics**: injected [`DiagnosticSink`] implementations
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uawatch_core::{MemorySink, NotificationRouter, Value};
//!
//! # async fn demo() {
//! let sink = MemorySink::new();
//! let router = NotificationRouter::with_sink(Arc::new(sink.clone()));
//! router.set_watched_key("temperature");
//! router.add_fn_listener("threshold", |_, value| {
//!     if value.as_f64().unwrap_or_default() > 30.0 {
//!         println!("too hot");
//!     }
//!     Ok(())
//! });
//!
//! router.on_change("temperature", &Value::Float(35.0)).await;
//! assert!(sink.failures().is_empty());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod event;
pub mod node;
pub mod types;

// =============================================================================
// Routing Modules
// =============================================================================

pub mod diagnostics;
pub mod listener;
pub mod router;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use diagnostics::{CompositeSink, Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use error::{BoxError, DispatchError, ListenerError, NodeIdError};
pub use event::{ChangeEvent, EventNotification, MonitoredItemRef, NotificationPayload};
pub use listener::{ChannelListener, FnListener, Listener};
pub use node::{NodeId, NodeIdentifier};
pub use router::{
    DispatchOutcome, DispatchPolicy, NotificationRouter, NotificationRouterBuilder, RouterStats,
    RouterStatsSnapshot, DEFAULT_LISTENER_TIMEOUT,
};
pub use types::{DataType, Value};

// Used by downstream crates for cancellable dispatch.
pub use tokio_util::sync::CancellationToken;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
