// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process OPC UA stack for the uawatch demo.
//!
//! This crate provides the server side that feeds a
//! [`NotificationRouter`](uawatch_core::NotificationRouter) and a client that
//! talks to it through a [`UaTransport`].
//!
//! # Features
//!
//! - Address space with folders, typed variables and methods
//! - The demo `Device` nodes and the `IncrementValue` method
//! - Subscriptions with per-subscription publishing tasks
//! - Event notifications
//! - Client with request timeouts over a pluggable transport
//!
//! # Error Handling
//!
//! ```text
//! UaError
//! ├── Connection    - Endpoint and session state
//! ├── Operation     - Read, write and call failures
//! ├── Subscription  - Subscription and monitored item errors
//! └── Configuration - Invalid settings and lifecycle misuse
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uawatch_opcua::{ClientConfig, LocalTransport, ServerConfig, UaClient, UaServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Arc::new(UaServer::new(ServerConfig::default()));
//!     server.init()?;
//!     server.start()?;
//!
//!     let config = ClientConfig::default();
//!     let transport = LocalTransport::new(config.server_url.clone(), server.clone());
//!     let mut client = UaClient::new(config, transport);
//!     let ns = client.connect().await?;
//!     client.write_variable("temperature", ns, 25.5f32).await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod address_space;
pub mod client;
pub mod demo;
pub mod error;
pub mod server;
pub mod subscription;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use address_space::{AddressSpace, Argument, DataValue, MethodHandler, NodeClass, NodeInfo, QualifiedName};
pub use client::{UaClient, WatchHandle};
pub use demo::{build_demo_address_space, DemoNodes};
pub use error::{
    ConfigurationError, ConnectionError, OperationError, StatusCode, SubscriptionError, UaError, UaResult,
};
pub use server::{ServerState, UaServer};
pub use subscription::{
    ChannelCallback, DataChangeNotification, MonitoredItemId, RouterCallback, SubscriptionCallback, SubscriptionId,
    SubscriptionService, SubscriptionState,
};
pub use transport::{LocalTransport, TransportState, UaTransport};
pub use types::{BuildInfo, ClientConfig, EndpointUrl, ServerConfig, ServerConfigBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
