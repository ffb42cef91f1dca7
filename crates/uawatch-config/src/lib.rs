// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uawatch-config
//!
//! Configuration for the uawatch demo server, client and router.
//!
//! ## Features
//!
//! - **Schema Definition**: every field defaulted, validation with field paths
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: override config values via environment variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use uawatch_config::loader::load_config;
//!
//! let config = load_config("uawatch.yaml").unwrap();
//!
//! println!("Endpoint: {}", config.server.endpoint);
//! println!("Watching: {}", config.server.monitored_variable);
//! ```
//!
//! ## Configuration Schema
//!
//! - `server` - Server identity, endpoint and monitored variable
//! - `client` - Client endpoint and request timeout
//! - `dispatch` - Listener timeout
//! - `logging` - Level and format
//!
//! ## Environment Variables
//!
//! ```text
//! UAWATCH_SERVER_ENDPOINT=opc.tcp://0.0.0.0:4841/demo/
//! UAWATCH_MONITORED_VARIABLE=counter
//! UAWATCH_LOG_LEVEL=debug
//! ```
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! server:
//!   monitored_variable: "${WATCHED:temperature}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_or_default, render, ConfigFormat, ConfigLoader};
pub use schema::{ClientConfig, DispatchConfig, LogFormat, LogLevel, LoggingConfig, ServerConfig, UawatchConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
