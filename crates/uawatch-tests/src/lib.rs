// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uawatch Integration Tests
//!
//! Shared test utilities plus integration suites for the uawatch crates.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built configurations, events and servers
//!   - `mocks`: Recording listeners and an in-memory transport
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p uawatch-tests
//! cargo test -p uawatch-tests --test integration_router
//! cargo test -p uawatch-tests --test integration_opcua
//! cargo test -p uawatch-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Router Tests (`integration_router.rs`)
//! - Key filtering and in-order fan-out
//! - Failure isolation, timeouts and cancellation
//! - Diagnostics reaching the injected sink
//!
//! ### OPC UA Tests (`integration_opcua.rs`)
//! - Server lifecycle and the demo address space
//! - Client operations over local and mock transports
//! - Subscriptions feeding the router
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON parsing
//! - Environment placeholders and overrides
//! - Validation rules

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::init_test_logging;
}
