// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uawatch-bin
//!
//! CLI binary for the uawatch notification demos.
//!
//! - CLI argument parsing with clap
//! - Logging initialization
//! - Graceful shutdown handling
//! - Demo listeners and command implementations
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────┐
//!                    │   main.rs   │
//!                    └──────┬──────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   cli.rs    │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ settings │ │ logging  │
//!        └────┬─────┘ └──────────┘ └──────────┘
//!             │
//!      ┌──────┴──────┐
//!      │  uawatch-*  │
//!      └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Run the demo server until Ctrl+C
//! uawatch server
//!
//! # Read, write and call through a client
//! uawatch client
//!
//! # Subscription demo with threshold alerts
//! uawatch watch --high 30 --low 10
//!
//! # Validate configuration
//! uawatch -c uawatch.toml validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod listeners;
pub mod logging;
pub mod settings;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use listeners::{LoggingListener, ThresholdListener};
pub use logging::init_logging;
pub use shutdown::ShutdownCoordinator;

use uawatch_config::UawatchConfig;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Loads configuration, installs logging and executes the command.
pub async fn run(cli: Cli) -> BinResult<()> {
    let config = if cli.needs_config() {
        uawatch_config::load_or_default(&cli.config)?
    } else {
        UawatchConfig::default()
    };

    let level = cli.effective_log_level(config.logging.level);
    let format = cli.effective_log_format(config.logging.format);
    init_logging(&level, format)?;

    commands::execute(cli, config).await
}
