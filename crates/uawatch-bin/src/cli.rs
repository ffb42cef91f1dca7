// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `server`: Run the demo server until Ctrl+C
//! - `client`: Read, write and call against an in-process server
//! - `watch`: Subscription demo with threshold alerts
//! - `validate`: Validate configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uawatch_config::LogLevel;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uawatch - OPC UA data-change notification demos
#[derive(Parser, Debug)]
#[command(
    name = "uawatch",
    author = "Sylvex <contact@sylvex.io>",
    version = uawatch_core::VERSION,
    about = "Route OPC UA data-change notifications to typed listeners",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "uawatch.yaml",
        env = "UAWATCH_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the demo server
    ///
    /// Builds the Device address space, watches the monitored variable
    /// and logs every change until Ctrl+C.
    Server(ServerArgs),

    /// Run the client demo
    ///
    /// Starts an in-process server, then reads, writes and calls
    /// IncrementValue through a client.
    Client(ClientArgs),

    /// Run the subscription demo
    ///
    /// Subscribes to a variable, writes a temperature sweep and reports
    /// threshold alerts.
    Watch(WatchArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `server` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ServerArgs {
    /// Endpoint URL, overrides `server.endpoint`
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Variable to watch, overrides `server.monitored_variable`
    #[arg(short, long)]
    pub monitored_variable: Option<String>,
}

/// Arguments for the `client` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ClientArgs {
    /// Server URL, overrides `client.server_url`
    #[arg(short, long)]
    pub url: Option<String>,
}

/// Arguments for the `watch` command.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Variable to subscribe to
    #[arg(long, default_value = "temperature")]
    pub variable: String,

    /// Upper alert threshold
    #[arg(long, default_value_t = 30.0)]
    pub high: f64,

    /// Lower alert threshold
    #[arg(long, default_value_t = 10.0)]
    pub low: f64,

    /// Publishing interval in milliseconds, overrides `server.subscription_period_ms`
    #[arg(long)]
    pub period_ms: Option<u64>,
}

impl Default for WatchArgs {
    fn default() -> Self {
        Self {
            variable: "temperature".to_string(),
            high: 30.0,
            low: 10.0,
            period_ms: None,
        }
    }
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uawatch_config::LogFormat> for LogFormat {
    fn from(format: uawatch_config::LogFormat) -> Self {
        match format {
            uawatch_config::LogFormat::Text => Self::Text,
            uawatch_config::LogFormat::Json => Self::Json,
            uawatch_config::LogFormat::Compact => Self::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
    /// TOML format
    Toml,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the log level, letting `-q`, `-v` and `-l` win over `configured`.
    pub fn effective_log_level(&self, configured: LogLevel) -> String {
        if self.quiet {
            "warn".to_string()
        } else if self.verbose {
            "debug".to_string()
        } else {
            self.log_level
                .clone()
                .unwrap_or_else(|| configured.as_str().to_string())
        }
    }

    /// Returns the log format, letting `--log-format` win over `configured`.
    pub fn effective_log_format(&self, configured: uawatch_config::LogFormat) -> LogFormat {
        self.log_format.unwrap_or_else(|| configured.into())
    }

    /// Returns `true` if the command needs the loaded configuration.
    pub fn needs_config(&self) -> bool {
        matches!(
            self.command,
            Commands::Server(_) | Commands::Client(_) | Commands::Watch(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
