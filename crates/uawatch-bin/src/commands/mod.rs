// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `server`: Run the demo server until shutdown
//! - `client`: Client read/write/call demo
//! - `watch`: Subscription demo with threshold alerts
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod client;
mod server;
mod validate;
mod version;
mod watch;

pub use client::{client, run_client, ClientReport};
pub use server::{serve, server, ServerReport};
pub use validate::validate;
pub use version::version;
pub use watch::{run_watch, watch, WatchReport};

use std::sync::Arc;

use uawatch_config::UawatchConfig;
use uawatch_opcua::{LocalTransport, UaClient, UaServer};

use crate::cli::{Cli, Commands};
use crate::error::BinResult;
use crate::settings;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli, config: UawatchConfig) -> BinResult<()> {
    match cli.command.clone() {
        Commands::Server(args) => server::server(&config, args).await,
        Commands::Client(args) => client::client(&config, args).await,
        Commands::Watch(args) => watch::watch(&config, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
    }
}

/// Starts an in-process demo server and connects a client to it.
///
/// Returns the server, the connected client and the namespace index.
pub(crate) async fn connect_local(
    config: &UawatchConfig,
    url: Option<&str>,
) -> BinResult<(Arc<UaServer>, UaClient<LocalTransport>, u16)> {
    let server = Arc::new(UaServer::new(settings::server_config(config)?));
    server.init()?;
    server.start()?;

    let mut client_config = settings::client_config(config)?;
    if let Some(url) = url {
        client_config.server_url = url.to_string();
        client_config.validate()?;
    }

    let transport = LocalTransport::new(client_config.server_url.clone(), server.clone());
    let mut client = UaClient::new(client_config, transport);
    match client.connect().await {
        Ok(ns) => Ok((server, client, ns)),
        Err(e) => {
            server.stop();
            Err(e.into())
        }
    }
}
