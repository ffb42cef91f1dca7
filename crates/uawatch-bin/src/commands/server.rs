// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `server` command.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uawatch_config::UawatchConfig;
use uawatch_core::{NotificationRouter, RouterStatsSnapshot};
use uawatch_opcua::UaServer;

use crate::cli::ServerArgs;
use crate::error::BinResult;
use crate::listeners::LoggingListener;
use crate::settings;
use crate::shutdown::ShutdownCoordinator;

/// Summary of a server run.
#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    /// Application namespace index.
    pub namespace_index: u16,
    /// Changes seen by the logging listener.
    pub changes: u64,
    /// Router counters at shutdown.
    pub stats: RouterStatsSnapshot,
}

/// Executes the `server` command, running until a shutdown signal.
pub async fn server(config: &UawatchConfig, args: ServerArgs) -> BinResult<()> {
    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();

    let signals = tokio::spawn(async move { coordinator.wait_for_shutdown().await });
    let result = serve(config, &args, token).await;
    signals.abort();

    let report = result?;
    info!(
        changes = report.changes,
        failures = report.stats.listener_failures,
        "Server run complete"
    );
    Ok(())
}

/// Runs the demo server until `shutdown` is cancelled.
pub async fn serve(
    config: &UawatchConfig,
    args: &ServerArgs,
    shutdown: CancellationToken,
) -> BinResult<ServerReport> {
    let mut server_config = settings::server_config(config)?;
    if let Some(endpoint) = &args.endpoint {
        server_config.endpoint = endpoint.clone();
    }
    if let Some(variable) = &args.monitored_variable {
        server_config.monitored_variable = variable.clone();
    }

    let logging = Arc::new(LoggingListener::new());
    let router = Arc::new(
        NotificationRouter::builder()
            .policy(settings::dispatch_policy(config))
            .listener(logging.clone())
            .build(),
    );

    let server = UaServer::with_router(server_config, router.clone());
    let namespace_index = server.init()?;
    server.start()?;
    info!("Press Ctrl+C to exit");

    shutdown.cancelled().await;
    info!("Shutdown signal received, stopping server...");
    server.stop();

    Ok(ServerReport {
        namespace_index,
        changes: logging.seen(),
        stats: router.stats().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_serve_until_cancelled() {
        let config = UawatchConfig::default();
        let token = CancellationToken::new();

        let stopper = {
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                token.cancel();
            }
        };
        let args = ServerArgs::default();
        let (report, ()) = tokio::join!(serve(&config, &args, token), stopper);

        let report = report.unwrap();
        assert_eq!(report.namespace_index, 1);
        // The initial value of the monitored variable.
        assert_eq!(report.changes, 1);
        assert_eq!(report.stats.dispatched, 1);
    }

    #[tokio::test]
    async fn test_serve_rejects_unknown_variable() {
        let config = UawatchConfig::default();
        let args = ServerArgs {
            monitored_variable: Some("pressure".to_string()),
            ..Default::default()
        };
        let result = serve(&config, &args, CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
