// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `client` command.

use serde::Serialize;
use tracing::{error, info};
use uawatch_config::UawatchConfig;
use uawatch_core::Value;
use uawatch_opcua::{LocalTransport, UaClient, UaResult};

use super::connect_local;
use crate::cli::ClientArgs;
use crate::error::BinResult;

/// Variables read before and after the writes.
const READ_ORDER: [&str; 4] = ["temperature", "status", "counter", "message"];

/// Values read and returned by the client demo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientReport {
    /// Application namespace index.
    pub namespace_index: u16,
    /// Values before the writes, in read order.
    pub before: Vec<(String, Value)>,
    /// Values after the writes, in read order.
    pub after: Vec<(String, Value)>,
    /// Output of `IncrementValue(10)`.
    pub method_result: Vec<Value>,
}

/// Executes the `client` command.
pub async fn client(config: &UawatchConfig, args: ClientArgs) -> BinResult<()> {
    let report = run_client(config, &args).await?;
    info!("Method result: [{}]", join(&report.method_result));
    Ok(())
}

/// Runs the client demo against an in-process server.
pub async fn run_client(config: &UawatchConfig, args: &ClientArgs) -> BinResult<ClientReport> {
    let (server, mut client, ns) = connect_local(config, args.url.as_deref()).await?;

    let result = exercise(&client, ns).await;
    if let Err(e) = &result {
        error!("Error: {}", e);
    }

    client.disconnect().await?;
    server.stop();
    Ok(result?)
}

async fn exercise(client: &UaClient<LocalTransport>, ns: u16) -> UaResult<ClientReport> {
    let before = read_all(client, ns).await?;

    client.write_variable("temperature", ns, 25.5f32).await?;
    client.write_variable("status", ns, true).await?;
    client.write_variable("counter", ns, 42i32).await?;
    client.write_variable("message", ns, "Hello from client").await?;

    let after = read_all(client, ns).await?;

    let method_result = client
        .call_method("increment_value", "Device", ns, &[Value::Int32(10)])
        .await?;

    Ok(ClientReport {
        namespace_index: ns,
        before,
        after,
        method_result,
    })
}

async fn read_all(client: &UaClient<LocalTransport>, ns: u16) -> UaResult<Vec<(String, Value)>> {
    let mut values = Vec::with_capacity(READ_ORDER.len());
    for name in READ_ORDER {
        values.push((name.to_string(), client.read_variable(name, ns).await?));
    }
    Ok(values)
}

fn join(values: &[Value]) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}
