// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Maps the loaded configuration onto runtime types.

use chrono::Utc;
use uawatch_config::UawatchConfig;
use uawatch_core::DispatchPolicy;
use uawatch_opcua::{BuildInfo, ClientConfig, ServerConfig};

use crate::error::BinResult;

/// Builds the server configuration, validated.
pub fn server_config(config: &UawatchConfig) -> BinResult<ServerConfig> {
    let server = &config.server;
    let build_info = BuildInfo {
        product_uri: server.product_uri.clone(),
        manufacturer_name: server.manufacturer.clone(),
        product_name: server.product_name.clone(),
        software_version: server.software_version.clone(),
        build_number: server.build_number.clone(),
        build_date: Utc::now(),
    };

    let config = ServerConfig::builder()
        .name(&server.name)
        .endpoint(&server.endpoint)
        .namespace_uri(&server.namespace_uri)
        .build_info(build_info)
        .subscription_period(server.subscription_period())
        .monitored_variable(&server.monitored_variable)
        .build()?;
    Ok(config)
}

/// Builds the client configuration, validated.
pub fn client_config(config: &UawatchConfig) -> BinResult<ClientConfig> {
    let client = ClientConfig::new(&config.client.server_url)
        .with_namespace_uri(&config.client.namespace_uri)
        .with_request_timeout(config.client.request_timeout());
    client.validate()?;
    Ok(client)
}

/// Builds the router dispatch policy.
pub fn dispatch_policy(config: &UawatchConfig) -> DispatchPolicy {
    DispatchPolicy::from_millis(config.dispatch.listener_timeout_ms)
}
