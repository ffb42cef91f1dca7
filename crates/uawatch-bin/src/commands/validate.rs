// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use uawatch_config::{render, ConfigFormat, UawatchConfig};
use uawatch_opcua::demo::DEMO_VARIABLES;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let output = validation_output(&cli.config, &args)?;
    println!("{}", output);
    Ok(())
}

/// Loads `path` strictly and renders the validation result.
pub fn validation_output(path: &Path, args: &ValidateArgs) -> BinResult<String> {
    if !path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let config = uawatch_config::load_config(path)?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => Ok(text_output(path, &config, &warnings, args.show_config)?),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "summary": {
                    "endpoint": config.server.endpoint,
                    "namespace_uri": config.server.namespace_uri,
                    "monitored_variable": config.server.monitored_variable,
                    "subscription_period_ms": config.server.subscription_period_ms,
                    "client_url": config.client.server_url,
                    "listener_timeout_ms": config.dispatch.listener_timeout_ms,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            Ok(serde_json::to_string_pretty(&output).context("failed to render validation report")?)
        }
        OutputFormat::Toml => Ok(render(&config, ConfigFormat::Toml)?),
    }
}

fn collect_warnings(config: &UawatchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let monitored = &config.server.monitored_variable;
    if !DEMO_VARIABLES.iter().any(|(id, _)| id == monitored) {
        warnings.push(format!(
            "Monitored variable '{}' is not part of the demo address space",
            monitored
        ));
    }

    if config.dispatch.listener_timeout().is_none() {
        warnings.push("Listener timeout is disabled; a stuck listener blocks dispatch".to_string());
    }

    warnings
}

fn text_output(
    path: &Path,
    config: &UawatchConfig,
    warnings: &[String],
    show_config: bool,
) -> BinResult<String> {
    let mut out = String::new();
    let _ = writeln!(out, "✓ Configuration is valid: {}", path.display());
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Server: {} at {}", config.server.name, config.server.endpoint);
    let _ = writeln!(out, "  Namespace: {}", config.server.namespace_uri);
    let _ = writeln!(
        out,
        "  Monitored variable: {} every {} ms",
        config.server.monitored_variable, config.server.subscription_period_ms
    );
    let _ = writeln!(out, "  Client URL: {}", config.client.server_url);
    let _ = writeln!(
        out,
        "  Logging: {} ({})",
        config.logging.level, config.logging.format
    );

    if !warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in warnings {
            let _ = writeln!(out, "  ⚠ {}", warning);
        }
    }

    if show_config {
        let _ = writeln!(out);
        let _ = writeln!(out, "Parsed configuration:");
        out.push_str(&render(config, ConfigFormat::Json)?);
    }

    Ok(out.trim_end().to_string())
}
