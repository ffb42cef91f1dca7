// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! - `test_parse_*`: Parsing YAML, TOML and JSON files
//! - `test_env_*`: Placeholders and overrides
//! - `test_validation_*`: Validation rules

use std::time::Duration;

use uawatch_config::{
    load_or_default, render, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel, UawatchConfig,
};

use uawatch_tests::common::{temp_config, unique_env_prefix, ConfigFixtures};

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_parse_yaml_file() {
    let file = temp_config(ConfigFixtures::yaml_full(), "yaml");
    let config = ConfigLoader::new()
        .with_env_prefix(unique_env_prefix("yaml"))
        .load(file.path())
        .unwrap();

    assert_eq!(config.server.name, "Line 4 Server");
    assert_eq!(config.server.endpoint, "opc.tcp://0.0.0.0:4841/line4/");
    assert_eq!(config.server.subscription_period(), Duration::from_millis(250));
    assert_eq!(config.server.monitored_variable, "counter");
    assert_eq!(config.client.request_timeout(), Duration::from_secs(2));
    assert_eq!(config.dispatch.listener_timeout(), Some(Duration::from_secs(1)));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_parse_toml_fills_defaults() {
    let file = temp_config(ConfigFixtures::toml_minimal(), "toml");
    let config = ConfigLoader::new()
        .with_env_prefix(unique_env_prefix("toml"))
        .load(file.path())
        .unwrap();

    let defaults = UawatchConfig::default();
    assert_eq!(config.server.monitored_variable, "status");
    assert_eq!(config.server.endpoint, defaults.server.endpoint);
    assert_eq!(config.client, defaults.client);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_parse_unknown_field_rejected() {
    let file = temp_config("[server]\nport = 4840\n", "toml");
    let err = ConfigLoader::new().load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "{:?}", err);
}

#[test]
fn test_parse_unsupported_extension() {
    let file = temp_config("server = {}", "ini");
    let err = ConfigLoader::new().load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }), "{:?}", err);
}

#[test]
fn test_render_roundtrips_through_toml() {
    let mut config = UawatchConfig::default();
    config.server.monitored_variable = "message".to_string();
    let text = render(&config, ConfigFormat::Toml).unwrap();

    let loader = ConfigLoader::new().with_env_prefix(unique_env_prefix("render"));
    let parsed = loader.load_from_str(&text, ConfigFormat::Toml).unwrap();
    assert_eq!(parsed, config);
    assert!(render(&config, ConfigFormat::Yaml).is_err());
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_env_placeholder_default_and_value() {
    let prefix = unique_env_prefix("placeholder");
    let var = format!("{}_ENDPOINT", prefix);
    let content = ConfigFixtures::json_with_placeholder(&var);
    let loader = ConfigLoader::new().with_env_prefix(&prefix);

    let config = loader.load_from_str(&content, ConfigFormat::Json).unwrap();
    assert_eq!(config.server.endpoint, "opc.tcp://localhost:4840/asyncua/server/");

    std::env::set_var(&var, "opc.tcp://plc.local:4850/");
    let config = loader.load_from_str(&content, ConfigFormat::Json).unwrap();
    std::env::remove_var(&var);
    assert_eq!(config.server.endpoint, "opc.tcp://plc.local:4850/");
}

#[test]
fn test_env_overrides() {
    let prefix = unique_env_prefix("override");
    std::env::set_var(format!("{}_MONITORED_VARIABLE", prefix), "counter");
    std::env::set_var(format!("{}_LISTENER_TIMEOUT_MS", prefix), "0");
    std::env::set_var(format!("{}_LOG_LEVEL", prefix), "warning");

    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_from_str("", ConfigFormat::Toml)
        .unwrap();

    assert_eq!(config.server.monitored_variable, "counter");
    assert_eq!(config.dispatch.listener_timeout(), None);
    assert_eq!(config.logging.level, LogLevel::Warn);

    std::env::set_var(format!("{}_SUBSCRIPTION_PERIOD_MS", prefix), "soon");
    let err = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_from_str("", ConfigFormat::Toml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { .. }), "{:?}", err);

    for suffix in [
        "MONITORED_VARIABLE",
        "LISTENER_TIMEOUT_MS",
        "LOG_LEVEL",
        "SUBSCRIPTION_PERIOD_MS",
    ] {
        std::env::remove_var(format!("{}_{}", prefix, suffix));
    }
}

#[test]
fn test_env_disabled_ignores_overrides() {
    let prefix = unique_env_prefix("disabled");
    std::env::set_var(format!("{}_MONITORED_VARIABLE", prefix), "counter");
    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .with_env_vars(false)
        .load_from_str("", ConfigFormat::Toml)
        .unwrap();
    std::env::remove_var(format!("{}_MONITORED_VARIABLE", prefix));
    assert_eq!(config.server.monitored_variable, "temperature");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_or_default(dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.server.namespace_uri, "http://examples.asyncua.server");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validation_rules() {
    let loader = ConfigLoader::new().with_env_prefix(unique_env_prefix("validation"));
    let cases = [
        ("[server]\nendpoint = \"tcp://localhost:4840\"\n", "server.endpoint"),
        ("[server]\nnamespace_uri = \"\"\n", "server.namespace_uri"),
        ("[server]\nsubscription_period_ms = 0\n", "server.subscription_period_ms"),
        ("[server]\nmonitored_variable = \"\"\n", "server.monitored_variable"),
        ("[client]\nserver_url = \"localhost\"\n", "client.server_url"),
        ("[client]\nrequest_timeout_ms = 0\n", "client.request_timeout_ms"),
    ];

    for (content, field) in cases {
        let err = loader.load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(err.field(), Some(field), "{}", content);
    }
}
