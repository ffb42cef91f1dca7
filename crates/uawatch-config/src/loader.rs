// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders
//! 3. Parse YAML, TOML or JSON
//! 4. Apply environment variable overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UAWATCH_SERVER_ENDPOINT=opc.tcp://0.0.0.0:4841/demo/
//! UAWATCH_MONITORED_VARIABLE=counter
//! UAWATCH_SUBSCRIPTION_PERIOD_MS=250
//! UAWATCH_CLIENT_URL=opc.tcp://localhost:4841/demo/
//! UAWATCH_LISTENER_TIMEOUT_MS=0
//! UAWATCH_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogLevel, UawatchConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAWATCH";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use uawatch_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("uawatch.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `UAWATCH` prefix and env resolution on.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format is determined by the extension: `.yaml`/`.yml`, `.toml`
    /// or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UawatchConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let format = ConfigFormat::from_path(path)?;

        let config = self.load_from_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UawatchConfig> {
        let mut config: UawatchConfig = if self.resolve_env_vars {
            parse_str(&self.resolve_env_placeholders(content), format)?
        } else {
            parse_str(content, format)?
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        debug!(
            endpoint = %config.server.endpoint,
            monitored = %config.server.monitored_variable,
            "Configuration validated"
        );
        Ok(config)
    }

    /// Resolves `${VAR}` and `${VAR:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let inner = &after[..end];
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Applies `<PREFIX>_*` overrides.
    fn apply_env_overrides(&self, config: &mut UawatchConfig) -> ConfigResult<()> {
        if let Some(value) = self.var("SERVER_ENDPOINT") {
            config.server.endpoint = value;
        }
        if let Some(value) = self.var("MONITORED_VARIABLE") {
            config.server.monitored_variable = value;
        }
        if let Some(value) = self.var("SUBSCRIPTION_PERIOD_MS") {
            config.server.subscription_period_ms = self.parse_number("SUBSCRIPTION_PERIOD_MS", &value)?;
        }
        if let Some(value) = self.var("CLIENT_URL") {
            config.client.server_url = value;
        }
        if let Some(value) = self.var("LISTENER_TIMEOUT_MS") {
            config.dispatch.listener_timeout_ms = self.parse_number("LISTENER_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = self.var("LOG_LEVEL") {
            config.logging.level = value
                .parse::<LogLevel>()
                .map_err(|_| ConfigError::invalid_env_var(self.var_name("LOG_LEVEL"), "expected a log level"))?;
        }
        Ok(())
    }

    fn var_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn var(&self, suffix: &str) -> Option<String> {
        env::var(self.var_name(suffix)).ok()
    }

    fn parse_number(&self, suffix: &str, value: &str) -> ConfigResult<u64> {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_env_var(self.var_name(suffix), "expected valid number"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string())),
    }
}

/// YAML goes through the `config` crate.
fn parse_yaml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

/// Renders a configuration as TOML or JSON.
pub fn render(config: &UawatchConfig, format: ConfigFormat) -> ConfigResult<String> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| ConfigError::serialization(e.to_string())),
        ConfigFormat::Yaml => Err(ConfigError::unsupported_format("yaml output")),
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UawatchConfig> {
    ConfigLoader::new().load(path)
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<UawatchConfig> {
    let loader = ConfigLoader::new();
    match loader.load(path.as_ref()) {
        Err(e) if e.is_not_found() => {
            info!("No configuration at {}, using defaults", path.as_ref().display());
            let mut config = UawatchConfig::default();
            loader.apply_env_overrides(&mut config)?;
            config.validate()?;
            Ok(config)
        }
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
server:
  endpoint: opc.tcp://0.0.0.0:4841/demo/
  monitored_variable: counter
  subscription_period_ms: 250

client:
  server_url: opc.tcp://localhost:4841/demo/

logging:
  level: debug
  format: compact
"#;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_env_prefix("UAWATCH_LOADER_TEST_UNSET")
    }

    #[test]
    fn test_load_yaml() {
        let file = write_temp(".yaml", YAML);
        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.server.endpoint, "opc.tcp://0.0.0.0:4841/demo/");
        assert_eq!(config.server.monitored_variable, "counter");
        assert_eq!(config.server.subscription_period_ms, 250);
        assert_eq!(config.server.name, "AsyncUA Example Server");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_load_toml_and_json() {
        let toml = write_temp(".toml", "[dispatch]\nlistener_timeout_ms = 0\n");
        let config = isolated().load(toml.path()).unwrap();
        assert_eq!(config.dispatch.listener_timeout(), None);

        let json = write_temp(".json", r#"{"server": {"monitored_variable": "status"}}"#);
        let config = isolated().load(json.path()).unwrap();
        assert_eq!(config.server.monitored_variable, "status");
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("uawatch")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let loader = ConfigLoader::new();
        assert_eq!(
            loader.resolve_env_placeholders("variable: ${UAWATCH_NONEXISTENT_VAR:pressure}"),
            "variable: pressure"
        );
        assert_eq!(
            loader.resolve_env_placeholders("a: ${UAWATCH_NONEXISTENT_VAR} b"),
            "a: ${UAWATCH_NONEXISTENT_VAR} b"
        );
        assert_eq!(loader.resolve_env_placeholders("open: ${oops"), "open: ${oops");
    }

    #[test]
    fn test_env_overrides() {
        let prefix = "UAWATCH_LOADER_TEST_OVERRIDE";
        env::set_var(format!("{}_MONITORED_VARIABLE", prefix), "message");
        env::set_var(format!("{}_SUBSCRIPTION_PERIOD_MS", prefix), "100");
        env::set_var(format!("{}_LOG_LEVEL", prefix), "warn");

        let config = ConfigLoader::new()
            .with_env_prefix(prefix)
            .load_from_str("", ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.server.monitored_variable, "message");
        assert_eq!(config.server.subscription_period_ms, 100);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_env_override() {
        let prefix = "UAWATCH_LOADER_TEST_BAD";
        env::set_var(format!("{}_SUBSCRIPTION_PERIOD_MS", prefix), "soon");
        let err = ConfigLoader::new()
            .with_env_prefix(prefix)
            .load_from_str("", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_validation_runs() {
        let err = isolated()
            .load_from_str("[server]\nsubscription_period_ms = 0\n", ConfigFormat::Toml)
            .unwrap_err();
        assert_eq!(err.field(), Some("server.subscription_period_ms"));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let file = write_temp(".toml", "[server\n");
        let err = isolated().load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let result = ConfigLoader::new().load("/nonexistent/path/uawatch.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
        assert!(load_or_default("/nonexistent/path/uawatch.yaml").is_ok());
    }

    #[test]
    fn test_render() {
        let config = UawatchConfig::default();
        let toml = render(&config, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("monitored_variable = \"temperature\""));
        let back = isolated().load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(back, config);
        assert!(render(&config, ConfigFormat::Yaml).is_err());
    }
}
