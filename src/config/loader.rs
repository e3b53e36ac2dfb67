//! Configuration Loader
//!
//! Layers defaults, an optional TOML file and environment variables into a
//! validated [`DispatcherConfig`].

use super::DispatcherConfig;
use crate::error::{DispatcherError, DispatcherResult};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable prefix recognized by default
pub const DEFAULT_ENV_PREFIX: &str = "DISPATCHER";

/// Configuration file looked up when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "config/dispatcher.toml";

/// Loaded, validated configuration together with where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: DispatcherConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default file location and `DISPATCHER_*` variables
    pub fn load() -> DispatcherResult<ConfigManager> {
        Self::load_from(None, DEFAULT_ENV_PREFIX)
    }

    /// Load configuration from an explicit file path and `DISPATCHER_*` variables
    pub fn load_from_file(path: &Path) -> DispatcherResult<ConfigManager> {
        Self::load_from(Some(path), DEFAULT_ENV_PREFIX)
    }

    /// Load configuration with an explicit file and environment prefix.
    ///
    /// An explicit file must exist; the default file is optional.
    pub fn load_from(path: Option<&Path>, env_prefix: &str) -> DispatcherResult<ConfigManager> {
        let (file_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        debug!(
            config_file = %file_path.display(),
            required = required,
            env_prefix = %env_prefix,
            "Loading dispatcher configuration"
        );

        let settings = Config::builder()
            .add_source(
                File::from(file_path.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("topics")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DispatcherError::configuration(format!("Failed to load configuration: {e}")))?;

        let config: DispatcherConfig = settings.try_deserialize().map_err(|e| {
            DispatcherError::configuration(format!("Failed to parse configuration: {e}"))
        })?;

        config.validate()?;

        let source_file = file_path.is_file().then_some(file_path);
        let manager = ConfigManager {
            config: config.with_unique_worker_id(),
            source_file,
        };

        info!(
            worker_id = %manager.config.worker_id,
            engine_url = %manager.config.engine_url,
            config_file = ?manager.source_file,
            "Configuration loaded successfully"
        );

        Ok(manager)
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: DispatcherConfig) -> DispatcherResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            source_file: None,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn into_config(self) -> DispatcherConfig {
        self.config
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// JSON view of the configuration with credentials masked, safe to log
    pub fn sanitized(&self) -> serde_json::Value {
        sanitize_config_for_logging(&self.config)
    }
}

/// Mask every field whose name suggests a credential
pub fn sanitize_config_for_logging(config: &DispatcherConfig) -> serde_json::Value {
    let mut config_json = serde_json::json!(config);
    let sensitive_patterns = ["password", "secret", "key", "token", "credential"];
    sanitize_json_recursive(&mut config_json, &sensitive_patterns);
    config_json
}

fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                // secret *references* are URLs, not secrets
                if is_sensitive && !key_lower.ends_with("_url") {
                    let masked = match &*val {
                        serde_json::Value::String(s) if s.is_empty() => {
                            serde_json::Value::String("[EMPTY]".to_string())
                        }
                        serde_json::Value::Null => serde_json::Value::Null,
                        serde_json::Value::String(s) => {
                            serde_json::Value::String(format!("[MASKED: {}]", "*".repeat(s.len())))
                        }
                        _ => serde_json::Value::String("[MASKED]".to_string()),
                    };
                    *val = masked;
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}
