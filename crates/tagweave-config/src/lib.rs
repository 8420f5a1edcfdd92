#![deny(unsafe_code)]

//! Configuration loading and validation for tagweave.
//!
//! Loads TOML configuration files and validates them. Provides the
//! [`EngineConfig`] type as the central configuration structure, and the
//! [`messages`] module for localized diagnostic templates.

/// Localized message catalog for diagnostics.
pub mod messages;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use messages::MessageCatalog;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level engine configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tag types the engine treats as well-known markers.
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Program model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Resolution cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Diagnostic message localization.
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Marker tag types with engine-level meaning.
///
/// ## TOML Example
///
/// ```toml
/// [markers]
/// factory = "app.Constr"
/// beans = "app.Beans"
/// listen = "app.Listen"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Marks a static factory method used to construct a type.
    #[serde(default = "default_factory_marker")]
    pub factory: String,

    /// Marks a type as a bean for the container.
    #[serde(default = "default_beans_marker")]
    pub beans: String,

    /// Marks a listener method. Its tag type carries the beans marker.
    #[serde(default = "default_listen_marker")]
    pub listen: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            factory: default_factory_marker(),
            beans: default_beans_marker(),
            listen: default_listen_marker(),
        }
    }
}

fn default_factory_marker() -> String {
    "tagweave.Factory".to_string()
}

fn default_beans_marker() -> String {
    "tagweave.Beans".to_string()
}

fn default_listen_marker() -> String {
    "tagweave.Listen".to_string()
}

/// Program model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Namespaces whose tag types are host built-ins. Built-in tags are
    /// leaves and never searched into.
    #[serde(default = "default_native_namespaces")]
    pub native_namespaces: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            native_namespaces: default_native_namespaces(),
        }
    }
}

fn default_native_namespaces() -> Vec<String> {
    vec!["lang".to_string()]
}

/// Resolution cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of elements the cache is pre-sized for.
    #[serde(default = "default_cache_capacity")]
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    32
}

/// Diagnostic message localization.
///
/// ## TOML Example
///
/// ```toml
/// [messages]
/// locale = "zh"
///
/// [messages.overrides]
/// "exception.annotation.notStatic" = "{method} must be static"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Built-in locale to use ("en" or "zh").
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Per-key template overrides, keyed by the full message key.
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            overrides: HashMap::new(),
        }
    }
}

fn default_locale() -> String {
    "en".to_string()
}

impl EngineConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "engine configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        let markers = [
            ("factory", &self.markers.factory),
            ("beans", &self.markers.beans),
            ("listen", &self.markers.listen),
        ];
        for (i, (name, id)) in markers.iter().enumerate() {
            if id.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "markers.{name} must not be empty"
                )));
            }
            if let Some((other, _)) = markers[..i].iter().find(|(_, o)| o == id) {
                return Err(ConfigError::Validation(format!(
                    "markers.{name} and markers.{other} must name different tag types, both are {id:?}"
                )));
            }
        }

        for (i, ns) in self.model.native_namespaces.iter().enumerate() {
            if ns.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "model.native_namespaces[{i}] must not be empty"
                )));
            }
        }

        if self.cache.initial_capacity == 0 {
            return Err(ConfigError::Validation(
                "cache.initial_capacity must be non-zero".to_string(),
            ));
        }

        if !messages::LOCALES.contains(&self.messages.locale.as_str()) {
            return Err(ConfigError::Validation(format!(
                "messages.locale must be one of {:?}, got {:?}",
                messages::LOCALES,
                self.messages.locale
            )));
        }

        Ok(())
    }

    /// Build the [`MessageCatalog`] for the configured locale and overrides.
    pub fn message_catalog(&self) -> MessageCatalog {
        MessageCatalog::for_locale(&self.messages.locale)
            .with_overrides(self.messages.overrides.clone())
    }
}
