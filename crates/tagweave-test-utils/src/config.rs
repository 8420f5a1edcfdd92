//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`EngineConfig`] values
//! without repeating boilerplate across crate boundaries.

use tagweave_config::EngineConfig;

/// Fluent builder for [`EngineConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .factory_marker("app.Constr")
///     .locale("zh")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: EngineConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn factory_marker(mut self, id: &str) -> Self {
        self.config.markers.factory = id.to_string();
        self
    }

    pub fn beans_marker(mut self, id: &str) -> Self {
        self.config.markers.beans = id.to_string();
        self
    }

    pub fn listen_marker(mut self, id: &str) -> Self {
        self.config.markers.listen = id.to_string();
        self
    }

    pub fn native_namespace(mut self, ns: &str) -> Self {
        self.config.model.native_namespaces.push(ns.to_string());
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.config.messages.locale = locale.to_string();
        self
    }

    pub fn message_override(mut self, key: &str, template: &str) -> Self {
        self.config
            .messages
            .overrides
            .insert(key.to_string(), template.to_string());
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
