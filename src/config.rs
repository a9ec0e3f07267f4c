use serde::{Deserialize, Serialize};

use crate::engine;
use crate::types::{LogFormat, ModelControlMode};

/// Options controlling how the wrapped server core is brought up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Identifier the server reports about itself
    pub server_id: String,
    /// How the server loads and unloads models
    pub model_control_mode: ModelControlMode,
    /// Format of the server's own log lines
    pub log_format: LogFormat,
    /// Verbose logging level (0 = off)
    pub log_verbose_level: u32,
    /// Seconds to wait for in-flight work on shutdown
    pub exit_timeout_secs: u64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            server_id: "inference-server".to_string(),
            model_control_mode: ModelControlMode::None,
            log_format: LogFormat::Default,
            log_verbose_level: 0,
            exit_timeout_secs: 30,
        }
    }
}

impl ServerOptions {
    /// Create a new server options object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server identifier
    pub fn set_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = server_id.into();
        self
    }

    /// Set the model control mode
    pub fn set_model_control_mode(mut self, mode: ModelControlMode) -> Self {
        self.model_control_mode = mode;
        self
    }

    /// Set the log format
    pub fn set_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set the verbose logging level
    pub fn set_log_verbose_level(mut self, level: u32) -> Self {
        self.log_verbose_level = level;
        self
    }

    /// Set the shutdown timeout
    pub fn set_exit_timeout(mut self, secs: u64) -> Self {
        self.exit_timeout_secs = secs;
        self
    }

    /// Translate into the engine core's configuration vocabulary.
    pub fn to_engine_config(&self) -> engine::ServerConfig {
        engine::ServerConfig {
            server_id: self.server_id.clone(),
            model_control_mode: self.model_control_mode.to_engine(),
            log_format: self.log_format.to_engine(),
            log_verbose_level: self.log_verbose_level,
            exit_timeout_secs: self.exit_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters() {
        let options = ServerOptions::new()
            .set_server_id("edge-0")
            .set_model_control_mode(ModelControlMode::Explicit)
            .set_log_format(LogFormat::Iso8601)
            .set_log_verbose_level(2);

        assert_eq!(options.server_id, "edge-0");
        assert_eq!(options.model_control_mode, ModelControlMode::Explicit);
        assert_eq!(options.log_format, LogFormat::Iso8601);
        assert_eq!(options.log_verbose_level, 2);
    }

    #[test]
    fn test_engine_config_translation() {
        let config = ServerOptions::new()
            .set_model_control_mode(ModelControlMode::Poll)
            .to_engine_config();

        assert_eq!(config.model_control_mode, engine::ModelControlMode::Poll);
        assert_eq!(config.log_format, engine::LogFormat::Default);
        assert_eq!(config.server_id, "inference-server");
    }

    #[test]
    fn test_options_serde_round_trip() {
        let options = ServerOptions::new().set_log_format(LogFormat::Iso8601);
        let json = serde_json::to_string(&options).unwrap();
        let back: ServerOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
