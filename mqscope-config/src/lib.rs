//! # mqscope Configuration System
//!
//! Layered configuration for the MQTT capture decoder.
//!
//! ## Layers
//! 1. Built-in defaults (port 1883 on the `any` interface)
//! 2. `config/mqscope.yaml`, when present
//! 3. `MQSCOPE_*` environment variables (`__` separates nested keys)
//! 4. Command line arguments, applied with [`MqscopeConfig::with_overrides`]

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod telemetry;
mod validation;

pub use capture::CaptureConfig;
pub use error::ConfigError;
pub use telemetry::TelemetryConfig;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/mqscope.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq, Eq)]
pub struct MqscopeConfig {
    /// Capture process and stream parameters.
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Logging parameters.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl MqscopeConfig {
    /// Load configuration from the default file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Self::defaults();
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::extract(figment)
    }

    /// Load configuration from a specific path, on top of the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }
        Self::extract(Self::defaults().merge(Yaml::file(path)))
    }

    /// Applies the command line's positional `<port>` and `<interface>`.
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        interface: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(port) = port {
            self.capture.port = port;
        }
        if let Some(interface) = interface {
            self.capture.interface = interface;
        }
        self.validate()?;
        Ok(self)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(MqscopeConfig::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("MQSCOPE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn full_config_validation() {
        let config = MqscopeConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.capture.port, 1883);
        assert_eq!(config.capture.interface, "any");
        assert_eq!(config.capture.command, "tcpdump");
    }

    #[test]
    fn environment_override() {
        Jail::expect_with(|jail| {
            jail.set_env("MQSCOPE_CAPTURE__PORT", "8883");
            jail.set_env("MQSCOPE_TELEMETRY__JSON", "true");
            let config = MqscopeConfig::load().expect("config should load");
            assert_eq!(config.capture.port, 8883);
            assert!(config.telemetry.json);
            Ok(())
        });
    }

    #[test]
    fn yaml_file_layer() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                DEFAULT_CONFIG_PATH,
                "capture:\n  interface: eth0\ntelemetry:\n  log_filter: debug\n",
            )?;
            let config = MqscopeConfig::load().expect("config should load");
            assert_eq!(config.capture.interface, "eth0");
            assert_eq!(config.capture.port, 1883);
            assert_eq!(config.telemetry.log_filter, "debug");
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "capture:\n  port: 0\n  interface: \"eth 0\"\n")?;
            let err = MqscopeConfig::load_from_path("bad.yaml").unwrap_err();
            let message = err.to_string();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(message.contains("port"), "{}", message);
            assert!(message.contains("interface"), "{}", message);
            Ok(())
        });
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            MqscopeConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn cli_overrides() {
        let config = MqscopeConfig::default()
            .with_overrides(Some(1884), Some("lo".into()))
            .unwrap();
        assert_eq!(config.capture.port, 1884);
        assert_eq!(config.capture.interface, "lo");

        assert!(MqscopeConfig::default()
            .with_overrides(Some(0), None)
            .is_err());
    }
}
