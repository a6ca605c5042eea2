//! Process settings
//!
//! Loaded with the `config` crate from an optional TOML file layered under
//! environment variables:
//!
//! - `.env` is read first (development)
//! - `config.toml`, or the file named by `SUPERSHOW_CONFIG`, if it exists
//! - `SUPERSHOW__<SECTION>__<KEY>` variables, e.g. `SUPERSHOW__MQTT__BROKER_PORT=1884`
//!
//! Every key has a default, so an empty environment yields a working local setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::bus::BusConfig;

pub const CONFIG_PATH_VAR: &str = "SUPERSHOW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "SUPERSHOW";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mqtt: MqttSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub production: ProductionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: String,
    pub password: String,
    pub client_id_controller: String,
    pub client_id_production: String,
    /// Seconds.
    pub keepalive: u64,
    /// Seconds.
    pub reconnect_delay_min: u64,
    /// Seconds.
    pub reconnect_delay_max: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            username: String::new(),
            password: String::new(),
            client_id_controller: "bpp_controller".to_string(),
            client_id_production: "bpp_production".to_string(),
            keepalive: 60,
            reconnect_delay_min: 1,
            reconnect_delay_max: 60,
        }
    }
}

impl MqttSettings {
    /// Connection parameters for one process. Blank credentials mean anonymous.
    pub fn bus_config(&self, client_id: &str) -> BusConfig {
        let config = BusConfig::new(&self.broker_host, self.broker_port, client_id)
            .with_keepalive(Duration::from_secs(self.keepalive))
            .with_backoff(
                Duration::from_secs(self.reconnect_delay_min),
                Duration::from_secs(self.reconnect_delay_max),
            );
        if self.username.is_empty() {
            config
        } else {
            config.with_credentials(&self.username, &self.password)
        }
    }

    pub fn controller_bus_config(&self) -> BusConfig {
        self.bus_config(&self.client_id_controller)
    }

    pub fn production_bus_config(&self) -> BusConfig {
        self.bus_config(&self.client_id_production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub cards_path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            cards_path: PathBuf::from("data/cards.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductionSettings {
    /// Seconds between control heartbeats; 0 disables them.
    pub heartbeat_interval_secs: u64,
}

impl Default for ProductionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
        }
    }
}

impl ProductionSettings {
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }
}

impl Settings {
    /// Load from `.env`, the config file and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let settings = Self::build(Some(Path::new(&path)), Self::environment())?;
        settings.validate()?;
        Ok(settings)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn build(path: Option<&Path>, env: config::Environment) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.mqtt.broker_host.trim().is_empty() {
            return Err(SettingsError::invalid("mqtt.broker_host", "must not be empty"));
        }
        if self.mqtt.broker_port == 0 {
            return Err(SettingsError::invalid("mqtt.broker_port", "must not be 0"));
        }
        if self.mqtt.client_id_controller.is_empty() || self.mqtt.client_id_production.is_empty() {
            return Err(SettingsError::invalid("mqtt.client_id_*", "must not be empty"));
        }
        if self.mqtt.client_id_controller == self.mqtt.client_id_production {
            return Err(SettingsError::invalid(
                "mqtt.client_id_*",
                "controller and production must differ; the broker drops duplicate ids",
            ));
        }
        if self.mqtt.reconnect_delay_min == 0 {
            return Err(SettingsError::invalid("mqtt.reconnect_delay_min", "must be at least 1"));
        }
        if self.mqtt.reconnect_delay_max < self.mqtt.reconnect_delay_min {
            return Err(SettingsError::invalid(
                "mqtt.reconnect_delay_max",
                "must not be below reconnect_delay_min",
            ));
        }
        Ok(())
    }
}
