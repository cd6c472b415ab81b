mod sensor;
mod tracker;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use sensor::SensorConfig;
pub use tracker::TrackerConfig;

/// Configuration of the Network coordinator process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network_bind")]
    pub control_bind: String,
    /// Bound worker pool for concurrent RPC handlers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Gather-phase timeout per poll round, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_network_bind() -> String {
    "tcp://0.0.0.0:24000".into()
}

fn default_workers() -> usize {
    8
}

fn default_poll_timeout_ms() -> u64 {
    250
}

impl NetworkConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&read_file(path)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Validation("workers must be positive".into()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn minimal() -> Self {
        Self {
            control_bind: default_network_bind(),
            workers: default_workers(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::minimal()
    }
}

/// Configuration of a sensor Node process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: i32,
    /// Fixed global location of the hosted range sensor.
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default = "default_node_bind")]
    pub router_bind: String,
    #[serde(default = "default_network_addr")]
    pub network_addr: String,
    #[serde(default = "default_target_addr")]
    pub target_addr: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub sensor: SensorConfig,
}

fn default_node_bind() -> String {
    "tcp://0.0.0.0:25001".into()
}

fn default_network_addr() -> String {
    "tcp://127.0.0.1:24000".into()
}

fn default_target_addr() -> String {
    "tcp://127.0.0.1:23000".into()
}

fn default_request_timeout_ms() -> u64 {
    1000
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&read_file(path)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id <= 0 {
            return Err(ConfigError::Validation("node id must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_ms must be positive".into(),
            ));
        }
        self.sensor.validate()
    }

    pub fn minimal(id: i32) -> Self {
        Self {
            id,
            position: [0.0, 0.0, 0.0],
            router_bind: default_node_bind(),
            network_addr: default_network_addr(),
            target_addr: default_target_addr(),
            request_timeout_ms: default_request_timeout_ms(),
            sensor: SensorConfig::default(),
        }
    }
}

/// Configuration of the Target process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_bind")]
    pub control_bind: String,
    pub trajectory_path: String,
    #[serde(default = "default_update_frequency")]
    pub update_frequency_hz: f64,
    /// Wrap back to the first waypoint after the last one.
    #[serde(default = "default_loop_path")]
    pub loop_path: bool,
}

fn default_target_bind() -> String {
    "tcp://0.0.0.0:23000".into()
}

fn default_update_frequency() -> f64 {
    2.0
}

fn default_loop_path() -> bool {
    true
}

impl TargetConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&read_file(path)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_frequency_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "update_frequency_hz must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn minimal(trajectory_path: impl Into<String>) -> Self {
        Self {
            control_bind: default_target_bind(),
            trajectory_path: trajectory_path.into(),
            update_frequency_hz: default_update_frequency(),
            loop_path: default_loop_path(),
        }
    }
}

/// Configuration of the Client process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_network_addr")]
    pub network_addr: String,
    #[serde(default = "default_client_id")]
    pub client_id: i32,
    #[serde(default = "default_client_frequency")]
    pub frequency_hz: f64,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_client_id() -> i32 {
    1
}

fn default_client_frequency() -> f64 {
    5.0
}

fn default_output_path() -> String {
    "predictions.csv".into()
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&read_file(path)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "frequency_hz must be positive".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_ms must be positive".into(),
            ));
        }
        self.tracker.validate()
    }

    pub fn minimal() -> Self {
        Self {
            network_addr: default_network_addr(),
            client_id: default_client_id(),
            frequency_hz: default_client_frequency(),
            output_path: default_output_path(),
            request_timeout_ms: default_request_timeout_ms(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::minimal()
    }
}

fn read_file(path: impl AsRef<Path>) -> Result<String, ConfigError> {
    std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))
}

fn parse<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_configs_validate() {
        assert!(NetworkConfig::minimal().validate().is_ok());
        assert!(NodeConfig::minimal(1).validate().is_ok());
        assert!(TargetConfig::minimal("trajectory.json").validate().is_ok());
        assert!(ClientConfig::minimal().validate().is_ok());
    }

    #[test]
    fn test_parse_node_toml() {
        let toml = r#"
            id = 3
            position = [0.0, 10.0, 0.0]
            router_bind = "tcp://0.0.0.0:25003"
            network_addr = "tcp://127.0.0.1:24000"
            target_addr = "tcp://127.0.0.1:23000"

            [sensor]
            frequency_hz = 20.0
            noise_var = 0.04
        "#;

        let config = NodeConfig::from_toml(toml).unwrap();
        assert_eq!(config.id, 3);
        assert_eq!(config.position, [0.0, 10.0, 0.0]);
        assert!((config.sensor.frequency_hz - 20.0).abs() < f64::EPSILON);
        assert!((config.sensor.noise_var - 0.04).abs() < f64::EPSILON);
    }

    #[test]
    fn test_node_defaults_fill_in() {
        let config = NodeConfig::from_toml("id = 1").unwrap();
        assert_eq!(config.network_addr, "tcp://127.0.0.1:24000");
        assert!((config.sensor.frequency_hz - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_node_id_rejected() {
        assert!(NodeConfig::from_toml("id = 0").is_err());
        assert!(NodeConfig::from_toml("id = -4").is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = NetworkConfig::from_toml("workers = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_client_toml() {
        let toml = r#"
            network_addr = "tcp://127.0.0.1:24000"
            client_id = 7
            frequency_hz = 2.5
            output_path = "out/predictions.csv"

            [tracker]
            noise_ax = 4.0
            noise_ay = 4.0
            noise_az = 4.0
        "#;

        let config = ClientConfig::from_toml(toml).unwrap();
        assert_eq!(config.client_id, 7);
        assert!((config.tracker.noise_ax - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_target_requires_trajectory_path() {
        assert!(TargetConfig::from_toml("update_frequency_hz = 2.0").is_err());
    }

    #[test]
    fn test_negative_frequency_rejected() {
        let toml = r#"
            trajectory_path = "trajectory.json"
            update_frequency_hz = -1.0
        "#;
        assert!(TargetConfig::from_toml(toml).is_err());
    }
}
