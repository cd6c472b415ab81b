use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Parameters of the simulated range sensor hosted by each node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// How often the sensor polls the target, in Hz.
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    /// Variance of the zero-mean Gaussian measurement noise.
    #[serde(default = "default_noise_var")]
    pub noise_var: f64,
}

fn default_frequency() -> f64 {
    10.0
}

fn default_noise_var() -> f64 {
    0.01
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "sensor frequency_hz must be positive".into(),
            ));
        }
        if self.noise_var < 0.0 {
            return Err(ConfigError::Validation(
                "sensor noise_var must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency(),
            noise_var: default_noise_var(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SensorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_variance_rejected() {
        let config = SensorConfig {
            frequency_hz: 10.0,
            noise_var: -0.5,
        };
        assert!(config.validate().is_err());
    }
}
