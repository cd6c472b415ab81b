use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Kalman filter tuning for the client tracker.
///
/// `noise_a*` parameterize the discrete white-noise acceleration model
/// per axis; `measurement_noise` is the variance on each measured
/// coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_process_noise")]
    pub noise_ax: f64,
    #[serde(default = "default_process_noise")]
    pub noise_ay: f64,
    #[serde(default = "default_process_noise")]
    pub noise_az: f64,
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f64,
}

fn default_process_noise() -> f64 {
    9.0
}

fn default_measurement_noise() -> f64 {
    0.09
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("noise_ax", self.noise_ax),
            ("noise_ay", self.noise_ay),
            ("noise_az", self.noise_az),
            ("measurement_noise", self.measurement_noise),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "tracker {name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            noise_ax: default_process_noise(),
            noise_ay: default_process_noise(),
            noise_az: default_process_noise(),
            measurement_noise: default_measurement_noise(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_noise_rejected() {
        let config = TrackerConfig {
            noise_ax: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
