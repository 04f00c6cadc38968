use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub predictor: PredictorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessorConfig {
    pub verbose: bool,
    /// Sample period in ms, supplied by the host scheduler.
    pub period_ms: f64,
    /// Ring buffer length; must cover the longest lookback window.
    pub buffer_len: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictorConfig {
    /// Voltage level that declares the beginning of a spike.
    pub firing_threshold: f64,
    /// Offset in ms between the detected peak and the threshold freeze.
    /// Zero or negative means freeze immediately at the crossing.
    pub time_from_peak_ms: f64,
    /// Trailing window for the weighted filter; 0 disables filtering.
    pub filter_points: usize,
    /// Lag in samples between the two slope taps; 0 disables the estimate.
    pub slope_points: usize,
    /// Default voltage at which the accumulated sum resets.
    pub sum_reset_voltage: f64,
    /// Allowed error for v - sum_reset (recommended 0.003).
    pub sum_reset_tolerance: f64,
    /// Forces the sum threshold when >= 0; negative keeps auto-calculation.
    pub sum_threshold_override: f64,
    /// Forces the slope threshold when > -1000; -1000 keeps auto-calculation.
    pub slope_threshold_override: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            processor: ProcessorConfig {
                verbose: false,
                period_ms: 0.1, // 10 reads per ms
                buffer_len: 40000,
            },
            predictor: PredictorConfig {
                firing_threshold: 0.0,
                time_from_peak_ms: 0.0,
                filter_points: 0,
                slope_points: 0,
                sum_reset_voltage: -0.05,
                sum_reset_tolerance: 0.003,
                sum_threshold_override: -1.0,
                slope_threshold_override: -1000.0,
            },
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {}", e))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml).map_err(|e| format!("Failed to write config file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip() {
        let mut config = Config::default();
        config.predictor.firing_threshold = -0.02;
        config.predictor.slope_points = 5;

        let path = std::env::temp_dir().join("spike_predictor_config_test.yaml");
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.predictor.firing_threshold, -0.02);
        assert_eq!(loaded.predictor.slope_points, 5);
        assert_eq!(loaded.processor.buffer_len, 40000);
    }

    #[test]
    fn missing_file_is_an_error_string() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
