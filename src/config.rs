//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker transport configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Sensor fusion filter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FusionConfig {
    /// Complementary filter smoothing coefficient (gyro weight)
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,

    /// Sample period in seconds
    #[serde(default = "default_sample_period_s")]
    pub sample_period_s: f64,
}

/// Delivery queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Worker wake-up cap when no items are signalled
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay applied after every delivery attempt
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Bounded wait for the worker to exit on stop
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// GPS simulator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_gps_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_start_latitude")]
    pub start_latitude: f64,

    #[serde(default = "default_start_longitude")]
    pub start_longitude: f64,
}

/// Orchestrator loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Sampling tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Ticks between connectivity re-checks
    #[serde(default = "default_status_check_ticks")]
    pub status_check_ticks: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional directory for rolling daily log files
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_endpoint() -> String { "127.0.0.1:8883".to_string() }
fn default_device_id() -> String { "santa-sleigh-01".to_string() }
fn default_connect_timeout_ms() -> u64 { 30000 }

fn default_smoothing() -> f64 { 0.962 }
fn default_sample_period_s() -> f64 { 0.020 }

fn default_poll_interval_ms() -> u64 { 100 }
fn default_send_delay_ms() -> u64 { 100 }
fn default_stop_timeout_ms() -> u64 { 1000 }

fn default_gps_interval_ms() -> u64 { 1000 }
fn default_start_latitude() -> f64 { 41.82141979802636 }
fn default_start_longitude() -> f64 { 12.45875158194143 }

fn default_tick_ms() -> u64 { 10 }
fn default_status_check_ticks() -> u64 { 5000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            device_id: default_device_id(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            sample_period_s: default_sample_period_s(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            send_delay_ms: default_send_delay_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_gps_interval_ms(),
            start_latitude: default_start_latitude(),
            start_longitude: default_start_longitude(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            status_check_ticks: default_status_check_ticks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            fusion: FusionConfig::default(),
            queue: QueueConfig::default(),
            gps: GpsConfig::default(),
            app: AppConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults
    /// if the file does not exist
    ///
    /// A missing file is not an error (the device ships with built-in
    /// defaults); a malformed file is.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.transport.endpoint.is_empty() {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("transport endpoint cannot be empty")
            ));
        }

        if self.transport.device_id.is_empty() {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("device_id cannot be empty")
            ));
        }

        if self.transport.connect_timeout_ms == 0 || self.transport.connect_timeout_ms > 120_000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("connect_timeout_ms must be between 1 and 120000")
            ));
        }

        // The filter degenerates to accelerometer-only at 0 and pure gyro at 1
        if self.fusion.smoothing <= 0.0 || self.fusion.smoothing >= 1.0 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("fusion smoothing must be strictly between 0.0 and 1.0")
            ));
        }

        if self.fusion.sample_period_s <= 0.0 || self.fusion.sample_period_s > 1.0 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("sample_period_s must be between 0.0 (exclusive) and 1.0")
            ));
        }

        if self.queue.poll_interval_ms == 0 || self.queue.poll_interval_ms > 60_000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("poll_interval_ms must be between 1 and 60000")
            ));
        }

        if self.queue.send_delay_ms > 60_000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("send_delay_ms must not exceed 60000")
            ));
        }

        if self.queue.stop_timeout_ms == 0 || self.queue.stop_timeout_ms > 60_000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("stop_timeout_ms must be between 1 and 60000")
            ));
        }

        if self.gps.interval_ms == 0 || self.gps.interval_ms > 60_000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("gps interval_ms must be between 1 and 60000")
            ));
        }

        if self.gps.start_latitude < -90.0 || self.gps.start_latitude > 90.0 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("start_latitude must be between -90 and 90")
            ));
        }

        if self.gps.start_longitude < -180.0 || self.gps.start_longitude > 180.0 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("start_longitude must be between -180 and 180")
            ));
        }

        if self.app.tick_ms == 0 || self.app.tick_ms > 1000 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("tick_ms must be between 1 and 1000")
            ));
        }

        if self.app.status_check_ticks == 0 {
            return Err(crate::error::SleighTelemetryError::Config(
                toml::de::Error::custom("status_check_ticks must be greater than 0")
            ));
        }

        if let Some(dir) = &self.logging.dir {
            if dir.is_empty() {
                return Err(crate::error::SleighTelemetryError::Config(
                    toml::de::Error::custom("logging dir cannot be empty when set")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.fusion.smoothing, 0.962);
        assert_eq!(config.fusion.sample_period_s, 0.020);
        assert_eq!(config.queue.poll_interval_ms, 100);
        assert_eq!(config.queue.send_delay_ms, 100);
        assert_eq!(config.queue.stop_timeout_ms, 1000);
        assert_eq!(config.gps.interval_ms, 1000);
        assert_eq!(config.app.tick_ms, 10);
        assert_eq!(config.app.status_check_ticks, 5000);
    }

    #[test]
    fn test_parse_partial_toml_uses_defaults() {
        let toml_str = r#"
            [transport]
            endpoint = "broker.example.net:8883"

            [gps]
            interval_ms = 250
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.transport.endpoint, "broker.example.net:8883");
        assert_eq!(config.transport.device_id, "santa-sleigh-01");
        assert_eq!(config.gps.interval_ms, 250);
        assert_eq!(config.fusion.smoothing, 0.962);
    }

    #[test]
    fn test_invalid_smoothing_rejected() {
        for bad in [0.0, 1.0, -0.5, 1.5] {
            let mut config = Config::default();
            config.fusion.smoothing = bad;
            assert!(
                config.validate().is_err(),
                "smoothing {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let mut config = Config::default();
        config.transport.endpoint = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut config = Config::default();
        config.app.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_send_delay_allowed() {
        // Zero inter-item delay is a valid (unthrottled) configuration
        let mut config = Config::default();
        config.queue.send_delay_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [transport]
            endpoint = "10.0.0.7:1883"
            device_id = "sleigh-test"

            [app]
            tick_ms = 20
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transport.endpoint, "10.0.0.7:1883");
        assert_eq!(config.transport.device_id, "sleigh-test");
        assert_eq!(config.app.tick_ms, 20);
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let config = Config::load_or_default("/nonexistent/sleigh.toml").unwrap();
        assert_eq!(config.transport.device_id, "santa-sleigh-01");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [fusion]
            smoothing = 1.5
            "#
        )
        .unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
