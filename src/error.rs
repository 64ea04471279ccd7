//! # Error Types
//!
//! Custom error types for the sleigh telemetry bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the sleigh telemetry bridge
#[derive(Debug, Error)]
pub enum SleighTelemetryError {
    /// Transport session errors (connect, publish, respond)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inertial sensor errors
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Wire payload serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the sleigh telemetry bridge
pub type Result<T> = std::result::Result<T, SleighTelemetryError>;
