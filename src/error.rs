//! # Error Types
//!
//! Custom error types for AltInput using `thiserror`.
//!
//! Only unrecoverable conditions live here. Recoverable configuration
//! problems are collected as [`ConfigIssue`](crate::bindings::ConfigIssue)s
//! instead, and polling failures are downgraded to "no samples".

use thiserror::Error;

/// Main error type for AltInput
#[derive(Debug, Error)]
pub enum AltInputError {
    /// Runtime configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A device of the wrong class was handed to a constructor
    #[error("Invalid device class '{0}': class must be 'GameControl'")]
    InvalidDeviceClass(String),

    /// Device access errors (open, grab, state queries)
    #[error("Device error: {0}")]
    Device(String),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AltInput
pub type Result<T> = std::result::Result<T, AltInputError>;
