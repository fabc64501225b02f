//! Error types for detector configuration.

use thiserror::Error;

/// Errors raised while loading, saving or validating a [`DetectorConfig`].
///
/// [`DetectorConfig`]: crate::config::DetectorConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid config JSON
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A threshold or reference value must be a positive, finite number
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// The accepted frequency range is empty or inverted
    #[error("invalid frequency range: {min} - {max} Hz")]
    InvalidRange { min: f32, max: f32 },

    /// A buffer size was zero
    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;
