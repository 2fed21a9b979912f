//! Error types for skyglass

use thiserror::Error;

/// The main error type for skyglass operations
#[derive(Debug, Error)]
pub enum SkyglassError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Render error: {0}")]
    RenderError(String),
}

/// Result type alias for skyglass operations
pub type Result<T> = std::result::Result<T, SkyglassError>;

impl From<toml::de::Error> for SkyglassError {
    fn from(err: toml::de::Error) -> Self {
        SkyglassError::TomlParseError(err.to_string())
    }
}

impl SkyglassError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SkyglassError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Checks `min <= value <= max`, naming `field` in the error otherwise.
    pub fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
        if value.is_nan() || value < min || value > max {
            return Err(SkyglassError::ValueOutOfRange {
                field: field.to_string(),
                min,
                max,
                value,
            });
        }
        Ok(())
    }
}
