//! Configuration error types

use powercalc_profile::LibraryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or did not match the configuration layout
    #[error("Configuration load error: {0}")]
    Load(String),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    /// A sensor entry failed boundary validation
    #[error("Invalid sensor {entity_id}: {message}")]
    InvalidSensor { entity_id: String, message: String },

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(err.to_string())
    }
}

impl ConfigError {
    pub fn invalid_sensor(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidSensor {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}
