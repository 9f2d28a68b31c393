//! Shared helpers for the power profile tools
//!
//! - logging initialisation
//! - configuration value resolution

pub mod config_loader;
pub mod logging;

pub use logging::{init_logging, LoggingConfig, LoggingError};
