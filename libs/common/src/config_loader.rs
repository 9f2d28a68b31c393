//! Configuration value helpers
//! Resolve a setting from an explicit value, an environment variable or a default

use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, warn};

/// Get configuration value with priority: configured > ENV > Default
///
/// # Arguments
/// * `configured` - Explicitly configured value (command line, config file)
/// * `env_var` - Environment variable name to check
/// * `default` - Default value to use as fallback
pub fn get_config_value<T>(configured: Option<T>, env_var: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    // Priority 1: explicit value
    if let Some(val) = configured {
        debug!("Using configured {}", env_var);
        return val;
    }

    // Priority 2: Environment variable
    if let Ok(env_str) = std::env::var(env_var) {
        match env_str.parse::<T>() {
            Ok(val) => {
                debug!("Using {} from environment: {}", env_var, env_str);
                return val;
            },
            Err(e) => {
                warn!("Failed to parse {} from environment: {}", env_var, e);
            },
        }
    }

    // Priority 3: Default value
    default
}

/// Optional string setting; empty values count as unset
pub fn get_optional_string(configured: Option<String>, env_var: &str) -> Option<String> {
    if let Some(val) = configured.filter(|v| !v.is_empty()) {
        debug!("Using configured {}", env_var);
        return Some(val);
    }

    match std::env::var(env_var) {
        Ok(env_val) if !env_val.is_empty() => {
            debug!("Using {} from environment", env_var);
            Some(env_val)
        },
        _ => None,
    }
}

/// Get string configuration value with priority: configured > ENV > Default
pub fn get_string_config(configured: Option<String>, env_var: &str, default: &str) -> String {
    get_optional_string(configured, env_var).unwrap_or_else(|| default.to_string())
}
