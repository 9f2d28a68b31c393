//! Top-level configuration and file/env loading

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use powercalc_profile::{LibraryContext, RemoteSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::sensor::{ResolvedSensor, SensorConfig};

/// Environment variable prefix for overrides, nested with `__`
pub const ENV_PREFIX: &str = "POWERCALC_";

fn default_config_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

/// Where the profile library reads from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySettings {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Local profile directory, `<config_dir>/powercalc_profiles` when unset
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    #[serde(default)]
    pub remote: Option<RemoteSettings>,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            local_dir: None,
            remote: None,
            cache_enabled: true,
        }
    }
}

impl LibrarySettings {
    /// Context for `ProfileLibrary::factory`; relative paths resolve against `base`
    pub fn to_context(&self, base: &Path) -> LibraryContext {
        let config_dir = base.join(&self.config_dir);
        let mut context = LibraryContext::new(config_dir).with_cache(self.cache_enabled);
        if let Some(local_dir) = &self.local_dir {
            context = context.with_local_dir(base.join(local_dir));
        }
        if let Some(remote) = &self.remote {
            context = context.with_remote(remote.clone());
        }
        context
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PowercalcConfig {
    #[serde(default)]
    pub library: LibrarySettings,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl PowercalcConfig {
    /// Validate every sensor entry; disabled entries are skipped
    pub fn validate(&self) -> Result<Vec<ResolvedSensor>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.sensors.len());

        for sensor in &self.sensors {
            if !seen.insert(sensor.entity_id.trim()) {
                return Err(ConfigError::invalid_sensor(
                    sensor.entity_id.trim(),
                    "duplicate entity_id",
                ));
            }
            if sensor.disabled {
                debug!("Skipping disabled sensor {}", sensor.entity_id);
                continue;
            }
            resolved.push(sensor.validate()?);
        }
        Ok(resolved)
    }
}

/// Load configuration from a file, then apply `POWERCALC_LIBRARY__*` overrides
///
/// The format follows the file extension (yaml, yml, json, toml).
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<PowercalcConfig> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

    let figment = match extension {
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        "toml" => Figment::new().merge(Toml::file(path)),
        _ => return Err(ConfigError::UnsupportedFormat(extension.to_string())),
    };

    if !path.exists() {
        return Err(ConfigError::Load(format!(
            "configuration file not found: {}",
            path.display()
        )));
    }

    let config: PowercalcConfig = figment.merge(library_env()).extract()?;
    info!(
        "Loaded {} ({} sensors)",
        path.display(),
        config.sensors.len()
    );
    Ok(config)
}

/// Only the `library` section can be overridden from the environment
fn library_env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .split("__")
        .filter(|key| key.as_str().to_ascii_lowercase().starts_with("library."))
}
