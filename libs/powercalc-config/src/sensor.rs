//! Power sensor entries

use powercalc_profile::{DeviceIdentity, VariableMapping};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// One virtual power sensor as written by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub entity_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Values for the profile's custom fields
    #[serde(default)]
    pub custom_fields: VariableMapping,
    /// Overrides the profile standby power (W)
    #[serde(default)]
    pub standby_power: Option<f64>,
    #[serde(default)]
    pub disabled: bool,
}

/// Sensor entry after boundary validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSensor {
    pub entity_id: String,
    pub name: Option<String>,
    /// Set when the sensor is backed by a library profile
    pub identity: Option<DeviceIdentity>,
    pub variables: VariableMapping,
    pub standby_power: Option<f64>,
}

impl SensorConfig {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn with_device(mut self, manufacturer: &str, model: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_string());
        self.model = Some(model.to_string());
        self
    }

    pub fn with_custom_field(mut self, key: &str, value: &str) -> Self {
        self.custom_fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn validate(&self) -> Result<ResolvedSensor> {
        let entity_id = self.entity_id.trim();
        if entity_id.is_empty() {
            return Err(ConfigError::invalid_sensor("<empty>", "entity_id is empty"));
        }
        match entity_id.split_once('.') {
            Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => {},
            _ => {
                return Err(ConfigError::invalid_sensor(
                    entity_id,
                    "entity_id must have the form <domain>.<object_id>",
                ))
            },
        }

        let identity = match (&self.manufacturer, &self.model) {
            (Some(manufacturer), Some(model)) => Some(
                DeviceIdentity::new(manufacturer, model)
                    .map_err(|e| ConfigError::invalid_sensor(entity_id, e.to_string()))?,
            ),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::invalid_sensor(
                    entity_id,
                    "manufacturer is set without model",
                ))
            },
            (None, Some(_)) => {
                return Err(ConfigError::invalid_sensor(
                    entity_id,
                    "model is set without manufacturer",
                ))
            },
        };

        if identity.is_none() && !self.custom_fields.is_empty() {
            return Err(ConfigError::invalid_sensor(
                entity_id,
                "custom_fields require manufacturer and model",
            ));
        }

        if let Some(power) = self.standby_power {
            if !power.is_finite() || power < 0.0 {
                return Err(ConfigError::invalid_sensor(
                    entity_id,
                    format!("standby_power must be >= 0, got {}", power),
                ));
            }
        }

        Ok(ResolvedSensor {
            entity_id: entity_id.to_string(),
            name: self.name.clone(),
            identity,
            variables: self.custom_fields.clone(),
            standby_power: self.standby_power,
        })
    }
}
