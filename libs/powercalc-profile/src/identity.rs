//! Device identity and variable mapping types

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{LibraryError, Result};

/// Caller-supplied custom field bindings: field name -> value (usually an entity id)
pub type VariableMapping = BTreeMap<String, String>;

/// (manufacturer, model) key into the profile store
///
/// Both parts are case-sensitive and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity {
    manufacturer: String,
    model: String,
}

impl DeviceIdentity {
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let manufacturer = manufacturer.into();
        let model = model.into();

        if manufacturer.trim().is_empty() {
            return Err(LibraryError::validation("Manufacturer cannot be empty"));
        }
        if model.trim().is_empty() {
            return Err(LibraryError::validation(format!(
                "Model cannot be empty (manufacturer: {})",
                manufacturer
            )));
        }

        Ok(Self {
            manufacturer,
            model,
        })
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.manufacturer, self.model)
    }
}
