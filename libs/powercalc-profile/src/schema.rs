//! Profile Schema
//!
//! Typed view over a stored profile document. Only the parts this library
//! needs are modelled (calculation strategy, custom field declarations,
//! standby figures, aliases); the raw document is kept for the calculation
//! engine, which owns the strategy-specific configuration blocks.

use serde_json::{Map, Value};

use crate::error::{LibraryError, Result};

/// Default device type when a profile does not declare one
pub const DEFAULT_DEVICE_TYPE: &str = "light";

/// How the calculation engine estimates power for a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationStrategy {
    Fixed,
    Linear,
    Lut,
    MultiSwitch,
    Composite,
    Playbook,
    Wled,
}

impl CalculationStrategy {
    pub const ALL: [CalculationStrategy; 7] = [
        CalculationStrategy::Fixed,
        CalculationStrategy::Linear,
        CalculationStrategy::Lut,
        CalculationStrategy::MultiSwitch,
        CalculationStrategy::Composite,
        CalculationStrategy::Playbook,
        CalculationStrategy::Wled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationStrategy::Fixed => "fixed",
            CalculationStrategy::Linear => "linear",
            CalculationStrategy::Lut => "lut",
            CalculationStrategy::MultiSwitch => "multi_switch",
            CalculationStrategy::Composite => "composite",
            CalculationStrategy::Playbook => "playbook",
            CalculationStrategy::Wled => "wled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|strategy| strategy.as_str() == s)
    }
}

impl std::fmt::Display for CalculationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input selector for a custom field, e.g. `{"entity": {"domain": "sensor"}}`
///
/// Only the shape is checked here; the host's form renderer interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    kind: String,
    options: Map<String, Value>,
}

impl Selector {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    fn from_value(value: &Value, field: &str, origin: &str) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            LibraryError::parse(origin, format!("field '{}': selector must be an object", field))
        })?;

        let mut entries = obj.iter();
        let (kind, options) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(LibraryError::parse(
                    origin,
                    format!(
                        "field '{}': selector must have exactly one type key, found {}",
                        field,
                        obj.len()
                    ),
                ))
            },
        };

        let options = match options {
            Value::Object(options) => options.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(LibraryError::parse(
                    origin,
                    format!("field '{}': options of selector '{}' must be an object", field, kind),
                ))
            },
        };

        Ok(Self {
            kind: kind.clone(),
            options,
        })
    }
}

/// Custom field declared by a profile
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    /// Variable name used in `[[key]]` placeholders and in variable mappings
    pub key: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    pub selector: Selector,
}

/// Parsed profile document
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSchema {
    name: String,
    calculation_strategy: CalculationStrategy,
    device_type: String,
    standby_power: Option<f64>,
    standby_power_on: Option<f64>,
    aliases: Vec<String>,
    fields: Vec<CustomField>,
    raw: Value,
}

impl ProfileSchema {
    /// Parse a profile document. `origin` (file path or URL) is used in error messages.
    pub fn from_value(raw: Value, origin: &str) -> Result<Self> {
        let doc = raw
            .as_object()
            .ok_or_else(|| LibraryError::parse(origin, "profile document must be an object"))?;

        let name = optional_str(doc, "name", origin)?
            .ok_or_else(|| LibraryError::parse(origin, "missing name"))?;

        let strategy_value = doc
            .get("calculation_strategy")
            .or_else(|| doc.get("calculation_mode"))
            .ok_or_else(|| LibraryError::parse(origin, "missing calculation_strategy"))?;
        let strategy_str = strategy_value
            .as_str()
            .ok_or_else(|| LibraryError::parse(origin, "calculation_strategy must be a string"))?;
        let calculation_strategy = CalculationStrategy::parse(strategy_str).ok_or_else(|| {
            LibraryError::parse(
                origin,
                format!("unknown calculation_strategy '{}'", strategy_str),
            )
        })?;

        let device_type = optional_str(doc, "device_type", origin)?
            .unwrap_or_else(|| DEFAULT_DEVICE_TYPE.to_string());
        let standby_power = optional_power(doc, "standby_power", origin)?;
        let standby_power_on = optional_power(doc, "standby_power_on", origin)?;
        let aliases = parse_aliases(doc, origin)?;
        let fields = parse_fields(doc.get("fields"), origin)?;

        Ok(Self {
            name,
            calculation_strategy,
            device_type,
            standby_power,
            standby_power_on,
            aliases,
            fields,
            raw,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calculation_strategy(&self) -> CalculationStrategy {
        self.calculation_strategy
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn standby_power(&self) -> Option<f64> {
        self.standby_power
    }

    pub fn standby_power_on(&self) -> Option<f64> {
        self.standby_power_on
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Custom fields in declaration order
    pub fn fields(&self) -> &[CustomField] {
        &self.fields
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn has_custom_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// The original document, including strategy configuration blocks
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Parse the `fields` block of a profile document, keeping declaration order.
///
/// Absent or `null` means the profile declares no custom fields.
pub fn parse_fields(fields: Option<&Value>, origin: &str) -> Result<Vec<CustomField>> {
    let fields = match fields {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(fields)) => fields,
        Some(_) => return Err(LibraryError::parse(origin, "'fields' must be an object")),
    };

    let mut parsed = Vec::with_capacity(fields.len());
    for (key, decl) in fields {
        let decl = decl.as_object().ok_or_else(|| {
            LibraryError::parse(origin, format!("field '{}' must be an object", key))
        })?;

        let name = decl
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LibraryError::parse(origin, format!("field '{}' is missing a name", key))
            })?
            .to_string();
        let description = decl
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let selector = decl.get("selector").ok_or_else(|| {
            LibraryError::parse(origin, format!("field '{}' is missing a selector", key))
        })?;

        parsed.push(CustomField {
            key: key.clone(),
            name,
            description,
            selector: Selector::from_value(selector, key, origin)?,
        });
    }

    Ok(parsed)
}

fn optional_str(doc: &Map<String, Value>, key: &str, origin: &str) -> Result<Option<String>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(LibraryError::parse(origin, format!("'{}' must be a string", key))),
    }
}

fn optional_power(doc: &Map<String, Value>, key: &str, origin: &str) -> Result<Option<f64>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_f64() {
            Some(watts) if watts >= 0.0 => Ok(Some(watts)),
            _ => Err(LibraryError::parse(
                origin,
                format!("'{}' must be a non-negative number", key),
            )),
        },
    }
}

fn parse_aliases(doc: &Map<String, Value>, origin: &str) -> Result<Vec<String>> {
    match doc.get("aliases") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| LibraryError::parse(origin, "aliases must be strings"))
            })
            .collect(),
        Some(_) => Err(LibraryError::parse(origin, "'aliases' must be a list")),
    }
}
