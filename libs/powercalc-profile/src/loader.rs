//! Profile document loading
//!
//! Profile documents are stored as JSON or YAML. Both are normalised into a
//! `serde_json::Value` tree; the library parses that into a
//! [`ProfileSchema`](crate::schema::ProfileSchema).

use std::path::Path;

use serde_json::Value;

use crate::error::{LibraryError, Result};

/// On-disk format of a profile document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

/// Parse document text into a JSON value tree
pub fn parse_value(text: &str, format: DocumentFormat, origin: &str) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(text).map_err(|e| LibraryError::parse(origin, e.to_string()))
        },
        DocumentFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| LibraryError::parse(origin, e.to_string()))
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{CalculationStrategy, ProfileSchema};

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/model.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("model.yml")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("model.txt")), None);
    }

    #[test]
    fn test_yaml_and_json_parse_alike() {
        let yaml = r#"
name: Test plug
calculation_strategy: fixed
fields:
  some_entity:
    name: Some entity
    selector:
      entity:
        domain: sensor
"#;
        let json = r#"{
            "name": "Test plug",
            "calculation_strategy": "fixed",
            "fields": {
                "some_entity": {"name": "Some entity", "selector": {"entity": {"domain": "sensor"}}}
            }
        }"#;

        let from_yaml = parse_value(yaml, DocumentFormat::Yaml, "model.yaml").unwrap();
        let from_json = parse_value(json, DocumentFormat::Json, "model.json").unwrap();
        assert_eq!(from_yaml, from_json);

        let from_yaml = ProfileSchema::from_value(from_yaml, "model.yaml").unwrap();
        assert_eq!(from_yaml.calculation_strategy(), CalculationStrategy::Fixed);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_value("{not json", DocumentFormat::Json, "broken.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(err.to_string().contains("broken.json"));
    }
}
