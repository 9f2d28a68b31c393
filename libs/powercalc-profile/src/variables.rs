//! Custom field variable validation and placeholder substitution
//!
//! A profile declaring custom fields is only usable once every field is bound
//! to a value, and nothing else is bound. Bound values are then written into
//! the profile document wherever a `[[field]]` placeholder appears.

use serde_json::Value;

use crate::error::{LibraryError, Result};
use crate::identity::VariableMapping;

const PLACEHOLDER_OPEN: &str = "[[";
const PLACEHOLDER_CLOSE: &str = "]]";

/// Check that `supplied` binds exactly the `declared` field names.
///
/// Missing fields are reported in declaration order, unexpected ones in
/// mapping order. Both directions are reported in a single error.
pub fn validate_variables<'a, I>(declared: I, supplied: &VariableMapping) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let declared: Vec<&str> = declared.into_iter().collect();

    let missing: Vec<String> = declared
        .iter()
        .filter(|key| !supplied.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    let unexpected: Vec<String> = supplied
        .keys()
        .filter(|key| !declared.contains(&key.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    Err(LibraryError::variables(missing, unexpected))
}

/// Field names declared by a raw profile document's `fields` object.
pub fn declared_field_keys(profile_json: &Value) -> Result<Vec<&str>> {
    match profile_json.get("fields") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(fields)) => Ok(fields.keys().map(String::as_str).collect()),
        Some(_) => Err(LibraryError::parse("profile", "'fields' must be an object")),
    }
}

/// Replace `[[field]]` placeholders in every string of `value`.
///
/// Object keys are left alone, as are placeholders naming unbound fields.
pub fn substitute_placeholders(value: &Value, variables: &VariableMapping) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(s, variables)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_placeholders(item, variables))
                .collect(),
        ),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), substitute_placeholders(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(input: &str, variables: &VariableMapping) -> String {
    if !input.contains(PLACEHOLDER_OPEN) {
        return input.to_string();
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[start + PLACEHOLDER_OPEN.len()..];
        let Some(end) = after.find(PLACEHOLDER_CLOSE) else {
            break;
        };

        output.push_str(&rest[..start]);
        match variables.get(after[..end].trim()) {
            Some(bound) => output.push_str(bound),
            None => output.push_str(
                &rest[start..start + PLACEHOLDER_OPEN.len() + end + PLACEHOLDER_CLOSE.len()],
            ),
        }
        rest = &after[end + PLACEHOLDER_CLOSE.len()..];
    }
    output.push_str(rest);
    output
}
