//! Configuration checks run before any request is sent.
//!
//! Bad enumeration values and missing attributes come back as
//! [`Diagnostic`](crate::schema::Diagnostic)s instead of API errors.
//!
//! # Example
//!
//! ```
//! use compass_provider::schema::{Attribute, Schema};
//! use compass_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .with_attribute("name", Attribute::required())
//!     .with_attribute("type", Attribute::required().with_allowed_values(["SERVICE"]));
//!
//! assert!(validate(&schema, &json!({"name": "api", "type": "SERVICE"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "api", "type": "WIDGET"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("type".to_string()));
//! ```

use crate::schema::{Attribute, AttributeKind, Diagnostic, Schema};
use serde_json::Value;

/// Check a configuration object against `schema`.
///
/// Every attribute configuration may set has to hold a string, or an
/// object of strings for [`AttributeKind::StringMap`]. Required ones must
/// be present and non-null, and enumerations must hold one of their
/// allowed values. Attributes only the provider sets are not
/// inspected. An empty result means the configuration is acceptable.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let Value::Object(fields) = value else {
        return vec![Diagnostic::error("Expected object")
            .with_detail(format!("Got {}", json_kind(value)))];
    };

    schema
        .attributes
        .iter()
        .filter(|(_, attr)| attr.is_settable())
        .filter_map(|(name, attr)| check_attribute(name, attr, fields.get(name)))
        .collect()
}

/// [`validate`], but as a `Result` so callers can use `?`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn check_attribute(name: &str, attr: &Attribute, value: Option<&Value>) -> Option<Diagnostic> {
    let diagnostic = match value {
        None | Some(Value::Null) if attr.is_required() => {
            Diagnostic::error(format!("Missing required attribute '{name}'"))
                .with_detail("Set it in configuration or through its environment variable")
        }
        None | Some(Value::Null) => return None,
        Some(Value::Object(entries)) if attr.kind == AttributeKind::StringMap => {
            let (key, other) = entries.iter().find(|(_, v)| !v.is_string())?;
            return Some(
                Diagnostic::error(format!("Type mismatch for '{name}.{key}'"))
                    .with_detail(format!("Expected string, got {}", json_kind(other)))
                    .with_attribute(format!("{name}.{key}")),
            );
        }
        Some(other) if attr.kind == AttributeKind::StringMap => {
            Diagnostic::error(format!("Type mismatch for '{name}'"))
                .with_detail(format!("Expected map of strings, got {}", json_kind(other)))
        }
        Some(Value::String(s)) => {
            if attr.allowed_values.is_empty() || attr.allowed_values.contains(s) {
                return None;
            }
            Diagnostic::error(format!("Invalid value '{s}' for '{name}'"))
                .with_detail(format!("Valid values are: {}", attr.allowed_values.join(", ")))
        }
        Some(other) => Diagnostic::error(format!("Type mismatch for '{name}'"))
            .with_detail(format!("Expected string, got {}", json_kind(other))),
    };
    Some(diagnostic.with_attribute(name))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
