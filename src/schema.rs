//! Schema types for describing the provider block and its resources.
//!
//! Compass attributes are strings or string-to-string maps, so an
//! [`Attribute`] only records its [`AttributeKind`], who may set it, an
//! optional fixed set of allowed values, and the environment variable or
//! default used when the configuration leaves it unset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Must be set in configuration.
    Required,
    /// May be set in configuration.
    Optional,
    /// Only ever set by the provider.
    Computed,
    /// May be set; the provider fills it in otherwise.
    OptionalComputed,
}

/// Shape of an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// A single string.
    #[default]
    String,
    /// An object whose values are all strings.
    StringMap,
}

/// A single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Shape of the value.
    #[serde(default)]
    pub kind: AttributeKind,
    /// Who supplies the value.
    pub presence: Presence,
    /// Hidden from logs and plan output.
    #[serde(default)]
    pub sensitive: bool,
    /// Shown to users of the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Changing the value replaces the remote object instead of updating it.
    #[serde(default)]
    pub replace_on_change: bool,
    /// Accepted values when the attribute is an enumeration; empty accepts anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Environment variable consulted when configuration leaves the attribute unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Used when neither configuration nor environment provide a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Attribute {
    fn with_presence(presence: Presence) -> Self {
        Self {
            kind: AttributeKind::String,
            presence,
            sensitive: false,
            description: None,
            replace_on_change: false,
            allowed_values: Vec::new(),
            env: None,
            default: None,
        }
    }

    /// Set by the user; configuration is rejected without it.
    pub fn required() -> Self {
        Self::with_presence(Presence::Required)
    }

    /// Set by the user, or left out.
    pub fn optional() -> Self {
        Self::with_presence(Presence::Optional)
    }

    /// Reported by the provider only.
    pub fn computed() -> Self {
        Self::with_presence(Presence::Computed)
    }

    /// Set by the user, or filled in by the provider.
    pub fn optional_computed() -> Self {
        Self::with_presence(Presence::OptionalComputed)
    }

    /// Whether configuration must carry a value.
    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Whether configuration is allowed to carry a value at all.
    pub fn is_settable(&self) -> bool {
        self.presence != Presence::Computed
    }

    /// Whether the provider may report a value the configuration did not set.
    pub fn is_computed(&self) -> bool {
        matches!(self.presence, Presence::Computed | Presence::OptionalComputed)
    }

    /// Hold a map of strings instead of a single string.
    pub fn string_map(mut self) -> Self {
        self.kind = AttributeKind::StringMap;
        self
    }

    /// Attach user-facing help text.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Changing the value means the remote object is destroyed and recreated.
    pub fn replace_on_change(mut self) -> Self {
        self.replace_on_change = true;
        self
    }

    /// Accept only the given values.
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Read `var` from the environment when configuration leaves this unset.
    pub fn with_env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    /// Fallback after configuration and environment.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Keep the value out of logs and plan output.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Attributes of a resource or of the provider block, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Shown to users of the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keyed by attribute name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe the resource or block as a whole.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Add or replace the attribute called `name`.
    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// The attribute called `name`, if the schema has one.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// The provider block schema together with every resource schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The provider block.
    #[serde(default)]
    pub provider: Schema,
    /// Keyed by resource type name, e.g. `compass_component`.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// A provider schema with no resources yet.
    pub fn new(provider: Schema) -> Self {
        Self {
            provider,
            resources: BTreeMap::new(),
        }
    }

    /// Register the schema of `type_name`.
    pub fn with_resource(mut self, type_name: &str, schema: Schema) -> Self {
        self.resources.insert(type_name.to_string(), schema);
        self
    }
}

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The call did not take effect.
    Error,
    /// The call went through but something deserves attention.
    Warning,
}

/// A problem reported back to the host instead of failing the call outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One line saying what is wrong.
    pub summary: String,
    /// Longer explanation or a hint on how to fix it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Name of the offending attribute, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    /// Attach a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point the diagnostic at an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Whether the severity is [`DiagnosticSeverity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
