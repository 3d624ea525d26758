//! GraphQL envelope types and input helpers.
//!
//! Requests are `{query, variables}` with `variables` omitted when empty.
//! Responses are `{data, errors}`; a non-empty `errors` list always wins over
//! `data`.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Request body posted to the GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest<'a> {
    /// The GraphQL document.
    pub query: &'a str,
    /// Operation variables, omitted from the body when empty.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

/// Response envelope returned by every GraphQL call.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct GraphQlResponse {
    /// The opaque success payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors reported by the API, in order.
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

impl GraphQlResponse {
    /// All error messages joined with `"; "`, or `None` when there are none.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// One entry of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlErrorEntry {
    /// Human-readable message.
    pub message: String,
    /// Source locations in the query document.
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Path to the failing field.
    #[serde(default)]
    pub path: Vec<Value>,
    /// Vendor-specific extensions.
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

/// A line/column position in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Location {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// Error entry embedded in Compass mutation payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadError {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// The `{success, errors}` part shared by Compass mutation payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct MutationStatus {
    /// Whether the mutation was applied.
    #[serde(default)]
    pub success: bool,
    /// Errors describing why it was not.
    #[serde(default)]
    pub errors: Option<Vec<PayloadError>>,
}

impl MutationStatus {
    /// Describe a failed mutation, including any payload errors.
    pub fn failure_message(&self, operation: &str) -> String {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .flatten()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        if messages.is_empty() {
            format!("{} returned success=false", operation)
        } else {
            format!("{} returned success=false: {}", operation, messages.join("; "))
        }
    }
}

/// The `QueryError` union member Compass returns in place of a queried entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct QueryError {
    /// Human-readable message.
    pub message: Option<String>,
    /// Status details; Compass sends a list even for a single error.
    pub extensions: Option<Vec<QueryErrorExtension>>,
}

/// One entry of a [`QueryError`]'s `extensions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryErrorExtension {
    /// HTTP-style status of the failed lookup.
    pub status_code: Option<u16>,
    /// Machine-readable error class, e.g. `NOT_FOUND`.
    pub error_type: Option<String>,
}

impl QueryError {
    /// Whether any field of the error was returned.
    pub fn is_present(&self) -> bool {
        self.message.is_some() || self.extensions.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Whether the error reports that the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.extensions
            .iter()
            .flatten()
            .any(|e| e.status_code == Some(404))
    }
}

/// A field of a partial update input.
///
/// `Unchanged` fields are skipped entirely (pair with
/// `#[serde(skip_serializing_if = "Patch::is_unchanged")]`), `Set` sends the
/// new value and `Clear` sends an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Leave the remote value alone.
    #[default]
    Unchanged,
    /// Replace the remote value.
    Set(T),
    /// Reset the remote value to null.
    Clear,
}

impl<T: PartialEq> Patch<T> {
    /// Compute the patch turning `prior` into `planned`.
    pub fn diff(prior: Option<&T>, planned: Option<T>) -> Self {
        match planned {
            Some(value) if prior == Some(&value) => Patch::Unchanged,
            Some(value) => Patch::Set(value),
            None if prior.is_some() => Patch::Clear,
            None => Patch::Unchanged,
        }
    }

    /// Compute the patch for a required field, which can change but never clear.
    pub fn diff_required(prior: &T, planned: T) -> Self {
        if *prior == planned {
            Patch::Unchanged
        } else {
            Patch::Set(planned)
        }
    }
}

impl<T> Patch<T> {
    /// Whether the field should be left out of the input.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Unchanged | Patch::Clear => serializer.serialize_none(),
        }
    }
}

/// Turn a `Serialize` input struct into a variables map.
///
/// Non-object values produce an empty map.
pub fn variables<T: Serialize>(input: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(input)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
