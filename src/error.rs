//! Error types for the Compass provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Boxed cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while serving a lifecycle call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A configuration value or lifecycle input was rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not configured, or its configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The HTTP round trip failed (DNS, TCP, TLS, timeout, undecodable body).
    #[error("Transport error: {message}: {source}")]
    Transport {
        /// What the client was doing when the failure happened.
        message: String,
        /// The underlying cause.
        #[source]
        source: BoxError,
    },

    /// The API answered with a non-success HTTP status.
    #[error("HTTP error: status {status}: {body}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The raw response body, kept for diagnostics.
        body: String,
    },

    /// The API reported one or more errors in the response envelope or mutation payload.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The requested entity or tenant was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A created entity could not be identified unambiguously afterwards.
    #[error("Ambiguous create: {0}")]
    AmbiguousCreate(String),

    /// A payload did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),
}

impl ProviderError {
    /// Build a [`ProviderError::Transport`] from a context message and its cause.
    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Get the error message as a string.
    ///
    /// Variants that wrap a foreign error return a short fixed description;
    /// the full chain is available through `Display` and `source()`.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::Transport { message, .. } => message,
            Self::Http { body, .. } => body,
            Self::GraphQl(msg) => msg,
            Self::NotFound(msg) => msg,
            Self::AmbiguousCreate(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::UnknownResource(msg) => msg,
        }
    }

    /// Whether the failure happened before any request reached the API.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Configuration(_))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            ProviderError::AmbiguousCreate(_) => diagnostic.with_detail(
                "The link may exist remotely without being tracked. \
                 Import it with `component_id:link_id` or delete it manually.",
            ),
            ProviderError::Http { status, .. } if status == 401 || status == 403 => diagnostic
                .with_detail("Check the email, api_token and auth_scheme provider settings."),
            _ => diagnostic,
        }
    }
}
