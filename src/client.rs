//! GraphQL transport client.
//!
//! One [`CompassClient::execute`] call is one HTTP POST to
//! `{base_url}/graphql`. The client holds only immutable configuration and a
//! `reqwest::Client`, so it is cheap to clone and safe to share between
//! concurrent lifecycle calls.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::{AuthScheme, ProviderConfig};
use crate::error::ProviderError;
use crate::graphql::{GraphQlRequest, GraphQlResponse};

/// Fixed bound on every round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Path appended to the configured base URL.
pub const GRAPHQL_PATH: &str = "/graphql";

/// Opt-in header required by the Compass beta schema under basic auth.
pub const EXPERIMENTAL_API_HEADER: &str = "x-experimentalapi";

const EXPERIMENTAL_API_VALUE: &str = "compass-beta";

/// Client for the Compass GraphQL endpoint.
#[derive(Clone)]
pub struct CompassClient {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
    tenant: Option<String>,
}

impl std::fmt::Debug for CompassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompassClient")
            .field("endpoint", &self.endpoint)
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl CompassClient {
    /// Build a client from resolved provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when credentials are missing
    /// for the chosen scheme, cannot be encoded as header values, or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config.base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ProviderError::Configuration(
                "base_url cannot be empty".to_string(),
            ));
        }
        if config.api_token.is_empty() {
            return Err(ProviderError::Configuration(
                "api_token cannot be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", base_url, GRAPHQL_PATH),
            headers: auth_headers(config)?,
            tenant: config.tenant.clone(),
        })
    }

    /// The full GraphQL endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The tenant configured on the provider, if any.
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Execute a GraphQL document and return the raw `data` payload.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Validation`] if `query` is blank
    /// - [`ProviderError::Transport`] if the request fails or the body is not an envelope
    /// - [`ProviderError::Http`] on a non-success status, carrying the raw body
    /// - [`ProviderError::GraphQl`] if the envelope lists errors
    #[instrument(skip_all, name = "graphql.execute", fields(operation = operation_name(query)))]
    pub async fn execute(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::Validation(
                "GraphQL document cannot be empty".to_string(),
            ));
        }

        let request = GraphQlRequest { query, variables };
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::transport("failed to execute request", e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport("failed to read response body", e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "GraphQL request rejected");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let envelope: GraphQlResponse = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::transport("failed to decode response envelope", e))?;

        if let Some(message) = envelope.error_message() {
            debug!(errors = envelope.errors.len(), "GraphQL errors returned");
            return Err(ProviderError::GraphQl(message));
        }

        debug!("GraphQL request completed");
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Execute a GraphQL document and decode `data` into `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<T, ProviderError> {
        let data = self.execute(query, variables).await?;
        Ok(serde_json::from_value(data)?)
    }
}

fn auth_headers(config: &ProviderConfig) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let authorization = match config.auth_scheme {
        AuthScheme::Basic => {
            let email = config.email.as_deref().unwrap_or_default();
            if email.is_empty() {
                return Err(ProviderError::Configuration(
                    "email cannot be empty with basic auth".to_string(),
                ));
            }
            headers.insert(
                EXPERIMENTAL_API_HEADER,
                HeaderValue::from_static(EXPERIMENTAL_API_VALUE),
            );
            format!(
                "Basic {}",
                BASE64.encode(format!("{}:{}", email, config.api_token))
            )
        }
        AuthScheme::Bearer => format!("Bearer {}", config.api_token),
    };

    let mut value = HeaderValue::from_str(&authorization).map_err(|_| {
        ProviderError::Configuration("credentials contain invalid header characters".to_string())
    })?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// The operation name of a document (`query GetComponent(...)` → `GetComponent`).
fn operation_name(query: &str) -> &str {
    query
        .split_whitespace()
        .skip_while(|word| *word != "query" && *word != "mutation")
        .nth(1)
        .map(|name| name.split(['(', '{']).next().unwrap_or(name))
        .filter(|name| !name.is_empty())
        .unwrap_or("anonymous")
}
