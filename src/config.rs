//! Provider block configuration.
//!
//! Values come from the provider block first, then from the `COMPASS_*`
//! environment variables, then from schema defaults. The resolved
//! [`ProviderConfig`] is immutable and shared by every resource mapper.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// Default Compass API host; `/graphql` is appended by the client.
pub const DEFAULT_BASE_URL: &str = "https://api.atlassian.com";

/// How requests authenticate against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Basic base64(email:token)` plus the Compass beta opt-in header.
    #[default]
    Basic,
    /// `Bearer <token>`.
    Bearer,
}

impl AuthScheme {
    /// All configuration spellings, in schema order.
    pub const NAMES: [&'static str; 2] = ["basic", "bearer"];

    /// The configuration spelling of this scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "basic",
            AuthScheme::Bearer => "bearer",
        }
    }
}

impl FromStr for AuthScheme {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AuthScheme::Basic),
            "bearer" => Ok(AuthScheme::Bearer),
            other => Err(ProviderError::Validation(format!(
                "invalid auth_scheme: {}. Valid values are: {}",
                other,
                AuthScheme::NAMES.join(", ")
            ))),
        }
    }
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Atlassian account email; required for [`AuthScheme::Basic`].
    pub email: Option<String>,
    /// API token.
    pub api_token: String,
    /// API host without the `/graphql` path.
    pub base_url: String,
    /// Tenant used to derive cloud ids when resources omit one.
    pub tenant: Option<String>,
    /// Authentication policy for every request.
    pub auth_scheme: AuthScheme,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .field("auth_scheme", &self.auth_scheme)
            .finish()
    }
}

impl ProviderConfig {
    /// Configuration with basic authentication against the default host.
    pub fn new(email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tenant: None,
            auth_scheme: AuthScheme::Basic,
        }
    }

    /// Set the API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the tenant used for cloud id resolution.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set the authentication scheme.
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// The schema of the provider block.
    pub fn schema() -> Schema {
        Schema::new()
            .with_description("Atlassian Compass provider")
            .with_attribute(
                "email",
                Attribute::optional()
                    .with_env("COMPASS_EMAIL")
                    .with_description(
                        "Email address of the Atlassian account. Required with basic auth.",
                    ),
            )
            .with_attribute(
                "api_token",
                Attribute::required()
                    .sensitive()
                    .with_env("COMPASS_API_TOKEN")
                    .with_description("API token for Atlassian Compass."),
            )
            .with_attribute(
                "base_url",
                Attribute::optional()
                    .with_env("COMPASS_BASE_URL")
                    .with_default(DEFAULT_BASE_URL)
                    .with_description("API host; /graphql is appended automatically."),
            )
            .with_attribute(
                "tenant",
                Attribute::optional()
                    .with_env("COMPASS_TENANT")
                    .with_description(
                        "Tenant name used to detect cloud_id, e.g. 'acme' for acme.atlassian.net.",
                    ),
            )
            .with_attribute(
                "auth_scheme",
                Attribute::optional()
                    .with_env("COMPASS_AUTH_SCHEME")
                    .with_default(AuthScheme::Basic.as_str())
                    .with_allowed_values(AuthScheme::NAMES)
                    .with_description("Authentication scheme: basic (email + token) or bearer."),
            )
    }

    /// Resolve configuration from the provider block and the process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_value_with_env(config, |var| std::env::var(var).ok())
    }

    /// Resolve configuration using `env` to look up environment fallbacks.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let schema = Self::schema();
        let resolved = resolve_attributes(&schema, config, env);

        let diagnostics = validate(&schema, &resolved);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let get = |name: &str| {
            resolved
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let auth_scheme = match get("auth_scheme") {
            Some(name) => AuthScheme::from_str(&name)
                .map_err(|e| vec![Diagnostic::from(e).with_attribute("auth_scheme")])?,
            None => AuthScheme::default(),
        };
        let email = get("email");
        if auth_scheme == AuthScheme::Basic && email.is_none() {
            return Err(vec![Diagnostic::error("email is required")
                .with_detail("Basic authentication needs the account email; set email or COMPASS_EMAIL, or use auth_scheme = \"bearer\"")
                .with_attribute("email")]);
        }

        Ok(Self {
            email,
            api_token: get("api_token").unwrap_or_default(),
            base_url: get("base_url").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            tenant: get("tenant"),
            auth_scheme,
        })
    }
}

/// Merge configuration values, environment fallbacks and defaults.
///
/// Empty strings count as unset. Non-string values are passed through so
/// validation can report them.
fn resolve_attributes<F>(schema: &Schema, config: &Value, env: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let Some(obj) = config.as_object() else {
        return config.clone();
    };

    let mut resolved = Map::new();
    for (name, attr) in &schema.attributes {
        let explicit = match obj.get(name) {
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::Null) | None => None,
            Some(other) => Some(other.clone()),
        };
        let value = explicit
            .or_else(|| {
                attr.env
                    .as_deref()
                    .and_then(&env)
                    .filter(|v| !v.is_empty())
                    .map(Value::String)
            })
            .or_else(|| attr.default.clone().map(Value::String));
        if let Some(value) = value {
            resolved.insert(name.clone(), value);
        }
    }
    Value::Object(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolves_explicit_values() {
        let config = ProviderConfig::from_value_with_env(
            &json!({
                "email": "dev@example.com",
                "api_token": "secret",
                "tenant": "acme",
            }),
            no_env,
        )
        .unwrap();

        assert_eq!(config.email.as_deref(), Some("dev@example.com"));
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.tenant.as_deref(), Some("acme"));
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
    }

    #[test]
    fn test_environment_fallback() {
        let env: HashMap<&str, &str> = [
            ("COMPASS_EMAIL", "env@example.com"),
            ("COMPASS_API_TOKEN", "env-token"),
            ("COMPASS_BASE_URL", "https://compass.internal"),
            ("COMPASS_TENANT", "env-tenant"),
        ]
        .into_iter()
        .collect();

        let config = ProviderConfig::from_value_with_env(&json!({"tenant": "explicit"}), |var| {
            env.get(var).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.email.as_deref(), Some("env@example.com"));
        assert_eq!(config.api_token, "env-token");
        assert_eq!(config.base_url, "https://compass.internal");
        assert_eq!(config.tenant.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_missing_token_is_reported() {
        let diagnostics =
            ProviderConfig::from_value_with_env(&json!({"email": "dev@example.com"}), no_env)
                .unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_token"));
    }

    #[test]
    fn test_basic_auth_requires_email() {
        let diagnostics =
            ProviderConfig::from_value_with_env(&json!({"api_token": "secret"}), no_env)
                .unwrap_err();
        assert_eq!(diagnostics[0].summary, "email is required");
    }

    #[test]
    fn test_bearer_auth_without_email() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"api_token": "secret", "auth_scheme": "bearer"}),
            no_env,
        )
        .unwrap();
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert!(config.email.is_none());
    }

    #[test]
    fn test_invalid_auth_scheme() {
        let diagnostics = ProviderConfig::from_value_with_env(
            &json!({"api_token": "secret", "email": "a@b.c", "auth_scheme": "oauth"}),
            no_env,
        )
        .unwrap_err();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("auth_scheme"));
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"email": "a@b.c", "api_token": "secret", "base_url": "", "tenant": ""}),
            no_env,
        )
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.tenant.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::new("a@b.c", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
