//! The lifecycle interface a host drives.
//!
//! States cross this boundary as JSON objects keyed by schema attribute
//! name. The host owns persistence; the provider only transforms states.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::ImportedResource;
use crate::validation::validate;

/// Lifecycle operations implemented by a provider.
///
/// # Example
///
/// ```ignore
/// use compass_provider::{CompassProvider, ProviderService};
/// use serde_json::json;
///
/// let provider = CompassProvider::new();
/// provider.configure(json!({"email": "dev@example.com", "api_token": "..."})).await?;
/// let state = provider
///     .create("compass_component", json!({"name": "payments", "type": "SERVICE"}))
///     .await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema
    // =========================================================================

    /// Return the provider block schema and every resource schema.
    fn schema(&self) -> ProviderSchema;

    /// Names of the resource types this provider serves.
    fn resource_types(&self) -> Vec<String> {
        self.schema().resources.keys().cloned().collect()
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration against its schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource, &config))
    }

    /// Create a new resource and return its state.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Refresh a resource; `None` means it no longer exists remotely.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Update an existing resource and return its new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Validation(format!(
            "import not supported for resource type: {}",
            resource_type
        )))
    }
}
