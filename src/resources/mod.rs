//! Resource mappers translating lifecycle calls into Compass GraphQL operations.
//!
//! Each mapper owns its GraphQL documents and talks to the API through a
//! shared [`CompassClient`]. `read` returns `None` when the remote entity is
//! gone, which the host treats as "remove from state".

pub mod component;
pub mod component_link;

pub use component::{ComponentDocuments, ComponentResource, ComponentState, ComponentType};
pub use component_link::{
    split_import_id, ComponentLinkResource, ComponentLinkState, LinkDocuments, LinkType,
};

use tracing::{debug, warn};

use crate::client::CompassClient;
use crate::error::ProviderError;
use crate::graphql::{MutationStatus, QueryError};

/// Pick the cloud id for a resource: the explicit value, else the provider tenant.
///
/// Fails with [`ProviderError::Validation`] before any request when neither is set.
pub(crate) async fn resolve_cloud_id(
    client: &CompassClient,
    explicit: Option<&str>,
) -> Result<String, ProviderError> {
    if let Some(cloud_id) = explicit.filter(|id| !id.is_empty()) {
        return Ok(cloud_id.to_string());
    }
    let Some(tenant) = client.tenant() else {
        return Err(ProviderError::Validation(
            "cloud_id is required when tenant is not configured in provider".to_string(),
        ));
    };
    debug!(tenant = %tenant, "Detecting cloud_id from tenant");
    client.resolve_cloud_id(tenant).await.map_err(|e| match e {
        ProviderError::NotFound(msg) => {
            ProviderError::NotFound(format!("failed to get cloud_id from tenant: {}", msg))
        }
        other => other,
    })
}

/// Cloud id recorded for an imported resource: the tenant's, when one is configured.
///
/// A failed lookup is logged and leaves the cloud id unset.
pub(crate) async fn import_cloud_id(client: &CompassClient) -> Option<String> {
    client.tenant()?;
    match resolve_cloud_id(client, None).await {
        Ok(cloud_id) => Some(cloud_id),
        Err(e) => {
            warn!(error = %e, "Could not fill cloud_id from tenant");
            None
        }
    }
}

/// Reject a cloud id change; an unset or empty planned value keeps the prior one.
pub(crate) fn merge_cloud_id(
    prior: Option<&str>,
    planned: Option<&str>,
) -> Result<Option<String>, ProviderError> {
    let prior = prior.filter(|p| !p.is_empty());
    let planned = planned.filter(|p| !p.is_empty());
    match (prior, planned) {
        (Some(prior), Some(planned)) if prior != planned => Err(ProviderError::Validation(
            format!(
                "cloud_id cannot be changed from '{}' to '{}'; the resource must be replaced",
                prior, planned
            ),
        )),
        (_, Some(planned)) => Ok(Some(planned.to_string())),
        (prior, None) => Ok(prior.map(str::to_string)),
    }
}

/// Fail unless the mutation payload reports success.
pub(crate) fn ensure_success(
    status: Option<&MutationStatus>,
    operation: &str,
) -> Result<(), ProviderError> {
    match status {
        Some(status) if status.success => Ok(()),
        Some(status) => Err(ProviderError::GraphQl(status.failure_message(operation))),
        None => Err(ProviderError::GraphQl(format!(
            "{} returned no payload",
            operation
        ))),
    }
}

/// Decide what a lookup that returned no entity means.
///
/// No error, or a `QueryError` with status 404, means the entity is gone.
/// Any other `QueryError` fails with [`ProviderError::GraphQl`].
pub(crate) fn ensure_not_found(error: &QueryError, subject: &str) -> Result<(), ProviderError> {
    if !error.is_present() || error.is_not_found() {
        return Ok(());
    }
    Err(ProviderError::GraphQl(format!(
        "reading {} failed: {}",
        subject,
        error.message.as_deref().unwrap_or("query error without message")
    )))
}

/// Treat empty strings from the API or configuration as unset.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
