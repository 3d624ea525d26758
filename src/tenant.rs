//! Tenant name to cloud id resolution.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::CompassClient;
use crate::error::ProviderError;
use crate::graphql::variables;

/// Domain appended to bare tenant names.
pub const TENANT_DOMAIN_SUFFIX: &str = ".atlassian.net";

const TENANT_CONTEXTS_QUERY: &str = r#"
query GetCloudId($hostNames: [String!]!) {
  tenantContexts(hostNames: $hostNames) {
    cloudId
  }
}
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TenantContextsVariables<'a> {
    host_names: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantContextsData {
    #[serde(default)]
    tenant_contexts: Option<Vec<TenantContext>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantContext {
    #[serde(default)]
    cloud_id: Option<String>,
}

/// Turn a tenant name into the hostname the API expects.
///
/// `acme` becomes `acme.atlassian.net`; names containing a dot pass through.
pub fn tenant_host(tenant: &str) -> String {
    if tenant.contains('.') {
        tenant.to_string()
    } else {
        format!("{}{}", tenant, TENANT_DOMAIN_SUFFIX)
    }
}

impl CompassClient {
    /// Resolve a tenant name to its cloud id.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] when the API returns no context for
    /// the host or an empty cloud id, and [`ProviderError::Validation`] for an
    /// empty tenant name.
    #[instrument(skip(self), name = "tenant.resolve_cloud_id")]
    pub async fn resolve_cloud_id(&self, tenant: &str) -> Result<String, ProviderError> {
        if tenant.trim().is_empty() {
            return Err(ProviderError::Validation(
                "tenant cannot be empty".to_string(),
            ));
        }

        let host = tenant_host(tenant);
        let vars = variables(&TenantContextsVariables { host_names: [host.as_str()] })?;
        let data: TenantContextsData = self.execute_as(TENANT_CONTEXTS_QUERY, vars).await?;

        let cloud_id = data
            .tenant_contexts
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|ctx| ctx.cloud_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::NotFound(format!("tenant '{}' not found or inaccessible", host))
            })?;

        debug!(host = %host, "Resolved cloud id");
        Ok(cloud_id)
    }
}
