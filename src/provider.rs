//! The Compass provider: configuration plus dispatch to resource mappers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::client::CompassClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{ComponentLinkResource, ComponentResource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, ResourceType};

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Mappers built by a successful `configure`.
#[derive(Debug)]
struct Configured {
    components: ComponentResource,
    links: ComponentLinkResource,
}

/// Provider for Atlassian Compass components and component links.
pub struct CompassProvider {
    configured: RwLock<Option<Arc<Configured>>>,
    env: EnvLookup,
}

impl fmt::Debug for CompassProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompassProvider").finish_non_exhaustive()
    }
}

impl Default for CompassProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CompassProvider {
    /// A provider reading environment fallbacks from the process environment.
    pub fn new() -> Self {
        Self::with_env(|var| std::env::var(var).ok())
    }

    /// A provider reading environment fallbacks through `env`.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            configured: RwLock::new(None),
            env: Arc::new(env),
        }
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.configured.read().await.is_some()
    }

    async fn configured(&self) -> Result<Arc<Configured>, ProviderError> {
        self.configured.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider is not configured; call configure first".to_string(),
            )
        })
    }

    fn resolve_config(&self, config: &Value) -> Result<ProviderConfig, Vec<Diagnostic>> {
        let env = Arc::clone(&self.env);
        ProviderConfig::from_value_with_env(config, move |var| env(var))
    }
}

fn decode<T: DeserializeOwned>(state: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(state)?)
}

fn encode<T: Serialize>(state: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

#[async_trait::async_trait]
impl ProviderService for CompassProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new(ProviderConfig::schema())
            .with_resource(ComponentResource::TYPE_NAME, ComponentResource::schema())
            .with_resource(
                ComponentLinkResource::TYPE_NAME,
                ComponentLinkResource::schema(),
            )
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resolve_config(&config).err().unwrap_or_default())
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let provider_config = match self.resolve_config(&config) {
            Ok(provider_config) => provider_config,
            Err(diagnostics) => {
                error!(count = diagnostics.len(), "Invalid provider configuration");
                return Ok(diagnostics);
            }
        };

        let client = match CompassClient::new(&provider_config) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Failed to build Compass client");
                return Ok(vec![Diagnostic::from(e)]);
            }
        };

        info!(
            base_url = %provider_config.base_url,
            tenant = ?provider_config.tenant,
            auth_scheme = provider_config.auth_scheme.as_str(),
            "Provider configured"
        );
        let configured = Configured {
            components: ComponentResource::new(client.clone()),
            links: ComponentLinkResource::new(client),
        };
        *self.configured.write().await = Some(Arc::new(configured));
        Ok(vec![])
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = ResourceType::from_str(resource_type)?;
        let configured = self.configured().await?;
        match kind {
            ResourceType::Component => {
                encode(&configured.components.create(decode(planned_state)?).await?)
            }
            ResourceType::ComponentLink => {
                encode(&configured.links.create(decode(planned_state)?).await?)
            }
        }
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let kind = ResourceType::from_str(resource_type)?;
        let configured = self.configured().await?;
        let refreshed = match kind {
            ResourceType::Component => configured
                .components
                .read(decode(current_state)?)
                .await?
                .map(|state| encode(&state))
                .transpose()?,
            ResourceType::ComponentLink => configured
                .links
                .read(decode(current_state)?)
                .await?
                .map(|state| encode(&state))
                .transpose()?,
        };
        if refreshed.is_none() {
            debug!("Resource no longer exists");
        }
        Ok(refreshed)
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = ResourceType::from_str(resource_type)?;
        let configured = self.configured().await?;
        match kind {
            ResourceType::Component => encode(
                &configured
                    .components
                    .update(decode(prior_state)?, decode(planned_state)?)
                    .await?,
            ),
            ResourceType::ComponentLink => encode(
                &configured
                    .links
                    .update(decode(prior_state)?, decode(planned_state)?)
                    .await?,
            ),
        }
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let kind = ResourceType::from_str(resource_type)?;
        let configured = self.configured().await?;
        match kind {
            ResourceType::Component => configured.components.delete(decode(current_state)?).await,
            ResourceType::ComponentLink => configured.links.delete(decode(current_state)?).await,
        }
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind = ResourceType::from_str(resource_type)?;
        let configured = self.configured().await?;
        let state = match kind {
            ResourceType::Component => encode(&configured.components.import(id).await?)?,
            ResourceType::ComponentLink => encode(&configured.links.import(id).await?)?,
        };
        Ok(vec![ImportedResource::new(kind.as_str(), state)])
    }
}
