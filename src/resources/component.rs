//! The `compass_component` resource.
//!
//! `type` and `cloud_id` are fixed at creation. The API reads back an
//! internal `typeId` rather than the enumeration value that was written, so
//! `read` keeps the type already held in state and only adopts `typeId` when
//! state has no type yet (after an import). Custom fields are sent on create
//! only and are never read back, so state keeps what configuration planned.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{
    ensure_not_found, ensure_success, import_cloud_id, merge_cloud_id, non_empty,
    resolve_cloud_id,
};
use crate::client::CompassClient;
use crate::error::ProviderError;
use crate::graphql::{variables, MutationStatus, Patch, QueryError};
use crate::schema::{Attribute, Schema};

/// Kinds of component accepted by the create mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// A deployed service.
    Service,
    /// A shared library.
    Library,
    /// An end-user application.
    Application,
    /// Infrastructure such as clusters or queues.
    Infrastructure,
    /// A data store.
    Database,
    /// Documentation.
    Documentation,
}

impl ComponentType {
    /// Every accepted value, in API spelling.
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Service,
        ComponentType::Library,
        ComponentType::Application,
        ComponentType::Infrastructure,
        ComponentType::Database,
        ComponentType::Documentation,
    ];

    /// The API spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Service => "SERVICE",
            ComponentType::Library => "LIBRARY",
            ComponentType::Application => "APPLICATION",
            ComponentType::Infrastructure => "INFRASTRUCTURE",
            ComponentType::Database => "DATABASE",
            ComponentType::Documentation => "DOCUMENTATION",
        }
    }

    /// All API spellings, for schemas and error messages.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ComponentType::as_str).collect()
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "invalid component type: {}. Valid values are: {}",
                    s,
                    Self::names().join(", ")
                ))
            })
    }
}

/// Local state of a component, as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComponentState {
    /// Component ARI; `None` until created.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// One of the [`ComponentType`] spellings.
    #[serde(rename = "type", default)]
    pub component_type: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning team id.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Cloud id of the site the component lives in.
    #[serde(default)]
    pub cloud_id: Option<String>,
    /// Custom field values keyed by field name, applied at creation.
    #[serde(default)]
    pub custom_fields: Option<BTreeMap<String, String>>,
}

/// GraphQL documents used by [`ComponentResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentDocuments {
    /// Creates a component and returns its id.
    pub create: &'static str,
    /// Fetches one component by id.
    pub read: &'static str,
    /// Applies a partial update.
    pub update: &'static str,
    /// Deletes a component by id.
    pub delete: &'static str,
}

impl Default for ComponentDocuments {
    fn default() -> Self {
        Self {
            create: r#"
mutation CreateComponent($cloudId: ID!, $input: CreateCompassComponentInput!) {
  compass {
    createComponent(cloudId: $cloudId, input: $input) {
      success
      errors { message }
      componentDetails { id }
    }
  }
}
"#,
            read: r#"
query GetComponent($id: ID!) {
  compass {
    component(id: $id) {
      ... on CompassComponent {
        id
        name
        description
        typeId
        ownerId
      }
      ... on QueryError {
        message
        extensions { statusCode errorType }
      }
    }
  }
}
"#,
            update: r#"
mutation UpdateComponent($input: UpdateCompassComponentInput!) {
  compass {
    updateComponent(input: $input) {
      success
      errors { message }
    }
  }
}
"#,
            delete: r#"
mutation DeleteComponent($input: DeleteCompassComponentInput!) {
  compass {
    deleteComponent(input: $input) {
      success
      errors { message }
    }
  }
}
"#,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation inputs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVariables<'a> {
    cloud_id: &'a str,
    input: CreateInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    component_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_fields: Vec<CustomFieldInput<'a>>,
}

#[derive(Serialize)]
struct CustomFieldInput<'a> {
    key: &'a str,
    value: &'a str,
}

fn custom_field_inputs(fields: Option<&BTreeMap<String, String>>) -> Vec<CustomFieldInput<'_>> {
    fields
        .into_iter()
        .flatten()
        .map(|(key, value)| CustomFieldInput {
            key: key.as_str(),
            value: value.as_str(),
        })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    description: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    owner_id: Patch<String>,
}

impl UpdateInput<'_> {
    fn is_empty(&self) -> bool {
        self.name.is_unchanged() && self.description.is_unchanged() && self.owner_id.is_unchanged()
    }
}

#[derive(Serialize)]
struct InputVariables<T> {
    input: T,
}

#[derive(Serialize)]
struct IdVariables<'a> {
    id: &'a str,
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
#[serde(default)]
struct CompassData<T> {
    compass: Option<T>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CreatePayload {
    create_component: Option<CreateResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CreateResult {
    #[serde(flatten)]
    status: MutationStatus,
    component_details: Option<CreatedComponent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreatedComponent {
    id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ReadPayload {
    component: Option<ComponentNode>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ComponentNode {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    type_id: Option<String>,
    owner_id: Option<String>,
    #[serde(flatten)]
    error: QueryError,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdatePayload {
    update_component: Option<MutationStatus>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DeletePayload {
    delete_component: Option<MutationStatus>,
}

/// Maps `compass_component` lifecycle calls onto the Compass API.
#[derive(Debug, Clone)]
pub struct ComponentResource {
    client: CompassClient,
    documents: ComponentDocuments,
}

impl ComponentResource {
    /// Resource type name registered with the host.
    pub const TYPE_NAME: &'static str = "compass_component";

    /// Create a mapper using the default documents.
    pub fn new(client: CompassClient) -> Self {
        Self {
            client,
            documents: ComponentDocuments::default(),
        }
    }

    /// Replace the GraphQL documents.
    pub fn with_documents(mut self, documents: ComponentDocuments) -> Self {
        self.documents = documents;
        self
    }

    /// The resource schema.
    pub fn schema() -> Schema {
        Schema::new()
            .with_description("A component in the Compass catalog")
            .with_attribute("id", Attribute::computed())
            .with_attribute(
                "name",
                Attribute::required().with_description("Name of the component"),
            )
            .with_attribute(
                "type",
                Attribute::required()
                    .replace_on_change()
                    .with_allowed_values(ComponentType::names())
                    .with_description("Type of the component; fixed after creation"),
            )
            .with_attribute(
                "description",
                Attribute::optional().with_description("Description of the component"),
            )
            .with_attribute(
                "owner_id",
                Attribute::optional().with_description("Owner team id"),
            )
            .with_attribute(
                "cloud_id",
                Attribute::optional_computed()
                    .replace_on_change()
                    .with_description("Cloud id of the site; detected from the provider tenant when unset"),
            )
            .with_attribute(
                "custom_fields",
                Attribute::optional()
                    .string_map()
                    .with_description("Custom field values; sent when the component is created"),
            )
    }

    /// Create the component, then read it back.
    #[instrument(skip(self, planned), name = "component.create", fields(name = %planned.name))]
    pub async fn create(&self, planned: ComponentState) -> Result<ComponentState, ProviderError> {
        let component_type = ComponentType::from_str(&planned.component_type)?;
        let cloud_id = resolve_cloud_id(&self.client, planned.cloud_id.as_deref()).await?;

        let description = planned.description.as_deref().filter(|d| !d.is_empty());
        let owner_id = planned.owner_id.as_deref().filter(|o| !o.is_empty());
        let vars = variables(&CreateVariables {
            cloud_id: &cloud_id,
            input: CreateInput {
                name: &planned.name,
                component_type: component_type.as_str(),
                description,
                owner_id,
                custom_fields: custom_field_inputs(planned.custom_fields.as_ref()),
            },
        })?;

        let data: CompassData<CreatePayload> =
            self.client.execute_as(self.documents.create, vars).await?;
        let result = data.compass.and_then(|c| c.create_component);
        ensure_success(result.as_ref().map(|r| &r.status), "createComponent")?;

        let id = result
            .and_then(|r| r.component_details)
            .and_then(|c| non_empty(c.id))
            .ok_or_else(|| {
                ProviderError::GraphQl("createComponent returned no component id".to_string())
            })?;
        info!(id = %id, "Component created");

        let created = ComponentState {
            id: Some(id.clone()),
            cloud_id: Some(cloud_id),
            component_type: component_type.as_str().to_string(),
            ..planned
        };
        self.read(created).await?.ok_or_else(|| {
            ProviderError::NotFound(format!(
                "component {} was created but could not be read back",
                id
            ))
        })
    }

    /// Refresh state from the API; `None` means the component no longer exists.
    #[instrument(skip(self, current), name = "component.read", fields(id = ?current.id))]
    pub async fn read(
        &self,
        current: ComponentState,
    ) -> Result<Option<ComponentState>, ProviderError> {
        let id = require_id(&current)?;
        let vars = variables(&IdVariables { id })?;
        let data: CompassData<ReadPayload> =
            self.client.execute_as(self.documents.read, vars).await?;

        let Some(node) = data.compass.and_then(|c| c.component) else {
            debug!("Component not returned, clearing state");
            return Ok(None);
        };
        let Some(remote_id) = non_empty(node.id) else {
            ensure_not_found(&node.error, &format!("component {}", id))?;
            debug!(message = ?node.error.message, "Component not found, clearing state");
            return Ok(None);
        };

        let component_type = if current.component_type.is_empty() {
            adopt_type_id(node.type_id.as_deref())
        } else {
            current.component_type
        };

        Ok(Some(ComponentState {
            id: Some(remote_id),
            name: node.name.unwrap_or_default(),
            component_type,
            description: non_empty(node.description),
            owner_id: non_empty(node.owner_id),
            cloud_id: current.cloud_id,
            custom_fields: current.custom_fields,
        }))
    }

    /// Apply changes to name, description and owner, then read back.
    ///
    /// Changing `type` or `cloud_id` is rejected without contacting the API.
    /// Custom field changes are recorded in state but not sent.
    #[instrument(skip(self, prior, planned), name = "component.update", fields(id = ?prior.id))]
    pub async fn update(
        &self,
        prior: ComponentState,
        planned: ComponentState,
    ) -> Result<ComponentState, ProviderError> {
        let id = require_id(&prior)?.to_string();

        let component_type = if prior.component_type.is_empty() {
            ComponentType::from_str(&planned.component_type)?
                .as_str()
                .to_string()
        } else if planned.component_type != prior.component_type {
            return Err(ProviderError::Validation(format!(
                "type cannot be changed from '{}' to '{}'; the component must be replaced",
                prior.component_type, planned.component_type
            )));
        } else {
            prior.component_type.clone()
        };
        let cloud_id = merge_cloud_id(prior.cloud_id.as_deref(), planned.cloud_id.as_deref())?;
        if prior.custom_fields != planned.custom_fields {
            warn!("custom_fields changed; Compass only applies them when a component is created");
        }

        let input = UpdateInput {
            id: &id,
            name: Patch::diff_required(&prior.name, planned.name),
            description: Patch::diff(
                non_empty(prior.description).as_ref(),
                non_empty(planned.description),
            ),
            owner_id: Patch::diff(
                non_empty(prior.owner_id).as_ref(),
                non_empty(planned.owner_id),
            ),
        };

        if input.is_empty() {
            debug!("No updatable fields changed");
        } else {
            let vars = variables(&InputVariables { input })?;
            let data: CompassData<UpdatePayload> =
                self.client.execute_as(self.documents.update, vars).await?;
            ensure_success(
                data.compass.and_then(|c| c.update_component).as_ref(),
                "updateComponent",
            )?;
            info!("Component updated");
        }

        let refreshed = ComponentState {
            id: Some(id.clone()),
            component_type,
            cloud_id,
            custom_fields: planned.custom_fields,
            ..ComponentState::default()
        };
        self.read(refreshed).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("component {} disappeared during update", id))
        })
    }

    /// Delete the component.
    #[instrument(skip(self, current), name = "component.delete", fields(id = ?current.id))]
    pub async fn delete(&self, current: ComponentState) -> Result<(), ProviderError> {
        let id = require_id(&current)?;
        let vars = variables(&InputVariables {
            input: IdVariables { id },
        })?;
        let data: CompassData<DeletePayload> =
            self.client.execute_as(self.documents.delete, vars).await?;
        ensure_success(
            data.compass.and_then(|c| c.delete_component).as_ref(),
            "deleteComponent",
        )?;
        info!("Component deleted");
        Ok(())
    }

    /// Import an existing component by id.
    #[instrument(skip(self), name = "component.import")]
    pub async fn import(&self, id: &str) -> Result<ComponentState, ProviderError> {
        if id.is_empty() {
            return Err(ProviderError::Validation(
                "import id cannot be empty".to_string(),
            ));
        }
        let seed = ComponentState {
            id: Some(id.to_string()),
            cloud_id: import_cloud_id(&self.client).await,
            ..ComponentState::default()
        };
        self.read(seed)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("component {}", id)))
    }
}

fn require_id(state: &ComponentState) -> Result<&str, ProviderError> {
    state
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation("component id is not set".to_string()))
}

fn adopt_type_id(type_id: Option<&str>) -> String {
    match type_id.map(|t| ComponentType::from_str(&t.to_ascii_uppercase())) {
        Some(Ok(component_type)) => component_type.as_str().to_string(),
        Some(Err(_)) => {
            warn!(type_id = ?type_id, "typeId does not name a known component type");
            String::new()
        }
        None => String::new(),
    }
}
