//! The `compass_component_link` resource.
//!
//! The create mutation returns only a success flag, so the new link is
//! identified by listing the owning component's links afterwards and
//! matching on the planned attributes. A create that cannot be identified
//! unambiguously fails with [`ProviderError::AmbiguousCreate`] naming the
//! candidates, since the link may exist remotely without being tracked.

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

/// Kinds of link accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// A document, e.g. a runbook.
    Document,
    /// A chat channel.
    ChatChannel,
    /// A source repository.
    Repository,
    /// A project tracker.
    Project,
    /// A dashboard.
    Dashboard,
    /// An on-call schedule.
    OnCall,
    /// Anything else.
    OtherLink,
}

impl LinkType {
    /// Every accepted value, in API spelling.
    pub const ALL: [LinkType; 7] = [
        LinkType::Document,
        LinkType::ChatChannel,
        LinkType::Repository,
        LinkType::Project,
        LinkType::Dashboard,
        LinkType::OnCall,
        LinkType::OtherLink,
    ];

    /// The API spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Document => "DOCUMENT",
            LinkType::ChatChannel => "CHAT_CHANNEL",
            LinkType::Repository => "REPOSITORY",
            LinkType::Project => "PROJECT",
            LinkType::Dashboard => "DASHBOARD",
            LinkType::OnCall => "ON_CALL",
            LinkType::OtherLink => "OTHER_LINK",
        }
    }

    /// All API spellings, for schemas and error messages.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(LinkType::as_str).collect()
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "invalid link type: {}. Valid values are: {}",
                    s,
                    Self::names().join(", ")
                ))
            })
    }
}

/// Local state of a component link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComponentLinkState {
    /// Link id; `None` until identified after create.
    #[serde(default)]
    pub id: Option<String>,
    /// Id of the owning component.
    #[serde(default)]
    pub component_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// One of the [`LinkType`] spellings.
    #[serde(rename = "type", default)]
    pub link_type: String,
    /// Target URL.
    #[serde(default)]
    pub url: String,
    /// Id of the linked object in its own system.
    #[serde(default)]
    pub object_id: Option<String>,
    /// Cloud id of the site.
    #[serde(default)]
    pub cloud_id: Option<String>,
}

/// GraphQL documents used by [`ComponentLinkResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDocuments {
    /// Attaches a link to a component; returns success only.
    pub create: &'static str,
    /// Lists the links of one component.
    pub list: &'static str,
    /// Applies a partial update.
    pub update: &'static str,
    /// Detaches a link.
    pub delete: &'static str,
}

impl Default for LinkDocuments {
    fn default() -> Self {
        Self {
            create: r#"
mutation CreateComponentLink($input: CreateCompassComponentLinkInput!) {
  compass {
    createComponentLink(input: $input) {
      success
      errors { message }
    }
  }
}
"#,
            list: r#"
query GetComponentLinks($componentId: ID!) {
  compass {
    component(id: $componentId) {
      ... on CompassComponent {
        id
        links {
          id
          name
          type
          url
          objectId
        }
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
mutation UpdateComponentLink($input: UpdateCompassComponentLinkInput!) {
  compass {
    updateComponentLink(input: $input) {
      success
      errors { message }
    }
  }
}
"#,
            delete: r#"
mutation DeleteComponentLink($input: DeleteCompassComponentLinkInput!) {
  compass {
    deleteComponentLink(input: $input) {
      success
      errors { message }
    }
  }
}
"#,
        }
    }
}

/// Split an import id into `(component_id, link_id)`.
///
/// The separator is the last `:` or `/`, since component ids are ARIs that
/// contain both characters themselves.
pub fn split_import_id(id: &str) -> Result<(&str, &str), ProviderError> {
    let invalid = || {
        ProviderError::Validation(format!(
            "invalid import id '{}': expected component_id:link_id or component_id/link_id",
            id
        ))
    };
    let pos = id.rfind([':', '/']).ok_or_else(invalid)?;
    let (component_id, link_id) = (&id[..pos], &id[pos + 1..]);
    if component_id.is_empty() || link_id.is_empty() {
        return Err(invalid());
    }
    Ok((component_id, link_id))
}

// ---------------------------------------------------------------------------
// Operation inputs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct InputVariables<T> {
    input: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComponentIdVariables<'a> {
    component_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput<'a> {
    component_id: &'a str,
    link: NewLink<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewLink<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    link_type: &'static str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput<'a> {
    component_id: &'a str,
    link: LinkPatch<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkPatch<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    name: Patch<String>,
    #[serde(rename = "type", skip_serializing_if = "Patch::is_unchanged")]
    link_type: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    url: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unchanged")]
    object_id: Patch<String>,
}

impl LinkPatch<'_> {
    fn is_empty(&self) -> bool {
        self.name.is_unchanged()
            && self.link_type.is_unchanged()
            && self.url.is_unchanged()
            && self.object_id.is_unchanged()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteInput<'a> {
    component_id: &'a str,
    link: &'a str,
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
    create_component_link: Option<MutationStatus>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdatePayload {
    update_component_link: Option<MutationStatus>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DeletePayload {
    delete_component_link: Option<MutationStatus>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListPayload {
    component: Option<ComponentLinks>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ComponentLinks {
    links: Option<Vec<RemoteLink>>,
    #[serde(flatten)]
    error: QueryError,
}

/// A link as listed on its component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RemoteLink {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub url: Option<String>,
    pub object_id: Option<String>,
}

/// Find the link a create produced among the component's links.
///
/// Matches on name, type, url and object id; a missing and an empty object
/// id are equal. Anything other than exactly one match is an error listing
/// the candidates.
pub(crate) fn find_created_link(
    links: &[RemoteLink],
    planned: &ComponentLinkState,
) -> Result<String, ProviderError> {
    let planned_object = planned.object_id.as_deref().unwrap_or_default();
    let matches: Vec<&str> = links
        .iter()
        .filter(|l| l.name.as_deref() == Some(planned.name.as_str()))
        .filter(|l| l.link_type.as_deref() == Some(planned.link_type.as_str()))
        .filter(|l| l.url.as_deref() == Some(planned.url.as_str()))
        .filter(|l| l.object_id.as_deref().unwrap_or_default() == planned_object)
        .filter_map(|l| l.id.as_deref().filter(|id| !id.is_empty()))
        .collect();

    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(ProviderError::AmbiguousCreate(format!(
            "link '{}' was created on component {} but no listed link matches it",
            planned.name, planned.component_id
        ))),
        many => Err(ProviderError::AmbiguousCreate(format!(
            "link '{}' was created on component {} but {} listed links match it: {}",
            planned.name,
            planned.component_id,
            many.len(),
            many.join(", ")
        ))),
    }
}

/// Maps `compass_component_link` lifecycle calls onto the Compass API.
#[derive(Debug, Clone)]
pub struct ComponentLinkResource {
    client: CompassClient,
    documents: LinkDocuments,
}

impl ComponentLinkResource {
    /// Resource type name registered with the host.
    pub const TYPE_NAME: &'static str = "compass_component_link";

    /// Create a mapper using the default documents.
    pub fn new(client: CompassClient) -> Self {
        Self {
            client,
            documents: LinkDocuments::default(),
        }
    }

    /// Replace the GraphQL documents.
    pub fn with_documents(mut self, documents: LinkDocuments) -> Self {
        self.documents = documents;
        self
    }

    /// The resource schema.
    pub fn schema() -> Schema {
        Schema::new()
            .with_description("A link attached to a Compass component")
            .with_attribute("id", Attribute::computed())
            .with_attribute(
                "component_id",
                Attribute::required()
                    .replace_on_change()
                    .with_description("Id of the component the link belongs to"),
            )
            .with_attribute(
                "name",
                Attribute::required().with_description("Name of the link"),
            )
            .with_attribute(
                "type",
                Attribute::required()
                    .with_allowed_values(LinkType::names())
                    .with_description("Type of the link"),
            )
            .with_attribute(
                "url",
                Attribute::required().with_description("Target URL"),
            )
            .with_attribute(
                "object_id",
                Attribute::optional()
                    .with_description("Id of the linked object in its source system"),
            )
            .with_attribute(
                "cloud_id",
                Attribute::optional_computed()
                    .replace_on_change()
                    .with_description("Cloud id of the site; detected from the provider tenant when unset"),
            )
    }

    /// Create the link, identify it among the component's links, then read it.
    #[instrument(
        skip(self, planned),
        name = "component_link.create",
        fields(component_id = %planned.component_id, name = %planned.name)
    )]
    pub async fn create(
        &self,
        planned: ComponentLinkState,
    ) -> Result<ComponentLinkState, ProviderError> {
        let link_type = LinkType::from_str(&planned.link_type)?;
        let cloud_id = resolve_cloud_id(&self.client, planned.cloud_id.as_deref()).await?;

        let vars = variables(&InputVariables {
            input: CreateInput {
                component_id: &planned.component_id,
                link: NewLink {
                    name: &planned.name,
                    link_type: link_type.as_str(),
                    url: &planned.url,
                    object_id: planned.object_id.as_deref().filter(|o| !o.is_empty()),
                },
            },
        })?;
        let data: CompassData<CreatePayload> =
            self.client.execute_as(self.documents.create, vars).await?;
        ensure_success(
            data.compass.and_then(|c| c.create_component_link).as_ref(),
            "createComponentLink",
        )?;

        let links = self.list(&planned.component_id).await?.unwrap_or_default();
        let id = find_created_link(&links, &planned).inspect_err(|e| {
            warn!(error = %e, "Created link could not be identified");
        })?;
        info!(id = %id, "Component link created");

        let created = ComponentLinkState {
            id: Some(id.clone()),
            cloud_id: Some(cloud_id),
            link_type: link_type.as_str().to_string(),
            ..planned
        };
        self.read(created).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("link {} was created but could not be read back", id))
        })
    }

    /// Refresh state from the owning component; `None` means the link is gone.
    #[instrument(skip(self, current), name = "component_link.read", fields(id = ?current.id))]
    pub async fn read(
        &self,
        current: ComponentLinkState,
    ) -> Result<Option<ComponentLinkState>, ProviderError> {
        let (component_id, link_id) = require_ids(&current)?;

        let Some(links) = self.list(component_id).await? else {
            debug!("Owning component not returned, clearing state");
            return Ok(None);
        };
        let Some(link) = links
            .into_iter()
            .find(|l| l.id.as_deref() == Some(link_id))
        else {
            debug!("Link no longer listed, clearing state");
            return Ok(None);
        };

        Ok(Some(ComponentLinkState {
            id: link.id,
            component_id: current.component_id,
            name: link.name.unwrap_or_default(),
            link_type: link.link_type.unwrap_or_default(),
            url: link.url.unwrap_or_default(),
            object_id: non_empty(link.object_id),
            cloud_id: non_empty(current.cloud_id),
        }))
    }

    /// Apply changes to name, type, url and object id, then read back.
    ///
    /// Changing `component_id` or `cloud_id` is rejected without contacting the API.
    #[instrument(skip(self, prior, planned), name = "component_link.update", fields(id = ?prior.id))]
    pub async fn update(
        &self,
        prior: ComponentLinkState,
        planned: ComponentLinkState,
    ) -> Result<ComponentLinkState, ProviderError> {
        let (component_id, link_id) = require_ids(&prior)?;
        let (component_id, link_id) = (component_id.to_string(), link_id.to_string());

        if !planned.component_id.is_empty() && planned.component_id != component_id {
            return Err(ProviderError::Validation(format!(
                "component_id cannot be changed from '{}' to '{}'; the link must be replaced",
                component_id, planned.component_id
            )));
        }
        let cloud_id = merge_cloud_id(prior.cloud_id.as_deref(), planned.cloud_id.as_deref())?;

        let link_type = Patch::diff_required(&prior.link_type, planned.link_type);
        if let Patch::Set(new_type) = &link_type {
            LinkType::from_str(new_type)?;
        }
        let patch = LinkPatch {
            id: &link_id,
            name: Patch::diff_required(&prior.name, planned.name),
            link_type,
            url: Patch::diff_required(&prior.url, planned.url),
            object_id: Patch::diff(
                non_empty(prior.object_id).as_ref(),
                non_empty(planned.object_id),
            ),
        };

        if patch.is_empty() {
            debug!("No updatable fields changed");
        } else {
            let vars = variables(&InputVariables {
                input: UpdateInput {
                    component_id: &component_id,
                    link: patch,
                },
            })?;
            let data: CompassData<UpdatePayload> =
                self.client.execute_as(self.documents.update, vars).await?;
            ensure_success(
                data.compass.and_then(|c| c.update_component_link).as_ref(),
                "updateComponentLink",
            )?;
            info!("Component link updated");
        }

        let refreshed = ComponentLinkState {
            id: Some(link_id.clone()),
            component_id,
            cloud_id,
            ..ComponentLinkState::default()
        };
        self.read(refreshed).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("link {} disappeared during update", link_id))
        })
    }

    /// Detach the link from its component.
    #[instrument(skip(self, current), name = "component_link.delete", fields(id = ?current.id))]
    pub async fn delete(&self, current: ComponentLinkState) -> Result<(), ProviderError> {
        let (component_id, link_id) = require_ids(&current)?;
        let vars = variables(&InputVariables {
            input: DeleteInput {
                component_id,
                link: link_id,
            },
        })?;
        let data: CompassData<DeletePayload> =
            self.client.execute_as(self.documents.delete, vars).await?;
        ensure_success(
            data.compass.and_then(|c| c.delete_component_link).as_ref(),
            "deleteComponentLink",
        )?;
        info!("Component link deleted");
        Ok(())
    }

    /// Import a link from `component_id:link_id` or `component_id/link_id`.
    #[instrument(skip(self), name = "component_link.import")]
    pub async fn import(&self, id: &str) -> Result<ComponentLinkState, ProviderError> {
        let (component_id, link_id) = split_import_id(id)?;
        let seed = ComponentLinkState {
            id: Some(link_id.to_string()),
            component_id: component_id.to_string(),
            cloud_id: import_cloud_id(&self.client).await,
            ..ComponentLinkState::default()
        };
        self.read(seed).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("link {} on component {}", link_id, component_id))
        })
    }

    /// The links of a component, or `None` when the component no longer exists.
    ///
    /// A `QueryError` other than not-found fails instead of reporting the
    /// component as gone.
    async fn list(&self, component_id: &str) -> Result<Option<Vec<RemoteLink>>, ProviderError> {
        let vars = variables(&ComponentIdVariables { component_id })?;
        let data: CompassData<ListPayload> =
            self.client.execute_as(self.documents.list, vars).await?;
        let Some(component) = data.compass.and_then(|c| c.component) else {
            return Ok(None);
        };
        if component.links.is_none() {
            ensure_not_found(&component.error, &format!("links of component {}", component_id))?;
        }
        Ok(component.links)
    }
}

fn require_ids(state: &ComponentLinkState) -> Result<(&str, &str), ProviderError> {
    let link_id = state
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation("link id is not set".to_string()))?;
    if state.component_id.is_empty() {
        return Err(ProviderError::Validation(
            "component_id is not set".to_string(),
        ));
    }
    Ok((state.component_id.as_str(), link_id))
}
