//! Host-facing value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::resources::{ComponentLinkResource, ComponentResource};

/// Resource types served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// `compass_component`
    Component,
    /// `compass_component_link`
    ComponentLink,
}

impl ResourceType {
    /// Every served resource type.
    pub const ALL: [ResourceType; 2] = [ResourceType::Component, ResourceType::ComponentLink];

    /// The name the host uses for this resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Component => ComponentResource::TYPE_NAME,
            ResourceType::ComponentLink => ComponentLinkResource::TYPE_NAME,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProviderError::UnknownResource(s.to_string()))
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}
