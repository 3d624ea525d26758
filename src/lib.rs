//! Compass Provider
//!
//! An infrastructure-as-code provider for the Atlassian Compass software
//! catalog. It maps `compass_component` and `compass_component_link`
//! resources onto the Compass GraphQL API.
//!
//! # Overview
//!
//! - **Transport client** ([`CompassClient`]): one authenticated POST per
//!   GraphQL document, with envelope and HTTP error mapping
//! - **Tenant resolver**: turns a site name into the cloud id resources need
//! - **Resource mappers** ([`resources`]): create/read/update/delete/import
//!   for components and component links
//! - **Provider** ([`CompassProvider`]): configuration and dispatch behind the
//!   [`ProviderService`] trait a host drives
//! - **Logging**: `tracing` spans per lifecycle call, written to stderr
//!
//! # Quick Start
//!
//! ```ignore
//! use compass_provider::{CompassProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     compass_provider::init_logging();
//!
//!     let provider = CompassProvider::new();
//!     let diagnostics = provider
//!         .configure(json!({"email": "dev@example.com", "api_token": "...", "tenant": "acme"}))
//!         .await?;
//!     assert!(diagnostics.is_empty());
//!
//!     let component = provider
//!         .create("compass_component", json!({"name": "payments", "type": "SERVICE"}))
//!         .await?;
//!     println!("created {}", component["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! | Attribute     | Environment variable  | Default                     |
//! |---------------|-----------------------|-----------------------------|
//! | `email`       | `COMPASS_EMAIL`       |                             |
//! | `api_token`   | `COMPASS_API_TOKEN`   |                             |
//! | `base_url`    | `COMPASS_BASE_URL`    | `https://api.atlassian.com` |
//! | `tenant`      | `COMPASS_TENANT`      |                             |
//! | `auth_scheme` | `COMPASS_AUTH_SCHEME` | `basic`                     |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod graphql;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod tenant;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::CompassClient;
pub use config::{AuthScheme, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CompassProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{ImportedResource, ResourceType};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
