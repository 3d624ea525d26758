//! Helpers for driving a provider through a resource lifecycle in tests.
//!
//! [`ProviderTester`] calls a [`ProviderService`] the way a host would: every
//! write is followed by a read, and error diagnostics become a [`TestError`].
//!
//! # Example
//!
//! ```ignore
//! use compass_provider::testing::ProviderTester;
//! use compass_provider::CompassProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_component() {
//!     let tester = ProviderTester::new(CompassProvider::with_env(|_| None));
//!     tester
//!         .configure(json!({"email": "dev@example.com", "api_token": "t", "base_url": server.url()}))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .create("compass_component", json!({"name": "payments", "type": "SERVICE"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "payments");
//! }
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::error::ProviderError;
use crate::schema::Diagnostic;
use crate::service::ProviderService;
use crate::types::ImportedResource;

/// Why a tester call failed.
#[derive(Debug, Error)]
pub enum TestError {
    /// Error diagnostics returned by the provider; warnings are dropped.
    #[error("{} error diagnostic(s): {}", .0.len(), summaries(.0).join("; "))]
    Diagnostics(Vec<Diagnostic>),

    /// The provider call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A read right after create or update found nothing.
    #[error("{resource_type} was not readable right after it was written")]
    Vanished {
        /// The resource type that was written.
        resource_type: String,
    },

    /// A read after delete still found the resource.
    #[error("{resource_type} still exists after delete: {state}")]
    StillExists {
        /// The resource type that was deleted.
        resource_type: String,
        /// What the read returned.
        state: Value,
    },
}

/// Wraps a provider and chains its lifecycle calls.
pub struct ProviderTester<P> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`; call [`configure`](Self::configure) before any resource call.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider, for calls the tester does not chain.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Configure the provider, failing on any error diagnostic.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        errors_only(self.provider.configure(config).await?)
    }

    /// Validate a resource configuration, failing on any error diagnostic.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        errors_only(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Create, then return what a fresh read reports.
    pub async fn create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        let created = self.provider.create(resource_type, config).await?;
        self.read_back(resource_type, created).await
    }

    /// Read without any follow-up call.
    pub async fn read(
        &self,
        resource_type: &str,
        state: Value,
    ) -> Result<Option<Value>, TestError> {
        Ok(self.provider.read(resource_type, state).await?)
    }

    /// Update, then return what a fresh read reports.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, TestError> {
        let updated = self.provider.update(resource_type, prior, planned).await?;
        self.read_back(resource_type, updated).await
    }

    /// Delete, then check that a read no longer finds the resource.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), TestError> {
        self.provider.delete(resource_type, state.clone()).await?;
        match self.provider.read(resource_type, state).await? {
            None => Ok(()),
            Some(state) => Err(TestError::StillExists {
                resource_type: resource_type.to_string(),
                state,
            }),
        }
    }

    /// Import by id.
    pub async fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, TestError> {
        Ok(self.provider.import_resource(resource_type, id).await?)
    }

    /// Create from `initial`, update to `updated`, then delete.
    ///
    /// Returns the state read back after the update.
    pub async fn crud(
        &self,
        resource_type: &str,
        initial: Value,
        updated: Value,
    ) -> Result<Value, TestError> {
        let created = self.create(resource_type, initial).await?;
        let state = self.update(resource_type, created, updated).await?;
        self.delete(resource_type, state.clone()).await?;
        Ok(state)
    }

    async fn read_back(&self, resource_type: &str, state: Value) -> Result<Value, TestError> {
        self.provider
            .read(resource_type, state)
            .await?
            .ok_or_else(|| TestError::Vanished {
                resource_type: resource_type.to_string(),
            })
    }
}

fn errors_only(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn summaries<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Vec<String> {
    diagnostics
        .into_iter()
        .map(|d| match &d.attribute {
            Some(attribute) => format!("{} ({})", d.summary, attribute),
            None => d.summary.clone(),
        })
        .collect()
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<String> {
    summaries(diagnostics.iter().filter(|d| d.is_error()))
}

/// Panics if any diagnostic is an error. Warnings are fine.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = error_summaries(diagnostics);
    assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
}

/// Panics unless at least one diagnostic is an error.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "expected at least one error diagnostic"
    );
}

/// Panics unless some error diagnostic's summary contains `needle`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], needle: &str) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.iter().any(|summary| summary.contains(needle)),
        "no error mentions '{}'; errors were {:?}",
        needle,
        errors
    );
}
