//! Provider - Trait abstracting resource operations
//!
//! A Provider owns the CRUD operations for a family of resource types. Every
//! mutating call returns only after the remote operation it started has
//! settled, so a returned `State` always reflects a finished operation.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;
use crate::waiter::{BoxError, WaitError, WaitFailure};

/// Error type for Provider operations
#[derive(Debug, Error)]
#[error("{}{message}", scope(.resource_id))]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Remote identifier of a resource that exists despite the failure,
    /// e.g. a stack whose creation was started but did not settle
    pub identifier: Option<String>,
    #[source]
    pub cause: Option<BoxError>,
}

fn scope(resource_id: &Option<ResourceId>) -> String {
    resource_id
        .as_ref()
        .map(|id| format!("[{}] ", id))
        .unwrap_or_default()
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    /// Error for an operation whose wait did not settle successfully
    ///
    /// The wait error becomes the cause; the last snapshot is dropped.
    pub fn from_wait<S, R>(id: &ResourceId, action: &str, failure: WaitFailure<S, R>) -> Self {
        let error = failure.into_error();
        Self::new(format!("error waiting for {}: {}", action, error))
            .for_resource(id.clone())
            .with_cause(error)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The wait gave up while the remote operation may still be running
    pub fn is_timeout(&self) -> bool {
        self.cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<WaitError>())
            .is_some_and(WaitError::is_timeout)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resource type a Provider can manage
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "msk_connector")
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;
}

pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource does not exist or no
    /// identifier is known yet.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource and wait for it to become usable
    ///
    /// The returned state carries the remote identifier (stack ID, ARN).
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource and wait until it is gone
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}
