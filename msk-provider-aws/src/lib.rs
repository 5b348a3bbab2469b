//! MSK AWS Provider
//!
//! Manages CloudFormation stacks and MSK Connect connectors, waiting for
//! every asynchronous operation to settle before reporting its outcome.
//!
//! ## Module Structure
//!
//! - `cloudformation` - CloudFormation API, waiters and the stack resource
//! - `kafkaconnect` - MSK Connect API, waiters and the connector resource
//! - `policy` - Poll policies and failure rules per operation kind
//! - `status` - Status enums reported by the services
//! - `config` - Provider configuration
//! - `resources` - Resource type definitions and schemas
//! - `provider` - MskProvider implementation
//! - `utils` - Helper functions for value conversion

pub mod cloudformation;
pub mod config;
pub mod error;
pub mod kafkaconnect;
pub mod policy;
pub mod provider;
pub mod resources;
pub mod status;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export main types
pub use config::{ConfigError, ProviderConfig};
pub use error::ApiError;
pub use provider::MskProvider;
pub use utils::normalize_region;

use msk_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use msk_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for MskProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}
