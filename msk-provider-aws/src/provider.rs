//! MSK provider implementation
//!
//! Dispatches resource operations to the CloudFormation stack and MSK
//! Connect connector handlers, validating declarations against the resource
//! schemas first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use msk_core::provider::{ProviderError, ProviderResult};
use msk_core::resource::{Resource, ResourceId, State, Value};
use msk_core::schema::ResourceSchema;
use msk_core::waiter::Waiter;

use crate::cloudformation::CloudFormationApi;
use crate::config::ProviderConfig;
use crate::kafkaconnect::KafkaConnectApi;
use crate::policy::OperationKind;
use crate::resources::{CLOUDFORMATION_STACK, schema_for};

/// AWS provider for CloudFormation stacks and MSK Connect connectors
pub struct MskProvider {
    pub(crate) cloudformation: Arc<dyn CloudFormationApi>,
    pub(crate) kafkaconnect: Arc<dyn KafkaConnectApi>,
    pub(crate) waiter: Waiter,
    pub(crate) config: ProviderConfig,
}

impl MskProvider {
    /// Create a provider using the default AWS credential chain
    pub async fn new(config: ProviderConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region() {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;
        match sdk_config.region() {
            Some(region) => log::debug!("Loaded AWS configuration for region {}", region),
            None => log::warn!("No AWS region configured, set --region or AWS_REGION"),
        }

        Self::with_clients(
            config,
            Arc::new(aws_sdk_cloudformation::Client::new(&sdk_config)),
            Arc::new(aws_sdk_kafkaconnect::Client::new(&sdk_config)),
        )
    }

    pub fn with_clients(
        config: ProviderConfig,
        cloudformation: Arc<dyn CloudFormationApi>,
        kafkaconnect: Arc<dyn KafkaConnectApi>,
    ) -> Self {
        Self {
            cloudformation,
            kafkaconnect,
            waiter: Waiter::new(),
            config,
        }
    }

    /// Replace the waiter, e.g. to share a cancellation token
    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    pub fn cloudformation(&self) -> &Arc<dyn CloudFormationApi> {
        &self.cloudformation
    }

    pub fn kafkaconnect(&self) -> &Arc<dyn KafkaConnectApi> {
        &self.kafkaconnect
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn timeout(&self, kind: OperationKind) -> Duration {
        self.config.timeout(kind)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        schema(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        match id.resource_type.as_str() {
            CLOUDFORMATION_STACK => self.read_stack(id, identifier).await,
            _ => self.read_connector(id, identifier).await,
        }
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let resource = prepare(resource)?;
        log::info!(
            "Creating {}.{}",
            resource.id.resource_type,
            resource.id.name
        );
        match resource.id.resource_type.as_str() {
            CLOUDFORMATION_STACK => self.create_stack(&resource).await,
            _ => self.create_connector(&resource).await,
        }
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let to = prepare(to)?;
        let replaced = force_new_changes(&schema(id)?, &from.attributes, &to.attributes);
        if !replaced.is_empty() {
            return Err(ProviderError::new(format!(
                "cannot update {} in place, replacement required: {}",
                identifier,
                replaced.join(", ")
            ))
            .for_resource(id.clone()));
        }
        log::info!("Updating {}.{}", id.resource_type, id.name);
        match id.resource_type.as_str() {
            CLOUDFORMATION_STACK => self.update_stack(id, identifier, &to).await,
            _ => self.update_connector(id, identifier, &to).await,
        }
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        schema(id)?;
        log::info!("Deleting {}.{}", id.resource_type, id.name);
        match id.resource_type.as_str() {
            CLOUDFORMATION_STACK => self.delete_stack(id, identifier).await,
            _ => self.delete_connector(id, identifier).await,
        }
    }
}

fn schema(id: &ResourceId) -> ProviderResult<ResourceSchema> {
    schema_for(&id.resource_type).ok_or_else(|| {
        ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    })
}

/// Validate a declaration and fill in schema defaults
fn prepare(resource: &Resource) -> ProviderResult<Resource> {
    let schema = schema(&resource.id)?;
    if let Err(errors) = schema.validate(&resource.attributes) {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(
            ProviderError::new(format!("Invalid attributes: {}", messages.join("; ")))
                .for_resource(resource.id.clone()),
        );
    }
    Ok(Resource {
        id: resource.id.clone(),
        attributes: schema.with_defaults(&resource.attributes),
    })
}

/// Force-new attributes that changed, ignoring attributes the current state
/// does not report
fn force_new_changes(
    schema: &ResourceSchema,
    from: &HashMap<String, Value>,
    to: &HashMap<String, Value>,
) -> Vec<String> {
    let to: HashMap<String, Value> = to
        .iter()
        .filter(|(name, _)| from.contains_key(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    schema.force_new_changes(from, &to)
}

/// Keep declared values the describe call does not report, e.g. a stack's
/// template
pub(crate) fn with_declared(mut state: State, resource: &Resource) -> State {
    if !state.exists {
        return state;
    }
    for (name, value) in &resource.attributes {
        state
            .attributes
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
    state
}

pub(crate) fn required_string(resource: &Resource, name: &str) -> ProviderResult<String> {
    resource
        .get_string(name)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::new(format!("Required attribute '{}' is missing", name))
                .for_resource(resource.id.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::tests::FakeCloudFormation;
    use crate::kafkaconnect::tests::FakeKafkaConnect;
    use crate::resources::MSK_CONNECTOR;

    fn provider() -> MskProvider {
        MskProvider::with_clients(
            ProviderConfig::default(),
            Arc::new(FakeCloudFormation::default()),
            Arc::new(FakeKafkaConnect::default()),
        )
    }

    #[tokio::test]
    async fn unknown_resource_type_is_rejected() {
        let id = ResourceId::new("s3_bucket", "logs");
        let err = provider().read_resource(&id, Some("logs")).await.unwrap_err();
        assert_eq!(err.to_string(), "[s3_bucket.logs] Unknown resource type: s3_bucket");
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let id = ResourceId::new(MSK_CONNECTOR, "sink");
        let state = provider().read_resource(&id, None).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn invalid_declaration_fails_before_any_call() {
        let resource = Resource::new(CLOUDFORMATION_STACK, "orders")
            .with_attribute("name", Value::String("orders".to_string()));
        let err = provider().create_resource(&resource).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[cloudformation_stack.orders] Invalid attributes: Required attribute 'template_body' is missing"
        );
    }

    #[test]
    fn unreported_attributes_do_not_force_replacement() {
        let schema = schema_for(MSK_CONNECTOR).unwrap();
        let from = HashMap::from([(
            "connector_name".to_string(),
            Value::String("sink".to_string()),
        )]);
        let to = HashMap::from([
            ("connector_name".to_string(), Value::String("sink".to_string())),
            ("cw_log_group".to_string(), Value::String("connect".to_string())),
        ]);
        assert!(force_new_changes(&schema, &from, &to).is_empty());
    }
}
