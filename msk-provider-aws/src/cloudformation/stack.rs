//! The `cloudformation_stack` resource

use std::collections::HashMap;

use msk_core::provider::{ProviderError, ProviderResult};
use msk_core::resource::{Resource, ResourceId, State, Value};
use uuid::Uuid;

use super::api::{CreateStackRequest, StackDescription, UpdateStackRequest};
use super::waiter::{stack_created, stack_deleted, stack_updated};
use crate::policy::OperationKind;
use crate::provider::{MskProvider, required_string, with_declared};
use crate::status::StackStatus;
use crate::utils::{string_list, string_map};

/// Every stack operation carries a fresh token so its events can be told
/// apart from earlier operations on the same stack
fn request_token() -> String {
    Uuid::new_v4().to_string()
}

fn stack_attributes(stack: &StackDescription) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert("name".to_string(), Value::String(stack.stack_name.clone()));
    attributes.insert("stack_id".to_string(), Value::String(stack.stack_id.clone()));
    attributes.insert("status".to_string(), Value::String(stack.status.to_string()));
    if !stack.parameters.is_empty() {
        attributes.insert("parameters".to_string(), string_map(&stack.parameters));
    }
    if !stack.capabilities.is_empty() {
        attributes.insert("capabilities".to_string(), string_list(&stack.capabilities));
    }
    if !stack.outputs.is_empty() {
        attributes.insert("outputs".to_string(), string_map(&stack.outputs));
    }
    attributes
}

fn parameters(resource: &Resource) -> HashMap<String, String> {
    resource
        .attributes
        .get("parameters")
        .and_then(Value::as_string_map)
        .unwrap_or_default()
}

fn capabilities(resource: &Resource) -> Vec<String> {
    resource
        .attributes
        .get("capabilities")
        .and_then(Value::as_string_list)
        .unwrap_or_default()
}

fn timeout_in_minutes(resource: &Resource) -> ProviderResult<Option<i32>> {
    let Some(minutes) = resource.get_int("timeout_in_minutes") else {
        return Ok(None);
    };
    match i32::try_from(minutes) {
        Ok(minutes) if minutes > 0 => Ok(Some(minutes)),
        _ => Err(ProviderError::new(format!(
            "Attribute 'timeout_in_minutes' is out of range: {}",
            minutes
        ))
        .for_resource(resource.id.clone())),
    }
}

impl MskProvider {
    async fn describe_live_stack(
        &self,
        id: &ResourceId,
        stack_id: &str,
    ) -> ProviderResult<Option<StackDescription>> {
        let stack = self.cloudformation.describe_stack(stack_id).await.map_err(|e| {
            ProviderError::new(format!("error reading CloudFormation Stack ({})", stack_id))
                .for_resource(id.clone())
                .with_cause(e)
        })?;
        Ok(stack.filter(|s| s.status != StackStatus::DeleteComplete))
    }

    pub(crate) async fn read_stack(&self, id: &ResourceId, stack_id: &str) -> ProviderResult<State> {
        match self.describe_live_stack(id, stack_id).await? {
            Some(stack) => {
                Ok(State::existing(id.clone(), stack_attributes(&stack)).with_identifier(&stack.stack_id))
            }
            None => {
                log::warn!(
                    "CloudFormation Stack ({}) not found, removing from state",
                    stack_id
                );
                Ok(State::not_found(id.clone()))
            }
        }
    }

    pub(crate) async fn create_stack(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let token = request_token();
        let request = CreateStackRequest {
            stack_name: required_string(resource, "name")?,
            template_body: required_string(resource, "template_body")?,
            parameters: parameters(resource),
            capabilities: capabilities(resource),
            on_failure: resource.get_string("on_failure").map(str::to_string),
            timeout_in_minutes: timeout_in_minutes(resource)?,
            client_request_token: token.clone(),
        };

        let stack_id = self.cloudformation.create_stack(request).await.map_err(|e| {
            ProviderError::new("error creating CloudFormation Stack")
                .for_resource(id.clone())
                .with_cause(e)
        })?;
        log::info!("Created CloudFormation Stack ({})", stack_id);

        stack_created(
            &self.waiter,
            &self.cloudformation,
            &stack_id,
            &token,
            self.timeout(OperationKind::StackCreate),
        )
        .await
        .map_err(|f| {
            let action = format!("CloudFormation Stack ({}) creation", stack_id);
            ProviderError::from_wait(id, &action, f).with_identifier(&stack_id)
        })?;

        let state = self.read_stack(id, &stack_id).await?;
        Ok(with_declared(state, resource))
    }

    pub(crate) async fn update_stack(
        &self,
        id: &ResourceId,
        stack_id: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        let token = request_token();
        let request = UpdateStackRequest {
            stack_id: stack_id.to_string(),
            template_body: required_string(to, "template_body")?,
            parameters: parameters(to),
            capabilities: capabilities(to),
            client_request_token: token.clone(),
        };

        let updated = self.cloudformation.update_stack(request).await.map_err(|e| {
            ProviderError::new(format!("error updating CloudFormation Stack ({})", stack_id))
                .for_resource(id.clone())
                .with_cause(e)
        })?;

        if updated.is_some() {
            stack_updated(
                &self.waiter,
                &self.cloudformation,
                stack_id,
                &token,
                self.timeout(OperationKind::StackUpdate),
            )
            .await
            .map_err(|f| {
                let action = format!("CloudFormation Stack ({}) update", stack_id);
                ProviderError::from_wait(id, &action, f)
            })?;
        } else {
            log::info!("CloudFormation Stack ({}) is already up to date", stack_id);
        }

        let state = self.read_stack(id, stack_id).await?;
        Ok(with_declared(state, to))
    }

    pub(crate) async fn delete_stack(&self, id: &ResourceId, stack_id: &str) -> ProviderResult<()> {
        if self.describe_live_stack(id, stack_id).await?.is_none() {
            log::info!("CloudFormation Stack ({}) already deleted", stack_id);
            return Ok(());
        }

        let token = request_token();
        self.cloudformation
            .delete_stack(stack_id, &token)
            .await
            .map_err(|e| {
                ProviderError::new(format!("error deleting CloudFormation Stack ({})", stack_id))
                    .for_resource(id.clone())
                    .with_cause(e)
            })?;

        stack_deleted(
            &self.waiter,
            &self.cloudformation,
            stack_id,
            &token,
            self.timeout(OperationKind::StackDelete),
        )
        .await
        .map_err(|f| {
            let action = format!("CloudFormation Stack ({}) deletion", stack_id);
            ProviderError::from_wait(id, &action, f)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cloudformation::api::StackEvent;
    use crate::cloudformation::tests::{FakeCloudFormation, stack};
    use crate::config::ProviderConfig;
    use crate::kafkaconnect::tests::FakeKafkaConnect;
    use crate::resources::CLOUDFORMATION_STACK;
    use msk_core::waiter::{EventRecord, ManualClock, Waiter};

    const STACK_ID: &str = "arn:aws:cloudformation:us-east-1:123456789012:stack/orders/1";

    fn setup() -> (Arc<FakeCloudFormation>, MskProvider) {
        let fake = Arc::new(FakeCloudFormation::default());
        let provider = MskProvider::with_clients(
            ProviderConfig::default(),
            fake.clone(),
            Arc::new(FakeKafkaConnect::default()),
        )
        .with_waiter(Waiter::new().with_clock(Arc::new(ManualClock::new())));
        (fake, provider)
    }

    fn declared() -> Resource {
        Resource::new(CLOUDFORMATION_STACK, "orders")
            .with_attribute("name", Value::String("orders".to_string()))
            .with_attribute("template_body", Value::String("{\"Resources\":{}}".to_string()))
            .with_attribute(
                "parameters",
                Value::Map(HashMap::from([(
                    "QueueName".to_string(),
                    Value::String("orders".to_string()),
                )])),
            )
            .with_attribute("on_failure", Value::String("ROLLBACK".to_string()))
    }

    #[tokio::test]
    async fn create_waits_and_reads_back() {
        let (fake, provider) = setup();
        fake.push_stack(stack(STACK_ID, StackStatus::CreateInProgress));
        let mut complete = stack(STACK_ID, StackStatus::CreateComplete);
        complete
            .outputs
            .insert("QueueUrl".to_string(), "https://sqs/orders".to_string());
        fake.push_stack(complete);

        let state = provider.create_resource(&declared()).await.unwrap();

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some(STACK_ID));
        assert_eq!(
            state.attributes.get("status"),
            Some(&Value::String("CREATE_COMPLETE".to_string()))
        );
        assert!(state.attributes.contains_key("template_body"));

        let created = fake.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].on_failure.as_deref(), Some("ROLLBACK"));
        assert_eq!(created[0].parameters.get("QueueName").map(String::as_str), Some("orders"));
        assert!(Uuid::parse_str(&created[0].client_request_token).is_ok());
    }

    #[tokio::test]
    async fn failed_create_reports_event_reasons() {
        let (fake, provider) = setup();
        fake.push_stack(stack(STACK_ID, StackStatus::RollbackComplete));
        // The fake cannot know the generated token, so the window never opens
        fake.push_event_page(
            vec![StackEvent {
                record: EventRecord::new("Queue", "AWS::SQS::Queue", "CREATE_FAILED")
                    .with_reason("denied"),
                client_request_token: Some("other".to_string()),
            }],
            None,
        );

        let err = provider.create_resource(&declared()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "[cloudformation_stack.orders] error waiting for CloudFormation Stack ({}) creation: failed to create CloudFormation stack, rollback requested (ROLLBACK_COMPLETE): []",
                STACK_ID
            )
        );
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.identifier.as_deref(), Some(STACK_ID));
    }

    #[tokio::test]
    async fn out_of_range_timeout_is_rejected_before_create() {
        let (fake, provider) = setup();
        let resource = declared().with_attribute("timeout_in_minutes", Value::Int(1 << 40));

        let err = provider.create_resource(&resource).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[cloudformation_stack.orders] Attribute 'timeout_in_minutes' is out of range: 1099511627776"
        );
        assert!(fake.created().is_empty());

        let resource = declared().with_attribute("timeout_in_minutes", Value::Int(0));
        assert!(provider.create_resource(&resource).await.is_err());
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn unchanged_update_does_not_wait() {
        let (fake, provider) = setup();
        fake.reject_updates();
        fake.push_stack(stack(STACK_ID, StackStatus::CreateComplete));

        let id = ResourceId::new(CLOUDFORMATION_STACK, "orders");
        let current = provider.read_resource(&id, Some(STACK_ID)).await.unwrap();
        let state = provider
            .update_resource(&id, STACK_ID, &current, &declared())
            .await
            .unwrap();

        assert!(state.exists);
        assert!(fake.updated().is_empty());
    }

    #[tokio::test]
    async fn renaming_requires_replacement() {
        let (fake, provider) = setup();
        fake.push_stack(stack(STACK_ID, StackStatus::CreateComplete));
        let id = ResourceId::new(CLOUDFORMATION_STACK, "orders");
        let current = provider.read_resource(&id, Some(STACK_ID)).await.unwrap();

        let renamed = declared().with_attribute("name", Value::String("orders-v2".to_string()));
        let err = provider
            .update_resource(&id, STACK_ID, &current, &renamed)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("replacement required: name"));
    }

    #[tokio::test]
    async fn delete_waits_until_stack_is_gone() {
        let (fake, provider) = setup();
        fake.push_stack(stack(STACK_ID, StackStatus::CreateComplete));
        fake.push_stack(stack(STACK_ID, StackStatus::DeleteInProgress));
        fake.push_missing_stack();

        let id = ResourceId::new(CLOUDFORMATION_STACK, "orders");
        provider.delete_resource(&id, STACK_ID).await.unwrap();

        let deleted = fake.deleted();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].0, STACK_ID);
    }

    #[tokio::test]
    async fn deleting_a_deleted_stack_is_a_no_op() {
        let (fake, provider) = setup();
        fake.push_stack(stack(STACK_ID, StackStatus::DeleteComplete));

        let id = ResourceId::new(CLOUDFORMATION_STACK, "orders");
        provider.delete_resource(&id, STACK_ID).await.unwrap();
        assert!(fake.deleted().is_empty());

        let state = provider.read_resource(&id, Some(STACK_ID)).await.unwrap();
        assert!(!state.exists);
    }
}
