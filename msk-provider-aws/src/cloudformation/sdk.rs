//! `CloudFormationApi` for the AWS SDK client

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudformation::types;
use chrono::{DateTime, Utc};
use msk_core::waiter::{EventRecord, Page};

use super::api::{
    ChangeSetDescription, CloudFormationApi, CreateStackRequest, StackDescription, StackEvent,
    StackSetOperation, StackSetOperationResult, TypeRegistration, UpdateStackRequest,
};
use crate::error::{ApiError, sdk_error};
use crate::status::{ChangeSetStatus, RegistrationStatus, StackSetOperationStatus, StackStatus};
use crate::utils::text;

const NO_UPDATES: &str = "No updates are to be performed";
const DOES_NOT_EXIST: &str = "does not exist";

fn is_validation_error<E, R>(err: &SdkError<E, R>, needle: &str) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().is_some_and(|e| {
        e.code() == Some("ValidationError") && e.message().is_some_and(|m| m.contains(needle))
    })
}

fn timestamp<'a>(value: impl Into<Option<&'a SdkDateTime>>) -> Option<DateTime<Utc>> {
    value
        .into()
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn sdk_parameters(parameters: &HashMap<String, String>) -> Option<Vec<types::Parameter>> {
    if parameters.is_empty() {
        return None;
    }
    let mut keys: Vec<&String> = parameters.keys().collect();
    keys.sort();
    Some(
        keys.into_iter()
            .map(|key| {
                types::Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(&parameters[key])
                    .build()
            })
            .collect(),
    )
}

fn sdk_capabilities(capabilities: &[String]) -> Option<Vec<types::Capability>> {
    if capabilities.is_empty() {
        None
    } else {
        Some(
            capabilities
                .iter()
                .map(|c| types::Capability::from(c.as_str()))
                .collect(),
        )
    }
}

fn stack_description(stack: &types::Stack) -> StackDescription {
    let status: Option<&types::StackStatus> = stack.stack_status().into();
    StackDescription {
        stack_id: text(stack.stack_id()).unwrap_or_default(),
        stack_name: text(stack.stack_name()).unwrap_or_default(),
        status: StackStatus::from(status.map(|s| s.as_str()).unwrap_or_default()),
        status_reason: text(stack.stack_status_reason()),
        parameters: stack
            .parameters()
            .iter()
            .filter_map(|p| {
                Some((
                    p.parameter_key()?.to_string(),
                    p.parameter_value().unwrap_or_default().to_string(),
                ))
            })
            .collect(),
        capabilities: stack
            .capabilities()
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
        outputs: stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some((
                    o.output_key()?.to_string(),
                    o.output_value().unwrap_or_default().to_string(),
                ))
            })
            .collect(),
    }
}

fn stack_event(event: &types::StackEvent) -> StackEvent {
    let status: Option<&types::ResourceStatus> = event.resource_status().into();
    let mut record = EventRecord::new(
        text(event.logical_resource_id()).unwrap_or_default(),
        text(event.resource_type()).unwrap_or_default(),
        status.map(|s| s.as_str()).unwrap_or_default(),
    );
    record.resource_status_reason = text(event.resource_status_reason());
    record.timestamp = timestamp(event.timestamp());
    StackEvent {
        record,
        client_request_token: text(event.client_request_token()),
    }
}

#[async_trait]
impl CloudFormationApi for Client {
    async fn describe_stack(&self, stack_id: &str) -> Result<Option<StackDescription>, ApiError> {
        let output = match Client::describe_stacks(self)
            .stack_name(stack_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_validation_error(&e, DOES_NOT_EXIST) => return Ok(None),
            Err(e) => return Err(sdk_error("DescribeStacks", e)),
        };
        Ok(output.stacks().first().map(stack_description))
    }

    async fn stack_events_page(
        &self,
        stack_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<StackEvent>, ApiError> {
        let output = Client::describe_stack_events(self)
            .stack_name(stack_id)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("DescribeStackEvents", e))?;

        Ok(Page {
            records: output.stack_events().iter().map(stack_event).collect(),
            next_page_token: text(output.next_token()),
        })
    }

    async fn describe_change_set(
        &self,
        stack_id: &str,
        change_set_name: &str,
    ) -> Result<Option<ChangeSetDescription>, ApiError> {
        let output = match Client::describe_change_set(self)
            .stack_name(stack_id)
            .change_set_name(change_set_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|e| e.is_change_set_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(sdk_error("DescribeChangeSet", e)),
        };

        let status: Option<&types::ChangeSetStatus> = output.status().into();
        Ok(Some(ChangeSetDescription {
            change_set_id: text(output.change_set_id()),
            change_set_name: text(output.change_set_name())
                .unwrap_or_else(|| change_set_name.to_string()),
            stack_id: text(output.stack_id()),
            status: ChangeSetStatus::from(status.map(|s| s.as_str()).unwrap_or_default()),
            status_reason: text(output.status_reason()),
        }))
    }

    async fn describe_stack_set_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<Option<StackSetOperation>, ApiError> {
        let output = match Client::describe_stack_set_operation(self)
            .stack_set_name(stack_set_name)
            .operation_id(operation_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e)
                if e.as_service_error().is_some_and(|e| {
                    e.is_operation_not_found_exception() || e.is_stack_set_not_found_exception()
                }) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(sdk_error("DescribeStackSetOperation", e)),
        };

        Ok(output.stack_set_operation().map(|op| {
            let status: Option<&types::StackSetOperationStatus> = op.status().into();
            let action: Option<&types::StackSetOperationAction> = op.action().into();
            StackSetOperation {
                operation_id: text(op.operation_id()).unwrap_or_else(|| operation_id.to_string()),
                action: action.map(|a| a.as_str().to_string()),
                status: StackSetOperationStatus::from(
                    status.map(|s| s.as_str()).unwrap_or_default(),
                ),
                status_reason: text(op.status_reason()),
            }
        }))
    }

    async fn stack_set_operation_results_page(
        &self,
        stack_set_name: &str,
        operation_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<StackSetOperationResult>, ApiError> {
        let output = Client::list_stack_set_operation_results(self)
            .stack_set_name(stack_set_name)
            .operation_id(operation_id)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("ListStackSetOperationResults", e))?;

        let records = output
            .summaries()
            .iter()
            .map(|summary| {
                let status: Option<&types::StackSetOperationResultStatus> =
                    summary.status().into();
                StackSetOperationResult {
                    account: text(summary.account()),
                    region: text(summary.region()),
                    status: status.map(|s| s.as_str().to_string()),
                    status_reason: text(summary.status_reason()),
                }
            })
            .collect();

        Ok(Page {
            records,
            next_page_token: text(output.next_token()),
        })
    }

    async fn describe_type_registration(
        &self,
        registration_token: &str,
    ) -> Result<Option<TypeRegistration>, ApiError> {
        let output = Client::describe_type_registration(self)
            .registration_token(registration_token)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeTypeRegistration", e))?;

        let status: Option<&types::RegistrationStatus> = output.progress_status().into();
        Ok(Some(TypeRegistration {
            status: RegistrationStatus::from(status.map(|s| s.as_str()).unwrap_or_default()),
            description: text(output.description()),
            type_arn: text(output.type_arn()),
            type_version_arn: text(output.type_version_arn()),
        }))
    }

    async fn create_stack(&self, request: CreateStackRequest) -> Result<String, ApiError> {
        let output = Client::create_stack(self)
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(sdk_parameters(&request.parameters))
            .set_capabilities(sdk_capabilities(&request.capabilities))
            .set_on_failure(request.on_failure.as_deref().map(types::OnFailure::from))
            .set_timeout_in_minutes(request.timeout_in_minutes)
            .client_request_token(&request.client_request_token)
            .send()
            .await
            .map_err(|e| sdk_error("CreateStack", e))?;

        text(output.stack_id()).ok_or_else(|| ApiError::missing("CreateStack", "StackId"))
    }

    async fn update_stack(&self, request: UpdateStackRequest) -> Result<Option<String>, ApiError> {
        let result = Client::update_stack(self)
            .stack_name(&request.stack_id)
            .template_body(&request.template_body)
            .set_parameters(sdk_parameters(&request.parameters))
            .set_capabilities(sdk_capabilities(&request.capabilities))
            .client_request_token(&request.client_request_token)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(
                text(output.stack_id()).unwrap_or_else(|| request.stack_id.clone()),
            )),
            Err(e) if is_validation_error(&e, NO_UPDATES) => Ok(None),
            Err(e) => Err(sdk_error("UpdateStack", e)),
        }
    }

    async fn delete_stack(
        &self,
        stack_id: &str,
        client_request_token: &str,
    ) -> Result<(), ApiError> {
        Client::delete_stack(self)
            .stack_name(stack_id)
            .client_request_token(client_request_token)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteStack", e))?;
        Ok(())
    }
}
