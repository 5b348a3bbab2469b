//! CloudFormation API surface used by the waiters and the stack resource
//!
//! The trait is implemented for the SDK client in `sdk.rs` and by in-memory
//! fakes in tests. Not-found responses are `Ok(None)`.

use std::collections::HashMap;

use async_trait::async_trait;
use msk_core::waiter::{EventRecord, Page};

use crate::error::ApiError;
use crate::status::{ChangeSetStatus, RegistrationStatus, StackSetOperationStatus, StackStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct StackDescription {
    pub stack_id: String,
    pub stack_name: String,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub parameters: HashMap<String, String>,
    pub capabilities: Vec<String>,
    pub outputs: HashMap<String, String>,
}

/// A stack event with the token of the request that caused it
#[derive(Debug, Clone, PartialEq)]
pub struct StackEvent {
    pub record: EventRecord,
    pub client_request_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSetDescription {
    pub change_set_id: Option<String>,
    pub change_set_name: String,
    pub stack_id: Option<String>,
    pub status: ChangeSetStatus,
    pub status_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackSetOperation {
    pub operation_id: String,
    pub action: Option<String>,
    pub status: StackSetOperationStatus,
    pub status_reason: Option<String>,
}

/// Outcome of a stack set operation in one account and region
#[derive(Debug, Clone, PartialEq)]
pub struct StackSetOperationResult {
    pub account: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub status_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRegistration {
    pub status: RegistrationStatus,
    pub description: Option<String>,
    pub type_arn: Option<String>,
    pub type_version_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateStackRequest {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: HashMap<String, String>,
    pub capabilities: Vec<String>,
    /// DO_NOTHING, ROLLBACK or DELETE
    pub on_failure: Option<String>,
    pub timeout_in_minutes: Option<i32>,
    pub client_request_token: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStackRequest {
    pub stack_id: String,
    pub template_body: String,
    pub parameters: HashMap<String, String>,
    pub capabilities: Vec<String>,
    pub client_request_token: String,
}

#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    async fn describe_stack(&self, stack_id: &str) -> Result<Option<StackDescription>, ApiError>;

    /// One page of stack events, newest first
    async fn stack_events_page(
        &self,
        stack_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<StackEvent>, ApiError>;

    async fn describe_change_set(
        &self,
        stack_id: &str,
        change_set_name: &str,
    ) -> Result<Option<ChangeSetDescription>, ApiError>;

    async fn describe_stack_set_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<Option<StackSetOperation>, ApiError>;

    async fn stack_set_operation_results_page(
        &self,
        stack_set_name: &str,
        operation_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<StackSetOperationResult>, ApiError>;

    async fn describe_type_registration(
        &self,
        registration_token: &str,
    ) -> Result<Option<TypeRegistration>, ApiError>;

    /// Returns the new stack's ID
    async fn create_stack(&self, request: CreateStackRequest) -> Result<String, ApiError>;

    /// Returns the stack ID, or `None` when the template and parameters
    /// are unchanged
    async fn update_stack(&self, request: UpdateStackRequest) -> Result<Option<String>, ApiError>;

    async fn delete_stack(&self, stack_id: &str, client_request_token: &str)
    -> Result<(), ApiError>;
}
