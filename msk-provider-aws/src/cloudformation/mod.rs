//! CloudFormation support
//!
//! ## Module Structure
//!
//! - `api` - The API surface and the models it returns
//! - `sdk` - `CloudFormationApi` for the AWS SDK client
//! - `refresh` - Status refreshers for stacks, change sets, stack set operations and registrations
//! - `lister` - Event and result listings scoped to one operation
//! - `waiter` - Waits that settle an operation and explain failures
//! - `stack` - The `cloudformation_stack` resource

pub mod api;
pub mod lister;
pub mod refresh;
mod sdk;
mod stack;
pub mod waiter;

pub use api::{
    ChangeSetDescription, CloudFormationApi, CreateStackRequest, StackDescription, StackEvent,
    StackSetOperation, StackSetOperationResult, TypeRegistration, UpdateStackRequest,
};
pub use waiter::{
    change_set_created, stack_created, stack_deleted, stack_set_operation_succeeded,
    stack_updated, type_registration_complete,
};

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use msk_core::waiter::Page;

    use super::api::*;
    use crate::error::ApiError;
    use crate::test_utils::{Script, api_error};
    use crate::status::{ChangeSetStatus, RegistrationStatus, StackSetOperationStatus, StackStatus};

    pub(crate) fn stack(id: &str, status: StackStatus) -> StackDescription {
        StackDescription {
            stack_id: id.to_string(),
            stack_name: "orders".to_string(),
            status,
            status_reason: None,
            parameters: HashMap::new(),
            capabilities: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    #[derive(Default)]
    struct Scripts {
        stacks: Script<Option<StackDescription>>,
        change_sets: Script<Option<ChangeSetDescription>>,
        stack_set_operations: Script<Option<StackSetOperation>>,
        registrations: Script<Option<TypeRegistration>>,
        event_pages: VecDeque<Result<Page<StackEvent>, String>>,
        event_requests: Vec<Option<String>>,
        result_pages: VecDeque<Result<Page<StackSetOperationResult>, String>>,
        created: Vec<CreateStackRequest>,
        updated: Vec<UpdateStackRequest>,
        deleted: Vec<(String, String)>,
        no_updates: bool,
    }

    /// In-memory CloudFormation
    #[derive(Default)]
    pub(crate) struct FakeCloudFormation {
        scripts: Mutex<Scripts>,
    }

    impl FakeCloudFormation {
        fn with<T>(&self, f: impl FnOnce(&mut Scripts) -> T) -> T {
            f(&mut self.scripts.lock().unwrap())
        }

        pub(crate) fn push_stack(&self, stack: StackDescription) {
            self.with(|s| s.stacks.push(Ok(Some(stack))));
        }

        pub(crate) fn push_missing_stack(&self) {
            self.with(|s| s.stacks.push(Ok(None)));
        }

        pub(crate) fn fail_next_describe(&self, message: &str) {
            self.with(|s| s.stacks.push(Err(message.to_string())));
        }

        pub(crate) fn push_event_page(&self, records: Vec<StackEvent>, next: Option<&str>) {
            let page = Page {
                records,
                next_page_token: next.map(str::to_string),
            };
            self.with(|s| s.event_pages.push_back(Ok(page)));
        }

        pub(crate) fn push_event_error(&self, message: &str) {
            self.with(|s| s.event_pages.push_back(Err(message.to_string())));
        }

        pub(crate) fn event_page_requests(&self) -> Vec<Option<String>> {
            self.with(|s| s.event_requests.clone())
        }

        pub(crate) fn push_change_set(&self, status: ChangeSetStatus, reason: Option<&str>) {
            let change_set = ChangeSetDescription {
                change_set_id: Some("arn:aws:cloudformation:us-east-1:123456789012:changeSet/cs-1/1".to_string()),
                change_set_name: "cs-1".to_string(),
                stack_id: Some("s-1".to_string()),
                status,
                status_reason: reason.map(str::to_string),
            };
            self.with(|s| s.change_sets.push(Ok(Some(change_set))));
        }

        pub(crate) fn push_stack_set_operation(&self, status: StackSetOperationStatus) {
            let operation = StackSetOperation {
                operation_id: "op-1".to_string(),
                action: Some("CREATE".to_string()),
                status,
                status_reason: None,
            };
            self.with(|s| s.stack_set_operations.push(Ok(Some(operation))));
        }

        pub(crate) fn push_result_page(&self, page: Page<StackSetOperationResult>) {
            self.with(|s| s.result_pages.push_back(Ok(page)));
        }

        pub(crate) fn push_result_error(&self, message: &str) {
            self.with(|s| s.result_pages.push_back(Err(message.to_string())));
        }

        pub(crate) fn push_registration(&self, status: RegistrationStatus, description: Option<&str>) {
            let registration = TypeRegistration {
                status,
                description: description.map(str::to_string),
                type_arn: None,
                type_version_arn: None,
            };
            self.with(|s| s.registrations.push(Ok(Some(registration))));
        }

        pub(crate) fn reject_updates(&self) {
            self.with(|s| s.no_updates = true);
        }

        pub(crate) fn created(&self) -> Vec<CreateStackRequest> {
            self.with(|s| s.created.clone())
        }

        pub(crate) fn updated(&self) -> Vec<UpdateStackRequest> {
            self.with(|s| s.updated.clone())
        }

        pub(crate) fn deleted(&self) -> Vec<(String, String)> {
            self.with(|s| s.deleted.clone())
        }
    }

    #[async_trait]
    impl CloudFormationApi for FakeCloudFormation {
        async fn describe_stack(&self, _stack_id: &str) -> Result<Option<StackDescription>, ApiError> {
            self.with(|s| s.stacks.next())
                .map_err(|m| api_error("DescribeStacks", &m))
        }

        async fn stack_events_page(
            &self,
            _stack_id: &str,
            next_token: Option<&str>,
        ) -> Result<Page<StackEvent>, ApiError> {
            self.with(|s| {
                s.event_requests.push(next_token.map(str::to_string));
                s.event_pages
                    .pop_front()
                    .unwrap_or_else(|| Ok(Page::last(Vec::new())))
            })
            .map_err(|m| api_error("DescribeStackEvents", &m))
        }

        async fn describe_change_set(
            &self,
            _stack_id: &str,
            _change_set_name: &str,
        ) -> Result<Option<ChangeSetDescription>, ApiError> {
            self.with(|s| s.change_sets.next())
                .map_err(|m| api_error("DescribeChangeSet", &m))
        }

        async fn describe_stack_set_operation(
            &self,
            _stack_set_name: &str,
            _operation_id: &str,
        ) -> Result<Option<StackSetOperation>, ApiError> {
            self.with(|s| s.stack_set_operations.next())
                .map_err(|m| api_error("DescribeStackSetOperation", &m))
        }

        async fn stack_set_operation_results_page(
            &self,
            _stack_set_name: &str,
            _operation_id: &str,
            _next_token: Option<&str>,
        ) -> Result<Page<StackSetOperationResult>, ApiError> {
            self.with(|s| {
                s.result_pages
                    .pop_front()
                    .unwrap_or_else(|| Ok(Page::last(Vec::new())))
            })
            .map_err(|m| api_error("ListStackSetOperationResults", &m))
        }

        async fn describe_type_registration(
            &self,
            _registration_token: &str,
        ) -> Result<Option<TypeRegistration>, ApiError> {
            self.with(|s| s.registrations.next())
                .map_err(|m| api_error("DescribeTypeRegistration", &m))
        }

        async fn create_stack(&self, request: CreateStackRequest) -> Result<String, ApiError> {
            let stack_id = format!(
                "arn:aws:cloudformation:us-east-1:123456789012:stack/{}/1",
                request.stack_name
            );
            self.with(|s| s.created.push(request));
            Ok(stack_id)
        }

        async fn update_stack(&self, request: UpdateStackRequest) -> Result<Option<String>, ApiError> {
            self.with(|s| {
                if s.no_updates {
                    return Ok(None);
                }
                let stack_id = request.stack_id.clone();
                s.updated.push(request);
                Ok(Some(stack_id))
            })
        }

        async fn delete_stack(&self, stack_id: &str, client_request_token: &str) -> Result<(), ApiError> {
            self.with(|s| {
                s.deleted
                    .push((stack_id.to_string(), client_request_token.to_string()))
            });
            Ok(())
        }
    }
}
