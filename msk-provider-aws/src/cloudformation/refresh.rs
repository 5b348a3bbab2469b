//! Status refreshers for CloudFormation operations

use std::sync::Arc;

use async_trait::async_trait;
use msk_core::waiter::{Refresh, StatusRefresher, StatusSnapshot};

use super::api::{
    ChangeSetDescription, CloudFormationApi, StackDescription, StackSetOperation, TypeRegistration,
};
use crate::error::ApiError;
use crate::status::{ChangeSetStatus, RegistrationStatus, StackSetOperationStatus, StackStatus};

fn found<S, R>(status: S, raw: R) -> Refresh<S, R> {
    Refresh::Found(StatusSnapshot::new(status, raw))
}

pub struct StackRefresher {
    api: Arc<dyn CloudFormationApi>,
    stack_id: String,
}

impl StackRefresher {
    pub fn new(api: Arc<dyn CloudFormationApi>, stack_id: impl Into<String>) -> Self {
        Self {
            api,
            stack_id: stack_id.into(),
        }
    }
}

#[async_trait]
impl StatusRefresher for StackRefresher {
    type Status = StackStatus;
    type Object = StackDescription;
    type Error = ApiError;

    fn describe(&self) -> String {
        format!("CloudFormation Stack ({})", self.stack_id)
    }

    async fn refresh(&self) -> Result<Refresh<StackStatus, StackDescription>, ApiError> {
        Ok(match self.api.describe_stack(&self.stack_id).await? {
            Some(stack) => found(stack.status.clone(), stack),
            None => Refresh::Gone,
        })
    }
}

pub struct ChangeSetRefresher {
    api: Arc<dyn CloudFormationApi>,
    stack_id: String,
    change_set_name: String,
}

impl ChangeSetRefresher {
    pub fn new(
        api: Arc<dyn CloudFormationApi>,
        stack_id: impl Into<String>,
        change_set_name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            stack_id: stack_id.into(),
            change_set_name: change_set_name.into(),
        }
    }
}

#[async_trait]
impl StatusRefresher for ChangeSetRefresher {
    type Status = ChangeSetStatus;
    type Object = ChangeSetDescription;
    type Error = ApiError;

    fn describe(&self) -> String {
        format!(
            "CloudFormation Change Set ({}) of Stack ({})",
            self.change_set_name, self.stack_id
        )
    }

    async fn refresh(&self) -> Result<Refresh<ChangeSetStatus, ChangeSetDescription>, ApiError> {
        Ok(
            match self
                .api
                .describe_change_set(&self.stack_id, &self.change_set_name)
                .await?
            {
                Some(change_set) => found(change_set.status.clone(), change_set),
                None => Refresh::Gone,
            },
        )
    }
}

pub struct StackSetOperationRefresher {
    api: Arc<dyn CloudFormationApi>,
    stack_set_name: String,
    operation_id: String,
}

impl StackSetOperationRefresher {
    pub fn new(
        api: Arc<dyn CloudFormationApi>,
        stack_set_name: impl Into<String>,
        operation_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            stack_set_name: stack_set_name.into(),
            operation_id: operation_id.into(),
        }
    }
}

#[async_trait]
impl StatusRefresher for StackSetOperationRefresher {
    type Status = StackSetOperationStatus;
    type Object = StackSetOperation;
    type Error = ApiError;

    fn describe(&self) -> String {
        format!(
            "CloudFormation Stack Set ({}) Operation ({})",
            self.stack_set_name, self.operation_id
        )
    }

    async fn refresh(
        &self,
    ) -> Result<Refresh<StackSetOperationStatus, StackSetOperation>, ApiError> {
        Ok(
            match self
                .api
                .describe_stack_set_operation(&self.stack_set_name, &self.operation_id)
                .await?
            {
                Some(operation) => found(operation.status.clone(), operation),
                None => Refresh::Gone,
            },
        )
    }
}

pub struct TypeRegistrationRefresher {
    api: Arc<dyn CloudFormationApi>,
    registration_token: String,
}

impl TypeRegistrationRefresher {
    pub fn new(api: Arc<dyn CloudFormationApi>, registration_token: impl Into<String>) -> Self {
        Self {
            api,
            registration_token: registration_token.into(),
        }
    }
}

#[async_trait]
impl StatusRefresher for TypeRegistrationRefresher {
    type Status = RegistrationStatus;
    type Object = TypeRegistration;
    type Error = ApiError;

    fn describe(&self) -> String {
        format!(
            "CloudFormation Type Registration ({})",
            self.registration_token
        )
    }

    async fn refresh(&self) -> Result<Refresh<RegistrationStatus, TypeRegistration>, ApiError> {
        Ok(
            match self
                .api
                .describe_type_registration(&self.registration_token)
                .await?
            {
                Some(registration) => found(registration.status.clone(), registration),
                None => Refresh::Gone,
            },
        )
    }
}
