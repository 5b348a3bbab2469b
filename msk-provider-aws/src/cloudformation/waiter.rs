//! Waits for CloudFormation operations
//!
//! Each function polls one operation to a settled status and, when that
//! status is a failure, explains it. The failure error carries the settled
//! object so callers can still record what was created.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use msk_core::waiter::{
    FailureReport, Settled, StatusRefresher, StatusSnapshot, WaitError, WaitFailure, Waiter,
    collect_failure_reasons, for_each_event,
};

use super::api::{
    ChangeSetDescription, CloudFormationApi, StackDescription, StackSetOperation, TypeRegistration,
};
use super::lister::{OperationEvents, StackSetOperationResults, stack_set_failure_reason};
use super::refresh::{
    ChangeSetRefresher, StackRefresher, StackSetOperationRefresher, TypeRegistrationRefresher,
};
use crate::policy::{
    StackOperation, change_set_policy, stack_failure, stack_policy, stack_set_operation_policy,
    type_registration_policy,
};
use crate::status::{ChangeSetStatus, RegistrationStatus, StackSetOperationStatus, StackStatus};

pub type StackWaitFailure = WaitFailure<StackStatus, StackDescription>;
pub type ChangeSetWaitFailure = WaitFailure<ChangeSetStatus, ChangeSetDescription>;
pub type StackSetOperationWaitFailure = WaitFailure<StackSetOperationStatus, StackSetOperation>;
pub type TypeRegistrationWaitFailure = WaitFailure<RegistrationStatus, TypeRegistration>;

/// Reasons given as a single optional message
fn single_reason(reason: Option<&str>) -> FailureReport {
    FailureReport::new(
        reason
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .into_iter()
            .collect(),
    )
}

fn reached<S, R>(
    settled: Settled<S, R>,
    description: String,
) -> Result<StatusSnapshot<S, R>, WaitFailure<S, R>> {
    match settled {
        Settled::Reached(snapshot) => Ok(snapshot),
        Settled::Gone(last) => Err(WaitFailure::new(WaitError::NotFound { description }, last)),
    }
}

/// Wait for a stack operation and explain a failed outcome from the
/// operation's events. `None` means the stack is gone.
async fn stack_settled(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    operation: StackOperation,
    stack_id: &str,
    request_token: &str,
    timeout: Duration,
) -> Result<Option<StackDescription>, StackWaitFailure> {
    let refresher = StackRefresher::new(api.clone(), stack_id);
    let policy = stack_policy(operation, timeout);

    let snapshot = match waiter.wait(&refresher, &policy).await? {
        Settled::Reached(snapshot) => snapshot,
        Settled::Gone(_) => return Ok(None),
    };

    let Some(rule) = stack_failure(operation, &snapshot.status) else {
        return Ok(Some(snapshot.raw));
    };

    log::warn!(
        "CloudFormation Stack ({}) settled in {}, reading failure events",
        stack_id,
        snapshot.status
    );
    let events = OperationEvents::new(api.clone(), stack_id, request_token);
    let summary = rule.summary.to_string();
    let status = snapshot.status.to_string();
    let error = match collect_failure_reasons(&events, rule.strategy).await {
        Ok(report) => WaitError::TerminalFailure {
            summary,
            status,
            report,
        },
        Err(e) => WaitError::FailureLookup {
            summary,
            status,
            source: Box::new(e),
        },
    };
    Err(WaitFailure::new(error, Some(snapshot)))
}

pub async fn stack_created(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    stack_id: &str,
    request_token: &str,
    timeout: Duration,
) -> Result<StackDescription, StackWaitFailure> {
    stack_settled(waiter, api, StackOperation::Create, stack_id, request_token, timeout)
        .await?
        .ok_or_else(|| stack_gone(stack_id))
}

pub async fn stack_updated(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    stack_id: &str,
    request_token: &str,
    timeout: Duration,
) -> Result<StackDescription, StackWaitFailure> {
    stack_settled(waiter, api, StackOperation::Update, stack_id, request_token, timeout)
        .await?
        .ok_or_else(|| stack_gone(stack_id))
}

/// `None` when the stack can no longer be described
pub async fn stack_deleted(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    stack_id: &str,
    request_token: &str,
    timeout: Duration,
) -> Result<Option<StackDescription>, StackWaitFailure> {
    stack_settled(waiter, api, StackOperation::Delete, stack_id, request_token, timeout).await
}

fn stack_gone(stack_id: &str) -> StackWaitFailure {
    WaitFailure::new(
        WaitError::NotFound {
            description: format!("CloudFormation Stack ({})", stack_id),
        },
        None,
    )
}

pub async fn change_set_created(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    stack_id: &str,
    change_set_name: &str,
    timeout: Duration,
) -> Result<ChangeSetDescription, ChangeSetWaitFailure> {
    let refresher = ChangeSetRefresher::new(api.clone(), stack_id, change_set_name);
    let settled = waiter.wait(&refresher, &change_set_policy(timeout)).await?;
    let snapshot = reached(settled, refresher.describe())?;

    if snapshot.status != ChangeSetStatus::Failed {
        return Ok(snapshot.raw);
    }
    let error = WaitError::TerminalFailure {
        summary: format!("failed to create CloudFormation Change Set ({})", change_set_name),
        status: snapshot.status.to_string(),
        report: single_reason(snapshot.raw.status_reason.as_deref()),
    };
    Err(WaitFailure::new(error, Some(snapshot)))
}

pub async fn stack_set_operation_succeeded(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    stack_set_name: &str,
    operation_id: &str,
    timeout: Duration,
) -> Result<StackSetOperation, StackSetOperationWaitFailure> {
    let refresher = StackSetOperationRefresher::new(api.clone(), stack_set_name, operation_id);
    let settled = waiter
        .wait(&refresher, &stack_set_operation_policy(timeout))
        .await?;
    let snapshot = reached(settled, refresher.describe())?;

    if snapshot.status == StackSetOperationStatus::Succeeded {
        return Ok(snapshot.raw);
    }

    let results = StackSetOperationResults::new(api.clone(), stack_set_name, operation_id);
    let mut reasons = Vec::new();
    let listed = for_each_event(&results, |result| {
        reasons.extend(stack_set_failure_reason(result));
        ControlFlow::Continue(())
    })
    .await;

    let summary = format!(
        "CloudFormation Stack Set ({}) Operation ({}) failed",
        stack_set_name, operation_id
    );
    let status = snapshot.status.to_string();
    let error = match listed {
        Ok(()) => WaitError::TerminalFailure {
            summary,
            status,
            report: FailureReport::new(reasons),
        },
        Err(e) => WaitError::FailureLookup {
            summary,
            status,
            source: Box::new(e),
        },
    };
    Err(WaitFailure::new(error, Some(snapshot)))
}

pub async fn type_registration_complete(
    waiter: &Waiter,
    api: &Arc<dyn CloudFormationApi>,
    registration_token: &str,
    timeout: Duration,
) -> Result<TypeRegistration, TypeRegistrationWaitFailure> {
    let refresher = TypeRegistrationRefresher::new(api.clone(), registration_token);
    let settled = waiter
        .wait(&refresher, &type_registration_policy(timeout))
        .await?;
    let snapshot = reached(settled, refresher.describe())?;

    if snapshot.status != RegistrationStatus::Failed {
        return Ok(snapshot.raw);
    }
    let error = WaitError::TerminalFailure {
        summary: format!(
            "CloudFormation Type Registration ({}) failed",
            registration_token
        ),
        status: snapshot.status.to_string(),
        report: single_reason(snapshot.raw.description.as_deref()),
    };
    Err(WaitFailure::new(error, Some(snapshot)))
}
