//! Poll policies per operation kind
//!
//! Every long-running operation this provider starts is waited on with one
//! of the policies below. The table is consulted once per wait and never
//! changes at runtime; only the timeout can be overridden through
//! configuration.

use std::time::Duration;

use msk_core::waiter::{FailureStrategy, PollPolicy};

use crate::status::{
    ChangeSetStatus, ConnectorState, RegistrationStatus, StackSetOperationStatus, StackStatus,
};

/// Resource type of a stack's own events
pub const ROOT_STACK_TYPE: &str = "AWS::CloudFormation::Stack";

const STACK_DELAY: Duration = Duration::from_secs(10);
const STACK_CREATED_MIN_POLL: Duration = Duration::from_secs(1);
const STACK_UPDATED_MIN_POLL: Duration = Duration::from_secs(5);
const STACK_DELETED_MIN_POLL: Duration = Duration::from_secs(5);
const STACK_SET_OPERATION_DELAY: Duration = Duration::from_secs(5);
const CONNECTOR_MIN_POLL: Duration = Duration::from_secs(10);

/// Every operation kind that is waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    StackCreate,
    StackUpdate,
    StackDelete,
    ChangeSetCreate,
    StackSetOperation,
    TypeRegistration,
    ConnectorCreate,
    ConnectorUpdate,
    ConnectorDelete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 9] = [
        OperationKind::StackCreate,
        OperationKind::StackUpdate,
        OperationKind::StackDelete,
        OperationKind::ChangeSetCreate,
        OperationKind::StackSetOperation,
        OperationKind::TypeRegistration,
        OperationKind::ConnectorCreate,
        OperationKind::ConnectorUpdate,
        OperationKind::ConnectorDelete,
    ];

    /// Configuration key, e.g. "stack_create"
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::StackCreate => "stack_create",
            OperationKind::StackUpdate => "stack_update",
            OperationKind::StackDelete => "stack_delete",
            OperationKind::ChangeSetCreate => "change_set_create",
            OperationKind::StackSetOperation => "stack_set_operation",
            OperationKind::TypeRegistration => "type_registration",
            OperationKind::ConnectorCreate => "connector_create",
            OperationKind::ConnectorUpdate => "connector_update",
            OperationKind::ConnectorDelete => "connector_delete",
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            OperationKind::StackCreate
            | OperationKind::StackUpdate
            | OperationKind::StackDelete
            | OperationKind::StackSetOperation => Duration::from_secs(30 * 60),
            OperationKind::ChangeSetCreate | OperationKind::TypeRegistration => {
                Duration::from_secs(5 * 60)
            }
            OperationKind::ConnectorCreate
            | OperationKind::ConnectorUpdate
            | OperationKind::ConnectorDelete => Duration::from_secs(20 * 60),
        }
    }
}

// =============================================================================
// Stacks
// =============================================================================

/// Stack operations started by this provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOperation {
    Create,
    Update,
    Delete,
}

impl StackOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            StackOperation::Create => OperationKind::StackCreate,
            StackOperation::Update => OperationKind::StackUpdate,
            StackOperation::Delete => OperationKind::StackDelete,
        }
    }
}

const STACK_CREATE_PENDING: &[StackStatus] = &[
    StackStatus::CreateInProgress,
    StackStatus::DeleteInProgress,
    StackStatus::RollbackInProgress,
];

const STACK_CREATE_TARGET: &[StackStatus] = &[
    StackStatus::CreateComplete,
    StackStatus::CreateFailed,
    StackStatus::DeleteComplete,
    StackStatus::DeleteFailed,
    StackStatus::RollbackComplete,
    StackStatus::RollbackFailed,
];

const STACK_UPDATE_PENDING: &[StackStatus] = &[
    StackStatus::UpdateCompleteCleanupInProgress,
    StackStatus::UpdateInProgress,
    StackStatus::UpdateRollbackInProgress,
    StackStatus::UpdateRollbackCompleteCleanupInProgress,
];

const STACK_UPDATE_TARGET: &[StackStatus] = &[
    StackStatus::CreateComplete,
    StackStatus::UpdateComplete,
    StackStatus::UpdateRollbackComplete,
    StackStatus::UpdateRollbackFailed,
];

const STACK_DELETE_PENDING: &[StackStatus] = &[
    StackStatus::DeleteInProgress,
    StackStatus::RollbackInProgress,
];

const STACK_DELETE_TARGET: &[StackStatus] =
    &[StackStatus::DeleteComplete, StackStatus::DeleteFailed];

pub fn stack_policy(operation: StackOperation, timeout: Duration) -> PollPolicy<StackStatus> {
    match operation {
        StackOperation::Create => {
            PollPolicy::new(STACK_CREATE_PENDING, STACK_CREATE_TARGET, timeout)
                .with_min_poll_interval(STACK_CREATED_MIN_POLL)
                .with_initial_delay(STACK_DELAY)
        }
        StackOperation::Update => {
            PollPolicy::new(STACK_UPDATE_PENDING, STACK_UPDATE_TARGET, timeout)
                .with_min_poll_interval(STACK_UPDATED_MIN_POLL)
                .with_initial_delay(STACK_DELAY)
        }
        // A deleted stack may stop being described at all
        StackOperation::Delete => {
            PollPolicy::new(STACK_DELETE_PENDING, STACK_DELETE_TARGET, timeout)
                .with_min_poll_interval(STACK_DELETED_MIN_POLL)
                .with_initial_delay(STACK_DELAY)
                .settle_when_gone()
        }
    }
}

/// How to explain a terminal stack status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRule {
    pub strategy: FailureStrategy,
    pub summary: &'static str,
}

/// The failure rule for a terminal status, or `None` when it is a success
pub fn stack_failure(operation: StackOperation, status: &StackStatus) -> Option<FailureRule> {
    fn rule(strategy: FailureStrategy, summary: &'static str) -> Option<FailureRule> {
        Some(FailureRule { strategy, summary })
    }
    match (operation, status) {
        // on_failure ROLLBACK, or rollback left enabled
        (
            StackOperation::Create,
            StackStatus::RollbackComplete | StackStatus::RollbackFailed,
        ) => rule(
            FailureStrategy::Rollback,
            "failed to create CloudFormation stack, rollback requested",
        ),
        // on_failure DELETE
        (StackOperation::Create, StackStatus::DeleteComplete | StackStatus::DeleteFailed) => rule(
            FailureStrategy::Deletion {
                root_resource_type: ROOT_STACK_TYPE,
            },
            "failed to create CloudFormation stack, delete requested",
        ),
        // on_failure DO_NOTHING
        (StackOperation::Create, StackStatus::CreateFailed) => rule(
            FailureStrategy::CreateFailure,
            "failed to create CloudFormation stack",
        ),
        (
            StackOperation::Update,
            StackStatus::UpdateRollbackComplete | StackStatus::UpdateRollbackFailed,
        ) => rule(
            FailureStrategy::Rollback,
            "failed to update CloudFormation stack",
        ),
        (StackOperation::Delete, StackStatus::DeleteFailed) => rule(
            FailureStrategy::CreateFailure,
            "failed to delete CloudFormation stack",
        ),
        _ => None,
    }
}

// =============================================================================
// Change sets, stack sets, extension registrations
// =============================================================================

const CHANGE_SET_PENDING: &[ChangeSetStatus] = &[
    ChangeSetStatus::CreatePending,
    ChangeSetStatus::CreateInProgress,
];

const CHANGE_SET_TARGET: &[ChangeSetStatus] =
    &[ChangeSetStatus::CreateComplete, ChangeSetStatus::Failed];

pub fn change_set_policy(timeout: Duration) -> PollPolicy<ChangeSetStatus> {
    PollPolicy::new(CHANGE_SET_PENDING, CHANGE_SET_TARGET, timeout)
}

const STACK_SET_OPERATION_PENDING: &[StackSetOperationStatus] = &[
    StackSetOperationStatus::Queued,
    StackSetOperationStatus::Running,
    StackSetOperationStatus::Stopping,
];

const STACK_SET_OPERATION_TARGET: &[StackSetOperationStatus] = &[
    StackSetOperationStatus::Succeeded,
    StackSetOperationStatus::Failed,
    StackSetOperationStatus::Stopped,
];

pub fn stack_set_operation_policy(timeout: Duration) -> PollPolicy<StackSetOperationStatus> {
    PollPolicy::new(STACK_SET_OPERATION_PENDING, STACK_SET_OPERATION_TARGET, timeout)
        .with_initial_delay(STACK_SET_OPERATION_DELAY)
}

const REGISTRATION_PENDING: &[RegistrationStatus] = &[RegistrationStatus::InProgress];

const REGISTRATION_TARGET: &[RegistrationStatus] =
    &[RegistrationStatus::Complete, RegistrationStatus::Failed];

pub fn type_registration_policy(timeout: Duration) -> PollPolicy<RegistrationStatus> {
    PollPolicy::new(REGISTRATION_PENDING, REGISTRATION_TARGET, timeout)
}

// =============================================================================
// Connectors
// =============================================================================

/// Connector operations started by this provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorOperation {
    Create,
    Update,
    Delete,
}

impl ConnectorOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ConnectorOperation::Create => OperationKind::ConnectorCreate,
            ConnectorOperation::Update => OperationKind::ConnectorUpdate,
            ConnectorOperation::Delete => OperationKind::ConnectorDelete,
        }
    }
}

const CONNECTOR_CREATE_PENDING: &[ConnectorState] = &[ConnectorState::Creating];
const CONNECTOR_UPDATE_PENDING: &[ConnectorState] = &[ConnectorState::Updating];
const CONNECTOR_DELETE_PENDING: &[ConnectorState] = &[ConnectorState::Deleting];
const CONNECTOR_SETTLED: &[ConnectorState] = &[ConnectorState::Running, ConnectorState::Failed];

pub fn connector_policy(
    operation: ConnectorOperation,
    timeout: Duration,
) -> PollPolicy<ConnectorState> {
    match operation {
        ConnectorOperation::Create => {
            PollPolicy::new(CONNECTOR_CREATE_PENDING, CONNECTOR_SETTLED, timeout)
                .with_min_poll_interval(CONNECTOR_MIN_POLL)
        }
        ConnectorOperation::Update => {
            PollPolicy::new(CONNECTOR_UPDATE_PENDING, CONNECTOR_SETTLED, timeout)
                .with_min_poll_interval(CONNECTOR_MIN_POLL)
        }
        // Done only once the connector can no longer be described
        ConnectorOperation::Delete => PollPolicy::new(CONNECTOR_DELETE_PENDING, &[], timeout)
            .with_min_poll_interval(CONNECTOR_MIN_POLL)
            .settle_when_gone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msk_core::waiter::{GoneOutcome, Phase};

    #[test]
    fn every_kind_has_a_positive_default_timeout() {
        for kind in OperationKind::ALL {
            assert!(!kind.default_timeout().is_zero(), "{}", kind.name());
        }
        assert_eq!(
            OperationKind::ChangeSetCreate.default_timeout(),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn stack_create_settles_on_rollback() {
        let policy = stack_policy(StackOperation::Create, Duration::from_secs(60));
        assert_eq!(policy.phase(&StackStatus::RollbackInProgress), Phase::Pending);
        assert_eq!(policy.phase(&StackStatus::RollbackComplete), Phase::Target);
        assert_eq!(policy.phase(&StackStatus::UpdateInProgress), Phase::Unrecognized);
        assert_eq!(policy.initial_delay, STACK_DELAY);
        assert_eq!(policy.min_poll_interval, Duration::from_secs(1));
        assert_eq!(policy.on_gone, GoneOutcome::Fail);
    }

    #[test]
    fn only_deletions_settle_when_gone() {
        let timeout = Duration::from_secs(60);
        assert_eq!(
            stack_policy(StackOperation::Delete, timeout).on_gone,
            GoneOutcome::Settle
        );
        assert_eq!(
            stack_policy(StackOperation::Update, timeout).on_gone,
            GoneOutcome::Fail
        );
        assert_eq!(
            connector_policy(ConnectorOperation::Delete, timeout).on_gone,
            GoneOutcome::Settle
        );
        assert_eq!(
            connector_policy(ConnectorOperation::Create, timeout).on_gone,
            GoneOutcome::Fail
        );
        assert_eq!(change_set_policy(timeout).on_gone, GoneOutcome::Fail);
    }

    #[test]
    fn stack_failure_rules() {
        let rule = stack_failure(StackOperation::Create, &StackStatus::RollbackFailed).unwrap();
        assert_eq!(rule.strategy, FailureStrategy::Rollback);

        let rule = stack_failure(StackOperation::Create, &StackStatus::DeleteComplete).unwrap();
        assert!(matches!(rule.strategy, FailureStrategy::Deletion { .. }));
        assert_eq!(
            rule.summary,
            "failed to create CloudFormation stack, delete requested"
        );

        assert!(stack_failure(StackOperation::Create, &StackStatus::CreateComplete).is_none());
        // Update settles on CREATE_COMPLETE when nothing changed
        assert!(stack_failure(StackOperation::Update, &StackStatus::CreateComplete).is_none());
        assert!(stack_failure(StackOperation::Delete, &StackStatus::DeleteComplete).is_none());
        assert_eq!(
            stack_failure(StackOperation::Delete, &StackStatus::DeleteFailed)
                .unwrap()
                .strategy,
            FailureStrategy::CreateFailure
        );
    }

    #[test]
    fn stack_set_operation_waits_through_queue() {
        let policy = stack_set_operation_policy(Duration::from_secs(60));
        assert_eq!(policy.phase(&StackSetOperationStatus::Queued), Phase::Pending);
        assert_eq!(policy.phase(&StackSetOperationStatus::Stopped), Phase::Target);
        assert_eq!(policy.initial_delay, Duration::from_secs(5));
    }

    #[test]
    fn connector_delete_has_no_target_status() {
        let policy = connector_policy(ConnectorOperation::Delete, Duration::from_secs(60));
        assert_eq!(policy.phase(&ConnectorState::Deleting), Phase::Pending);
        assert_eq!(policy.phase(&ConnectorState::Running), Phase::Unrecognized);
        assert_eq!(policy.target_description(), "");
    }
}
