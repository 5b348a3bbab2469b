//! Failure classification: turning an event log into reasons a human can act on

use std::fmt;
use std::ops::ControlFlow;

use super::events::{EventRecord, Pager, for_each_event};

pub const FAILED_SUFFIX: &str = "_FAILED";
pub const ROLLBACK_PREFIX: &str = "ROLLBACK_";
pub const DELETE_IN_PROGRESS: &str = "DELETE_IN_PROGRESS";

/// Which events explain a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStrategy {
    /// `*_FAILED` events
    CreateFailure,
    /// `*_FAILED` or `ROLLBACK_*` events
    Rollback,
    /// `*_FAILED` events, or the root resource itself entering deletion
    Deletion { root_resource_type: &'static str },
}

impl FailureStrategy {
    pub fn matches(&self, event: &EventRecord) -> bool {
        match self {
            FailureStrategy::CreateFailure => is_failed_event(event),
            FailureStrategy::Rollback => is_failed_event(event) || is_rollback_event(event),
            FailureStrategy::Deletion { root_resource_type } => {
                is_failed_event(event) || is_root_deletion_event(event, root_resource_type)
            }
        }
    }
}

pub fn is_failed_event(event: &EventRecord) -> bool {
    event.resource_status.ends_with(FAILED_SUFFIX) && event.reason().is_some()
}

pub fn is_rollback_event(event: &EventRecord) -> bool {
    event.resource_status.starts_with(ROLLBACK_PREFIX) && event.reason().is_some()
}

/// The root resource's own `DELETE_IN_PROGRESS`, as opposed to a nested
/// resource reporting its deletion
pub fn is_root_deletion_event(event: &EventRecord, root_resource_type: &str) -> bool {
    event.resource_status == DELETE_IN_PROGRESS
        && event.resource_type == root_resource_type
        && event.reason().is_some()
}

/// Ordered failure reasons for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    reasons: Vec<String>,
}

impl FailureReport {
    pub fn new(reasons: Vec<String>) -> Self {
        Self { reasons }
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl From<Vec<String>> for FailureReport {
    fn from(reasons: Vec<String>) -> Self {
        Self::new(reasons)
    }
}

/// Quoted list, e.g. `["Resource creation cancelled", "Access denied"]`
impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.reasons)
    }
}

/// Classify every event of a listing with `strategy`
///
/// Reasons keep event order. On a listing error nothing collected so far
/// is returned.
pub async fn collect_failure_reasons<P>(
    pager: &P,
    strategy: FailureStrategy,
) -> Result<FailureReport, P::Error>
where
    P: Pager<Record = EventRecord> + ?Sized,
{
    let mut reasons = Vec::new();
    for_each_event(pager, |event| {
        if strategy.matches(event)
            && let Some(reason) = event.reason()
        {
            reasons.push(reason.to_string());
        }
        ControlFlow::Continue(())
    })
    .await?;
    Ok(FailureReport::new(reasons))
}
