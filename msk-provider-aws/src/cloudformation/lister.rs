//! Paginated CloudFormation listings scoped to one operation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use msk_core::waiter::{EventRecord, Page, Pager};

use super::api::{CloudFormationApi, StackSetOperationResult};
use crate::error::ApiError;

/// Stack events caused by one client request token
///
/// Events are listed newest first, so the events of an operation form one
/// run: everything before the first event carrying the token belongs to
/// later operations and is skipped, and the first event after the run with
/// a different token ends the listing.
pub struct OperationEvents {
    api: Arc<dyn CloudFormationApi>,
    stack_id: String,
    request_token: String,
    token_seen: AtomicBool,
}

impl OperationEvents {
    pub fn new(
        api: Arc<dyn CloudFormationApi>,
        stack_id: impl Into<String>,
        request_token: impl Into<String>,
    ) -> Self {
        Self {
            api,
            stack_id: stack_id.into(),
            request_token: request_token.into(),
            token_seen: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Pager for OperationEvents {
    type Record = EventRecord;
    type Error = ApiError;

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page<EventRecord>, ApiError> {
        if page_token.is_none() {
            self.token_seen.store(false, Ordering::SeqCst);
        }
        let page = self.api.stack_events_page(&self.stack_id, page_token).await?;

        let mut records = Vec::new();
        let mut seen = self.token_seen.load(Ordering::SeqCst);
        for event in page.records {
            let matches = event.client_request_token.as_deref() == Some(self.request_token.as_str());
            if !seen {
                if !matches {
                    continue;
                }
                seen = true;
            } else if !matches {
                self.token_seen.store(seen, Ordering::SeqCst);
                return Ok(Page::last(records));
            }
            records.push(event.record);
        }
        self.token_seen.store(seen, Ordering::SeqCst);

        Ok(Page {
            records,
            next_page_token: page.next_page_token,
        })
    }
}

/// Per-account results of a stack set operation
pub struct StackSetOperationResults {
    api: Arc<dyn CloudFormationApi>,
    stack_set_name: String,
    operation_id: String,
}

impl StackSetOperationResults {
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
impl Pager for StackSetOperationResults {
    type Record = StackSetOperationResult;
    type Error = ApiError;

    async fn fetch_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<StackSetOperationResult>, ApiError> {
        self.api
            .stack_set_operation_results_page(&self.stack_set_name, &self.operation_id, page_token)
            .await
    }
}

/// One line per account/region that did not succeed
pub fn stack_set_failure_reason(result: &StackSetOperationResult) -> Option<String> {
    let status = result.status.as_deref().unwrap_or_default();
    if status == "SUCCEEDED" {
        return None;
    }
    Some(format!(
        "Account ({}), Region ({}), Status ({}): {}",
        result.account.as_deref().unwrap_or_default(),
        result.region.as_deref().unwrap_or_default(),
        status,
        result.status_reason.as_deref().unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::api::StackEvent;
    use crate::cloudformation::tests::FakeCloudFormation;
    use msk_core::waiter::{FailureStrategy, collect_failure_reasons};

    fn event(id: &str, status: &str, reason: &str, token: &str) -> StackEvent {
        StackEvent {
            record: EventRecord::new(id, "AWS::SQS::Queue", status).with_reason(reason),
            client_request_token: Some(token.to_string()),
        }
    }

    #[tokio::test]
    async fn only_events_of_the_operation_are_listed() {
        let fake = Arc::new(FakeCloudFormation::default());
        fake.push_event_page(
            vec![
                event("Newer", "UPDATE_FAILED", "later operation", "tok-2"),
                event("Queue", "CREATE_FAILED", "denied", "tok-1"),
            ],
            Some("p2"),
        );
        fake.push_event_page(
            vec![
                event("Topic", "CREATE_FAILED", "limit", "tok-1"),
                event("Older", "CREATE_FAILED", "earlier operation", "tok-0"),
                event("Oldest", "CREATE_FAILED", "never fetched", "tok-1"),
            ],
            Some("p3"),
        );

        let pager = OperationEvents::new(fake.clone(), "stack-1", "tok-1");
        let report = collect_failure_reasons(&pager, FailureStrategy::CreateFailure)
            .await
            .unwrap();

        assert_eq!(report.reasons(), ["denied", "limit"]);
        assert_eq!(
            fake.event_page_requests(),
            vec![None, Some("p2".to_string())]
        );
    }

    #[tokio::test]
    async fn listing_restarts_from_first_page() {
        let fake = Arc::new(FakeCloudFormation::default());
        for _ in 0..2 {
            fake.push_event_page(vec![event("Queue", "CREATE_FAILED", "denied", "tok-1")], None);
        }
        let pager = OperationEvents::new(fake.clone(), "stack-1", "tok-1");

        for _ in 0..2 {
            let report = collect_failure_reasons(&pager, FailureStrategy::CreateFailure)
                .await
                .unwrap();
            assert_eq!(report.reasons(), ["denied"]);
        }
    }

    #[test]
    fn stack_set_reasons_skip_successes() {
        let failed = StackSetOperationResult {
            account: Some("123456789012".to_string()),
            region: Some("eu-west-1".to_string()),
            status: Some("FAILED".to_string()),
            status_reason: Some("Account has no quota".to_string()),
        };
        assert_eq!(
            stack_set_failure_reason(&failed).unwrap(),
            "Account (123456789012), Region (eu-west-1), Status (FAILED): Account has no quota"
        );

        let ok = StackSetOperationResult {
            status: Some("SUCCEEDED".to_string()),
            ..failed
        };
        assert!(stack_set_failure_reason(&ok).is_none());
    }
}
