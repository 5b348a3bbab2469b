//! Paginated event and result listings

use std::ops::ControlFlow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One log entry reported by the remote system for an operation
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn new(
        logical_resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_status: impl Into<String>,
    ) -> Self {
        Self {
            resource_status: resource_status.into(),
            resource_status_reason: None,
            resource_type: resource_type.into(),
            logical_resource_id: logical_resource_id.into(),
            timestamp: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.resource_status_reason = Some(reason.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The reason, if present and non-empty
    pub fn reason(&self) -> Option<&str> {
        self.resource_status_reason
            .as_deref()
            .filter(|r| !r.is_empty())
    }
}

/// One page of records
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// `None` (or empty) marks the last page
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(records: Vec<T>) -> Self {
        Self {
            records,
            next_page_token: None,
        }
    }

    pub fn with_next(records: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            records,
            next_page_token: Some(token.into()),
        }
    }
}

/// Fetches the pages of one listing
///
/// Like refreshers, pagers capture their client and operation handle at
/// construction.
#[async_trait]
pub trait Pager: Send + Sync {
    type Record: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<Page<Self::Record>, Self::Error>;
}

/// Visit every record of a listing in the API's native order
///
/// Pages are fetched lazily, starting from the first page. Listing ends at
/// the last page or as soon as `visit` breaks. A page error aborts the
/// listing; anything `visit` accumulated must then be discarded by the caller.
pub async fn for_each_event<P, F>(pager: &P, mut visit: F) -> Result<(), P::Error>
where
    P: Pager + ?Sized,
    F: FnMut(&P::Record) -> ControlFlow<()>,
{
    let mut page_token: Option<String> = None;
    loop {
        let page = pager.fetch_page(page_token.as_deref()).await?;
        for record in &page.records {
            if visit(record).is_break() {
                return Ok(());
            }
        }
        match page.next_page_token {
            Some(next) if !next.is_empty() => page_token = Some(next),
            _ => return Ok(()),
        }
    }
}
