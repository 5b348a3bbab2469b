//! Wait errors

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::classify::FailureReport;
use super::refresh::StatusSnapshot;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for state to become '{target}' (last state: '{}', timeout: {timeout:?})",
        last_status.as_deref().unwrap_or_default()
    )]
    Timeout {
        target: String,
        last_status: Option<String>,
        timeout: Duration,
    },

    #[error(
        "cancelled while waiting for state to become '{target}' (last state: '{}')",
        last_status.as_deref().unwrap_or_default()
    )]
    Cancelled {
        target: String,
        last_status: Option<String>,
    },

    #[error("unexpected state '{status}', wanted target '{target}'")]
    UnrecognizedStatus { status: String, target: String },

    #[error("{description} not found")]
    NotFound { description: String },

    /// A status or listing call failed; never retried
    #[error("error reading {description}: {source}")]
    Query {
        description: String,
        #[source]
        source: BoxError,
    },

    /// A failure-class status was reached and its reasons were collected
    #[error("{summary} ({status}): {report}")]
    TerminalFailure {
        summary: String,
        status: String,
        report: FailureReport,
    },

    /// A failure-class status was reached but its reasons could not be read
    #[error("{summary} ({status}). Got an error reading failure information: {source}")]
    FailureLookup {
        summary: String,
        status: String,
        #[source]
        source: BoxError,
    },
}

impl WaitError {
    /// Timeouts and cancellations
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. } | WaitError::Cancelled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound { .. })
    }

    /// Reasons of a terminal failure, if this is one
    pub fn failure_report(&self) -> Option<&FailureReport> {
        match self {
            WaitError::TerminalFailure { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// A wait error together with the last snapshot observed before it
#[derive(Debug)]
pub struct WaitFailure<S, R> {
    pub last: Option<StatusSnapshot<S, R>>,
    pub error: WaitError,
}

impl<S, R> WaitFailure<S, R> {
    pub fn new(error: WaitError, last: Option<StatusSnapshot<S, R>>) -> Self {
        Self { last, error }
    }

    pub fn last_status(&self) -> Option<&S> {
        self.last.as_ref().map(|s| &s.status)
    }

    pub fn into_error(self) -> WaitError {
        self.error
    }
}

impl<S, R> fmt::Display for WaitFailure<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<S: fmt::Debug, R: fmt::Debug> std::error::Error for WaitFailure<S, R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<S, R> From<WaitFailure<S, R>> for WaitError {
    fn from(failure: WaitFailure<S, R>) -> Self {
        failure.error
    }
}
