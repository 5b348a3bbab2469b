//! Status refreshers: one read of a remote operation's status

use std::fmt;

use async_trait::async_trait;

/// A point-in-time read of a remote object
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot<S, R> {
    pub status: S,
    /// Full response object, used for field extraction after the wait
    pub raw: R,
}

impl<S, R> StatusSnapshot<S, R> {
    pub fn new(status: S, raw: R) -> Self {
        Self { status, raw }
    }
}

/// Result of one successful refresh
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh<S, R> {
    Found(StatusSnapshot<S, R>),
    /// The remote object no longer exists
    Gone,
}

/// Reads the current status of one remote operation
///
/// Implementations capture their API client and operation handle at
/// construction. `refresh` must be side-effect free and safe to call
/// repeatedly.
#[async_trait]
pub trait StatusRefresher: Send + Sync {
    type Status: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync;
    type Object: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// What is being waited on, e.g. "CloudFormation Stack (arn:...)"
    fn describe(&self) -> String;

    async fn refresh(&self) -> Result<Refresh<Self::Status, Self::Object>, Self::Error>;
}
