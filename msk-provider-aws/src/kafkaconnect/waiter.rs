//! Waits for MSK Connect connector operations

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use msk_core::waiter::{
    FailureReport, Refresh, Settled, StatusRefresher, StatusSnapshot, WaitError, WaitFailure,
    Waiter,
};

use super::api::{ConnectorDescription, KafkaConnectApi};
use crate::error::ApiError;
use crate::policy::{ConnectorOperation, connector_policy};
use crate::status::ConnectorState;

pub type ConnectorWaitFailure = WaitFailure<ConnectorState, ConnectorDescription>;

pub struct ConnectorRefresher {
    api: Arc<dyn KafkaConnectApi>,
    connector_arn: String,
}

impl ConnectorRefresher {
    pub fn new(api: Arc<dyn KafkaConnectApi>, connector_arn: impl Into<String>) -> Self {
        Self {
            api,
            connector_arn: connector_arn.into(),
        }
    }
}

#[async_trait]
impl StatusRefresher for ConnectorRefresher {
    type Status = ConnectorState;
    type Object = ConnectorDescription;
    type Error = ApiError;

    fn describe(&self) -> String {
        format!("MSK Connect Connector ({})", self.connector_arn)
    }

    async fn refresh(&self) -> Result<Refresh<ConnectorState, ConnectorDescription>, ApiError> {
        Ok(match self.api.describe_connector(&self.connector_arn).await? {
            Some(connector) => {
                Refresh::Found(StatusSnapshot::new(connector.state.clone(), connector))
            }
            None => Refresh::Gone,
        })
    }
}

async fn connector_settled(
    waiter: &Waiter,
    api: &Arc<dyn KafkaConnectApi>,
    operation: ConnectorOperation,
    connector_arn: &str,
    timeout: Duration,
) -> Result<ConnectorDescription, ConnectorWaitFailure> {
    let refresher = ConnectorRefresher::new(api.clone(), connector_arn);
    let snapshot = match waiter
        .wait(&refresher, &connector_policy(operation, timeout))
        .await?
    {
        Settled::Reached(snapshot) => snapshot,
        Settled::Gone(last) => {
            let description = refresher.describe();
            return Err(WaitFailure::new(WaitError::NotFound { description }, last));
        }
    };

    if snapshot.status != ConnectorState::Failed {
        return Ok(snapshot.raw);
    }
    let verb = match operation {
        ConnectorOperation::Create => "create",
        ConnectorOperation::Update => "update",
        ConnectorOperation::Delete => "delete",
    };
    let reasons = snapshot.raw.state_reason.iter().cloned().collect();
    let error = WaitError::TerminalFailure {
        summary: format!("failed to {} MSK Connect Connector ({})", verb, connector_arn),
        status: snapshot.status.to_string(),
        report: FailureReport::new(reasons),
    };
    Err(WaitFailure::new(error, Some(snapshot)))
}

pub async fn connector_created(
    waiter: &Waiter,
    api: &Arc<dyn KafkaConnectApi>,
    connector_arn: &str,
    timeout: Duration,
) -> Result<ConnectorDescription, ConnectorWaitFailure> {
    connector_settled(waiter, api, ConnectorOperation::Create, connector_arn, timeout).await
}

pub async fn connector_updated(
    waiter: &Waiter,
    api: &Arc<dyn KafkaConnectApi>,
    connector_arn: &str,
    timeout: Duration,
) -> Result<ConnectorDescription, ConnectorWaitFailure> {
    connector_settled(waiter, api, ConnectorOperation::Update, connector_arn, timeout).await
}

/// Settles once the connector can no longer be described
pub async fn connector_deleted(
    waiter: &Waiter,
    api: &Arc<dyn KafkaConnectApi>,
    connector_arn: &str,
    timeout: Duration,
) -> Result<(), ConnectorWaitFailure> {
    let refresher = ConnectorRefresher::new(api.clone(), connector_arn);
    waiter
        .wait(
            &refresher,
            &connector_policy(ConnectorOperation::Delete, timeout),
        )
        .await?;
    Ok(())
}
