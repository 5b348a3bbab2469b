//! MSK Connect API surface used by the connector resource

use std::collections::HashMap;

use async_trait::async_trait;
use msk_core::waiter::Page;

use crate::error::ApiError;
use crate::status::ConnectorState;

/// Where workers ship their logs; each destination is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogDelivery {
    pub cloudwatch_log_group: Option<String>,
    pub firehose_delivery_stream: Option<String>,
    pub s3: Option<S3LogDelivery>,
}

impl LogDelivery {
    pub fn is_empty(&self) -> bool {
        self.cloudwatch_log_group.is_none()
            && self.firehose_delivery_stream.is_none()
            && self.s3.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3LogDelivery {
    pub bucket: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorDescription {
    pub connector_arn: String,
    pub connector_name: Option<String>,
    pub connector_description: Option<String>,
    pub state: ConnectorState,
    /// Explanation attached to a FAILED connector
    pub state_reason: Option<String>,
    pub current_version: Option<String>,
    pub mcu_count: Option<i32>,
    pub worker_count: Option<i32>,
    pub auth_type: Option<String>,
    pub encryption_type: Option<String>,
    pub bootstrap_servers: Option<String>,
    pub security_groups: Vec<String>,
    pub subnets: Vec<String>,
    pub kafka_connect_version: Option<String>,
    pub connector_configuration: HashMap<String, String>,
    pub log_delivery: LogDelivery,
    pub execution_role_arn: Option<String>,
    pub plugin_arns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomPluginSummary {
    pub arn: String,
    pub name: Option<String>,
    pub latest_revision: Option<i64>,
}

/// A custom plugin pinned to one revision
#[derive(Debug, Clone, PartialEq)]
pub struct PluginRef {
    pub arn: String,
    pub revision: i64,
}

/// Everything CreateConnector needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorSpec {
    pub connector_name: String,
    pub connector_description: String,
    pub connector_configuration: HashMap<String, String>,
    pub mcu_count: i32,
    pub worker_count: i32,
    pub auth_type: String,
    pub encryption_type: String,
    pub bootstrap_servers: String,
    pub security_groups: Vec<String>,
    pub subnets: Vec<String>,
    pub kafka_connect_version: String,
    pub execution_role_arn: String,
    pub plugins: Vec<PluginRef>,
    pub log_delivery: LogDelivery,
}

#[async_trait]
pub trait KafkaConnectApi: Send + Sync {
    async fn describe_connector(
        &self,
        connector_arn: &str,
    ) -> Result<Option<ConnectorDescription>, ApiError>;

    async fn custom_plugins_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<CustomPluginSummary>, ApiError>;

    /// Returns the new connector's ARN
    async fn create_connector(&self, spec: &ConnectorSpec) -> Result<String, ApiError>;

    async fn update_connector_capacity(
        &self,
        connector_arn: &str,
        current_version: &str,
        mcu_count: i32,
        worker_count: i32,
    ) -> Result<(), ApiError>;

    async fn delete_connector(
        &self,
        connector_arn: &str,
        current_version: Option<&str>,
    ) -> Result<(), ApiError>;
}
