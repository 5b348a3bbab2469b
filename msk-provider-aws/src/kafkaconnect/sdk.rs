//! `KafkaConnectApi` for the AWS SDK client

use async_trait::async_trait;
use aws_sdk_kafkaconnect::Client;
use aws_sdk_kafkaconnect::error::BuildError;
use aws_sdk_kafkaconnect::operation::describe_connector::DescribeConnectorOutput;
use aws_sdk_kafkaconnect::types;
use msk_core::waiter::Page;

use super::api::{
    ConnectorDescription, ConnectorSpec, CustomPluginSummary, KafkaConnectApi, LogDelivery,
    S3LogDelivery,
};
use crate::error::{ApiError, sdk_error};
use crate::status::ConnectorState;
use crate::utils::{number, text};

fn invalid(operation: &'static str) -> impl Fn(BuildError) -> ApiError {
    move |e| ApiError::InvalidRequest {
        operation,
        message: e.to_string(),
    }
}

fn log_delivery(output: &DescribeConnectorOutput) -> LogDelivery {
    let Some(worker) = output
        .log_delivery()
        .and_then(|l| l.worker_log_delivery())
    else {
        return LogDelivery::default();
    };
    LogDelivery {
        cloudwatch_log_group: worker.cloud_watch_logs().and_then(|c| text(c.log_group())),
        firehose_delivery_stream: worker.firehose().and_then(|f| text(f.delivery_stream())),
        s3: worker.s3().and_then(|s3| {
            Some(S3LogDelivery {
                bucket: text(s3.bucket())?,
                prefix: text(s3.prefix())?,
            })
        }),
    }
}

fn connector_description(arn: &str, output: &DescribeConnectorOutput) -> ConnectorDescription {
    let state: Option<&types::ConnectorState> = output.connector_state().into();
    let provisioned = output.capacity().and_then(|c| c.provisioned_capacity());
    let apache = output
        .kafka_cluster()
        .and_then(|k| k.apache_kafka_cluster());
    let vpc = apache.and_then(|a| a.vpc());
    let auth: Option<&types::KafkaClusterClientAuthenticationType> = output
        .kafka_cluster_client_authentication()
        .and_then(|a| a.authentication_type());
    let encryption: Option<&types::KafkaClusterEncryptionInTransitType> = output
        .kafka_cluster_encryption_in_transit()
        .and_then(|e| e.encryption_type());

    ConnectorDescription {
        connector_arn: text(output.connector_arn()).unwrap_or_else(|| arn.to_string()),
        connector_name: text(output.connector_name()),
        connector_description: text(output.connector_description()),
        state: ConnectorState::from(state.map(|s| s.as_str()).unwrap_or_default()),
        state_reason: output.state_description().and_then(|d| text(d.message())),
        current_version: text(output.current_version()),
        mcu_count: provisioned.and_then(|p| number(p.mcu_count())),
        worker_count: provisioned.and_then(|p| number(p.worker_count())),
        auth_type: auth.map(|a| a.as_str().to_string()),
        encryption_type: encryption.map(|e| e.as_str().to_string()),
        bootstrap_servers: apache.and_then(|a| text(a.bootstrap_servers())),
        security_groups: vpc.map(|v| v.security_groups().to_vec()).unwrap_or_default(),
        subnets: vpc.map(|v| v.subnets().to_vec()).unwrap_or_default(),
        kafka_connect_version: text(output.kafka_connect_version()),
        connector_configuration: output
            .connector_configuration()
            .cloned()
            .unwrap_or_default(),
        log_delivery: log_delivery(output),
        execution_role_arn: text(output.service_execution_role_arn()),
        plugin_arns: output
            .plugins()
            .iter()
            .filter_map(|p| p.custom_plugin().and_then(|c| text(c.custom_plugin_arn())))
            .collect(),
    }
}

fn sdk_log_delivery(log_delivery: &LogDelivery) -> Option<types::LogDelivery> {
    if log_delivery.is_empty() {
        return None;
    }
    let cloud_watch_logs = log_delivery.cloudwatch_log_group.as_ref().map(|group| {
        types::CloudWatchLogsLogDelivery::builder()
            .enabled(true)
            .log_group(group)
            .build()
    });
    let firehose = log_delivery.firehose_delivery_stream.as_ref().map(|stream| {
        types::FirehoseLogDelivery::builder()
            .enabled(true)
            .delivery_stream(stream)
            .build()
    });
    let s3 = log_delivery.s3.as_ref().map(|s3| {
        types::S3LogDelivery::builder()
            .enabled(true)
            .bucket(&s3.bucket)
            .prefix(&s3.prefix)
            .build()
    });

    let worker = types::WorkerLogDelivery::builder()
        .set_cloud_watch_logs(cloud_watch_logs)
        .set_firehose(firehose)
        .set_s3(s3)
        .build();
    Some(
        types::LogDelivery::builder()
            .worker_log_delivery(worker)
            .build(),
    )
}

#[async_trait]
impl KafkaConnectApi for Client {
    async fn describe_connector(
        &self,
        connector_arn: &str,
    ) -> Result<Option<ConnectorDescription>, ApiError> {
        match Client::describe_connector(self)
            .connector_arn(connector_arn)
            .send()
            .await
        {
            Ok(output) => Ok(Some(connector_description(connector_arn, &output))),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found_exception()) => {
                Ok(None)
            }
            Err(e) => Err(sdk_error("DescribeConnector", e)),
        }
    }

    async fn custom_plugins_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<CustomPluginSummary>, ApiError> {
        let output = Client::list_custom_plugins(self)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("ListCustomPlugins", e))?;

        let records = output
            .custom_plugins()
            .iter()
            .filter_map(|plugin| {
                Some(CustomPluginSummary {
                    arn: text(plugin.custom_plugin_arn())?,
                    name: text(plugin.name()),
                    latest_revision: plugin
                        .latest_revision()
                        .and_then(|r| number(r.revision())),
                })
            })
            .collect();

        Ok(Page {
            records,
            next_page_token: text(output.next_token()),
        })
    }

    async fn create_connector(&self, spec: &ConnectorSpec) -> Result<String, ApiError> {
        const OPERATION: &str = "CreateConnector";

        let capacity = types::Capacity::builder()
            .provisioned_capacity(
                types::ProvisionedCapacity::builder()
                    .mcu_count(spec.mcu_count)
                    .worker_count(spec.worker_count)
                    .build(),
            )
            .build();
        let vpc = types::Vpc::builder()
            .set_security_groups(Some(spec.security_groups.clone()))
            .set_subnets(Some(spec.subnets.clone()))
            .build()
            .map_err(invalid(OPERATION))?;
        let cluster = types::KafkaCluster::builder()
            .apache_kafka_cluster(
                types::ApacheKafkaCluster::builder()
                    .bootstrap_servers(&spec.bootstrap_servers)
                    .vpc(vpc)
                    .build()
                    .map_err(invalid(OPERATION))?,
            )
            .build();
        let authentication = types::KafkaClusterClientAuthentication::builder()
            .authentication_type(types::KafkaClusterClientAuthenticationType::from(
                spec.auth_type.as_str(),
            ))
            .build()
            .map_err(invalid(OPERATION))?;
        let encryption = types::KafkaClusterEncryptionInTransit::builder()
            .encryption_type(types::KafkaClusterEncryptionInTransitType::from(
                spec.encryption_type.as_str(),
            ))
            .build()
            .map_err(invalid(OPERATION))?;
        let plugins = spec
            .plugins
            .iter()
            .map(|plugin| {
                types::CustomPlugin::builder()
                    .custom_plugin_arn(&plugin.arn)
                    .revision(plugin.revision)
                    .build()
                    .map(|custom| types::Plugin::builder().custom_plugin(custom).build())
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid(OPERATION))?;
        let log_delivery = sdk_log_delivery(&spec.log_delivery);

        let output = Client::create_connector(self)
            .connector_name(&spec.connector_name)
            .connector_description(&spec.connector_description)
            .set_connector_configuration(Some(spec.connector_configuration.clone()))
            .capacity(capacity)
            .kafka_cluster(cluster)
            .kafka_cluster_client_authentication(authentication)
            .kafka_cluster_encryption_in_transit(encryption)
            .kafka_connect_version(&spec.kafka_connect_version)
            .service_execution_role_arn(&spec.execution_role_arn)
            .set_plugins(Some(plugins))
            .set_log_delivery(log_delivery)
            .send()
            .await
            .map_err(|e| sdk_error(OPERATION, e))?;

        text(output.connector_arn()).ok_or_else(|| ApiError::missing(OPERATION, "ConnectorArn"))
    }

    async fn update_connector_capacity(
        &self,
        connector_arn: &str,
        current_version: &str,
        mcu_count: i32,
        worker_count: i32,
    ) -> Result<(), ApiError> {
        const OPERATION: &str = "UpdateConnector";

        let provisioned = types::ProvisionedCapacityUpdate::builder()
            .mcu_count(mcu_count)
            .worker_count(worker_count)
            .build();
        Client::update_connector(self)
            .connector_arn(connector_arn)
            .current_version(current_version)
            .capacity(
                types::CapacityUpdate::builder()
                    .provisioned_capacity(provisioned)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error(OPERATION, e))?;
        Ok(())
    }

    async fn delete_connector(
        &self,
        connector_arn: &str,
        current_version: Option<&str>,
    ) -> Result<(), ApiError> {
        Client::delete_connector(self)
            .connector_arn(connector_arn)
            .set_current_version(current_version.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("DeleteConnector", e))?;
        Ok(())
    }
}
