//! The `msk_connector` resource

use std::collections::{BTreeSet, HashMap};
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use msk_core::provider::{ProviderError, ProviderResult};
use msk_core::resource::{Resource, ResourceId, State, Value};
use msk_core::waiter::{Page, Pager, for_each_event};

use super::api::{
    ConnectorDescription, ConnectorSpec, CustomPluginSummary, KafkaConnectApi, LogDelivery,
    PluginRef, S3LogDelivery,
};
use super::waiter::{connector_created, connector_deleted, connector_updated};
use crate::error::ApiError;
use crate::policy::OperationKind;
use crate::provider::{MskProvider, required_string, with_declared};
use crate::utils::{string_list, string_map};

/// Every custom plugin in the account and region
struct CustomPlugins {
    api: Arc<dyn KafkaConnectApi>,
}

#[async_trait]
impl Pager for CustomPlugins {
    type Record = CustomPluginSummary;
    type Error = ApiError;

    async fn fetch_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<CustomPluginSummary>, ApiError> {
        self.api.custom_plugins_page(page_token).await
    }
}

fn connector_attributes(connector: &ConnectorDescription) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    let mut set_string = |name: &str, value: &Option<String>| {
        if let Some(value) = value {
            attributes.insert(name.to_string(), Value::String(value.clone()));
        }
    };
    set_string("connector_name", &connector.connector_name);
    set_string("connector_description", &connector.connector_description);
    set_string("auth_type", &connector.auth_type);
    set_string("encryption_type", &connector.encryption_type);
    set_string("bootstrap_servers", &connector.bootstrap_servers);
    set_string("kafka_connect_version", &connector.kafka_connect_version);
    set_string("execution_role_arn", &connector.execution_role_arn);
    set_string("current_version", &connector.current_version);
    set_string("cw_log_group", &connector.log_delivery.cloudwatch_log_group);
    set_string(
        "firehose_log_delivery_stream",
        &connector.log_delivery.firehose_delivery_stream,
    );
    if let Some(s3) = &connector.log_delivery.s3 {
        set_string("s3_log_bucket", &Some(s3.bucket.clone()));
        set_string("s3_log_prefix", &Some(s3.prefix.clone()));
    }

    attributes.insert(
        "arn".to_string(),
        Value::String(connector.connector_arn.clone()),
    );
    attributes.insert(
        "state".to_string(),
        Value::String(connector.state.to_string()),
    );
    if let Some(mcu_count) = connector.mcu_count {
        attributes.insert("mcu_count".to_string(), Value::Int(i64::from(mcu_count)));
    }
    if let Some(worker_count) = connector.worker_count {
        attributes.insert(
            "workers_count".to_string(),
            Value::Int(i64::from(worker_count)),
        );
    }
    attributes.insert(
        "security_groups".to_string(),
        string_list(&connector.security_groups),
    );
    attributes.insert("subnets".to_string(), string_list(&connector.subnets));
    if !connector.plugin_arns.is_empty() {
        attributes.insert(
            "plugins_arns".to_string(),
            string_list(&connector.plugin_arns),
        );
    }
    if !connector.connector_configuration.is_empty() {
        attributes.insert(
            "connector_configuration".to_string(),
            string_map(&connector.connector_configuration),
        );
    }
    attributes
}

fn log_delivery(resource: &Resource) -> LogDelivery {
    let text = |name: &str| resource.get_string(name).map(str::to_string);
    LogDelivery {
        cloudwatch_log_group: text("cw_log_group"),
        firehose_delivery_stream: text("firehose_log_delivery_stream"),
        // S3 delivery needs both halves
        s3: match (text("s3_log_bucket"), text("s3_log_prefix")) {
            (Some(bucket), Some(prefix)) => Some(S3LogDelivery { bucket, prefix }),
            _ => None,
        },
    }
}

fn capacity(resource: &Resource) -> ProviderResult<(i32, i32)> {
    let count = |name: &str| -> ProviderResult<i32> {
        let value = resource.get_int(name).ok_or_else(|| {
            ProviderError::new(format!("Required attribute '{}' is missing", name))
                .for_resource(resource.id.clone())
        })?;
        i32::try_from(value).map_err(|_| {
            ProviderError::new(format!("Attribute '{}' is out of range: {}", name, value))
                .for_resource(resource.id.clone())
        })
    };
    Ok((count("mcu_count")?, count("workers_count")?))
}

fn string_list_attribute(resource: &Resource, name: &str) -> Vec<String> {
    resource
        .attributes
        .get(name)
        .and_then(Value::as_string_list)
        .unwrap_or_default()
}

impl MskProvider {
    /// Pin each requested plugin ARN to its latest revision
    async fn resolve_plugins(
        &self,
        id: &ResourceId,
        plugin_arns: &[String],
    ) -> ProviderResult<Vec<PluginRef>> {
        if plugin_arns.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: BTreeSet<&str> = plugin_arns.iter().map(String::as_str).collect();
        let mut found: HashMap<String, Option<i64>> = HashMap::new();
        let pager = CustomPlugins {
            api: self.kafkaconnect.clone(),
        };
        for_each_event(&pager, |plugin| {
            if wanted.contains(plugin.arn.as_str()) {
                found.insert(plugin.arn.clone(), plugin.latest_revision);
            }
            if found.len() == wanted.len() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await
        .map_err(|e| {
            ProviderError::new("error listing MSK Connect custom plugins")
                .for_resource(id.clone())
                .with_cause(e)
        })?;

        let mut plugins = Vec::new();
        let mut missing = Vec::new();
        for arn in wanted {
            match found.get(arn) {
                Some(Some(revision)) => plugins.push(PluginRef {
                    arn: arn.to_string(),
                    revision: *revision,
                }),
                _ => missing.push(arn),
            }
        }
        if !missing.is_empty() {
            return Err(ProviderError::new(format!(
                "custom plugin(s) not found or without a revision: {}",
                missing.join(", ")
            ))
            .for_resource(id.clone()));
        }
        Ok(plugins)
    }

    async fn describe_connector(
        &self,
        id: &ResourceId,
        connector_arn: &str,
    ) -> ProviderResult<Option<ConnectorDescription>> {
        self.kafkaconnect
            .describe_connector(connector_arn)
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "error reading MSK Connect Connector ({})",
                    connector_arn
                ))
                .for_resource(id.clone())
                .with_cause(e)
            })
    }

    pub(crate) async fn read_connector(
        &self,
        id: &ResourceId,
        connector_arn: &str,
    ) -> ProviderResult<State> {
        match self.describe_connector(id, connector_arn).await? {
            Some(connector) => Ok(State::existing(id.clone(), connector_attributes(&connector))
                .with_identifier(connector.connector_arn)),
            None => {
                log::warn!(
                    "MSK Connect Connector ({}) not found, removing from state",
                    connector_arn
                );
                Ok(State::not_found(id.clone()))
            }
        }
    }

    pub(crate) async fn create_connector(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let (mcu_count, worker_count) = capacity(resource)?;
        let plugins = self
            .resolve_plugins(id, &string_list_attribute(resource, "plugins_arns"))
            .await?;

        let spec = ConnectorSpec {
            connector_name: required_string(resource, "connector_name")?,
            connector_description: required_string(resource, "connector_description")?,
            connector_configuration: resource
                .attributes
                .get("connector_configuration")
                .and_then(Value::as_string_map)
                .unwrap_or_default(),
            mcu_count,
            worker_count,
            auth_type: required_string(resource, "auth_type")?,
            encryption_type: required_string(resource, "encryption_type")?,
            bootstrap_servers: required_string(resource, "bootstrap_servers")?,
            security_groups: string_list_attribute(resource, "security_groups"),
            subnets: string_list_attribute(resource, "subnets"),
            kafka_connect_version: required_string(resource, "kafka_connect_version")?,
            execution_role_arn: required_string(resource, "execution_role_arn")?,
            plugins,
            log_delivery: log_delivery(resource),
        };

        let connector_arn = self.kafkaconnect.create_connector(&spec).await.map_err(|e| {
            ProviderError::new("error creating MSK Connect Connector")
                .for_resource(id.clone())
                .with_cause(e)
        })?;
        log::info!("Created MSK Connect Connector ({})", connector_arn);

        connector_created(
            &self.waiter,
            &self.kafkaconnect,
            &connector_arn,
            self.timeout(OperationKind::ConnectorCreate),
        )
        .await
        .map_err(|f| {
            ProviderError::from_wait(
                id,
                &format!("MSK Connect Connector ({}) creation", connector_arn),
                f,
            )
            .with_identifier(&connector_arn)
        })?;

        let state = self.read_connector(id, &connector_arn).await?;
        Ok(with_declared(state, resource))
    }

    /// Only capacity can change in place
    pub(crate) async fn update_connector(
        &self,
        id: &ResourceId,
        connector_arn: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        let (mcu_count, worker_count) = capacity(to)?;
        let current = self
            .describe_connector(id, connector_arn)
            .await?
            .ok_or_else(|| {
                ProviderError::new(format!(
                    "MSK Connect Connector ({}) not found",
                    connector_arn
                ))
                .for_resource(id.clone())
            })?;

        if current.mcu_count == Some(mcu_count) && current.worker_count == Some(worker_count) {
            log::info!(
                "MSK Connect Connector ({}) capacity unchanged",
                connector_arn
            );
            return Ok(with_declared(
                State::existing(id.clone(), connector_attributes(&current))
                    .with_identifier(connector_arn),
                to,
            ));
        }

        let current_version = current.current_version.as_deref().ok_or_else(|| {
            ProviderError::new(format!(
                "MSK Connect Connector ({}) has no current version",
                connector_arn
            ))
            .for_resource(id.clone())
        })?;
        self.kafkaconnect
            .update_connector_capacity(connector_arn, current_version, mcu_count, worker_count)
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "error updating MSK Connect Connector ({})",
                    connector_arn
                ))
                .for_resource(id.clone())
                .with_cause(e)
            })?;

        connector_updated(
            &self.waiter,
            &self.kafkaconnect,
            connector_arn,
            self.timeout(OperationKind::ConnectorUpdate),
        )
        .await
        .map_err(|f| {
            ProviderError::from_wait(
                id,
                &format!("MSK Connect Connector ({}) update", connector_arn),
                f,
            )
        })?;

        let state = self.read_connector(id, connector_arn).await?;
        Ok(with_declared(state, to))
    }

    pub(crate) async fn delete_connector(
        &self,
        id: &ResourceId,
        connector_arn: &str,
    ) -> ProviderResult<()> {
        let Some(current) = self.describe_connector(id, connector_arn).await? else {
            log::info!("MSK Connect Connector ({}) already deleted", connector_arn);
            return Ok(());
        };

        self.kafkaconnect
            .delete_connector(connector_arn, current.current_version.as_deref())
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "error deleting MSK Connect Connector ({})",
                    connector_arn
                ))
                .for_resource(id.clone())
                .with_cause(e)
            })?;

        connector_deleted(
            &self.waiter,
            &self.kafkaconnect,
            connector_arn,
            self.timeout(OperationKind::ConnectorDelete),
        )
        .await
        .map_err(|f| {
            ProviderError::from_wait(
                id,
                &format!("MSK Connect Connector ({}) deletion", connector_arn),
                f,
            )
        })
    }
}
