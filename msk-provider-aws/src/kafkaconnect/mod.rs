//! MSK Connect support
//!
//! ## Module Structure
//!
//! - `api` - The API surface and the models it returns
//! - `sdk` - `KafkaConnectApi` for the AWS SDK client
//! - `waiter` - Connector refresher and waits
//! - `connector` - The `msk_connector` resource

pub mod api;
mod connector;
mod sdk;
pub mod waiter;

pub use api::{
    ConnectorDescription, ConnectorSpec, CustomPluginSummary, KafkaConnectApi, LogDelivery,
    PluginRef, S3LogDelivery,
};
pub use waiter::{ConnectorRefresher, connector_created, connector_deleted, connector_updated};
