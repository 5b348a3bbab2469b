//! Resource type definitions
//!
//! Each resource type carries the attribute schema used to validate a
//! declaration before any API call is made.

use msk_core::provider::ResourceType;
use msk_core::resource::Value;
use msk_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

pub const CLOUDFORMATION_STACK: &str = "cloudformation_stack";
pub const MSK_CONNECTOR: &str = "msk_connector";

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:ident) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(CloudFormationStackType, CLOUDFORMATION_STACK, stack_schema);
define_resource_type!(MskConnectorType, MSK_CONNECTOR, connector_schema);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(CloudFormationStackType), Box::new(MskConnectorType)]
}

/// Schema for a resource type name
pub fn schema_for(resource_type: &str) -> Option<ResourceSchema> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.schema())
}

fn enum_of(values: &[&str]) -> AttributeType {
    AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
}

fn stack_schema() -> ResourceSchema {
    ResourceSchema::new(CLOUDFORMATION_STACK)
        .with_description("A CloudFormation stack created from an inline template")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("template_body", AttributeType::String).required())
        .attribute(AttributeSchema::new("parameters", AttributeType::StringMap))
        .attribute(
            AttributeSchema::new("capabilities", AttributeType::StringList).with_description(
                "CAPABILITY_IAM, CAPABILITY_NAMED_IAM or CAPABILITY_AUTO_EXPAND",
            ),
        )
        .attribute(
            AttributeSchema::new("on_failure", enum_of(&["DO_NOTHING", "ROLLBACK", "DELETE"]))
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("timeout_in_minutes", AttributeType::PositiveInt).force_new(),
        )
        .attribute(AttributeSchema::new("stack_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("outputs", AttributeType::StringMap).computed())
}

fn connector_schema() -> ResourceSchema {
    ResourceSchema::new(MSK_CONNECTOR)
        .with_description("An MSK Connect connector running custom plugins")
        .attribute(
            AttributeSchema::new("connector_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("connector_description", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("connector_configuration", AttributeType::StringMap).force_new(),
        )
        .attribute(AttributeSchema::new("mcu_count", AttributeType::PositiveInt).required())
        .attribute(AttributeSchema::new("workers_count", AttributeType::PositiveInt).required())
        .attribute(
            AttributeSchema::new("auth_type", enum_of(&["NONE", "IAM"]))
                .force_new()
                .with_default(Value::String("IAM".to_string())),
        )
        .attribute(
            AttributeSchema::new("encryption_type", enum_of(&["PLAINTEXT", "TLS"]))
                .force_new()
                .with_default(Value::String("TLS".to_string())),
        )
        .attribute(
            AttributeSchema::new("bootstrap_servers", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("security_groups", AttributeType::StringList)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("subnets", AttributeType::StringList)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("kafka_connect_version", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("cw_log_group", AttributeType::String).force_new())
        .attribute(
            AttributeSchema::new("firehose_log_delivery_stream", AttributeType::String)
                .force_new(),
        )
        .attribute(AttributeSchema::new("s3_log_bucket", AttributeType::String).force_new())
        .attribute(AttributeSchema::new("s3_log_prefix", AttributeType::String).force_new())
        .attribute(
            AttributeSchema::new("execution_role_arn", AttributeType::Arn)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("plugins_arns", AttributeType::StringList).force_new())
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("state", AttributeType::String).computed())
        .attribute(AttributeSchema::new("current_version", AttributeType::String).computed())
}
