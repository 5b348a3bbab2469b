//! Schema - Attribute schemas for resource declarations
//!
//! A declaration is validated against its resource type's schema before any
//! API call is made, and the schema decides which attribute changes can be
//! applied in place.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    /// Integer greater than zero (capacities, timeouts)
    PositiveInt,
    /// `arn:partition:service:region:account:resource`
    Arn,
    /// One of a fixed set of strings
    Enum(Vec<String>),
    StringList,
    StringMap,
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::PositiveInt, Value::Int(n)) if *n > 0 => Ok(()),
            (AttributeType::PositiveInt, Value::Int(n)) => Err(TypeError::NotPositive(*n)),
            (AttributeType::Arn, Value::String(s)) => {
                validate_arn(s).map_err(TypeError::InvalidArn)
            }
            (AttributeType::Enum(variants), Value::String(s)) if variants.contains(s) => Ok(()),
            (AttributeType::Enum(variants), Value::String(s)) => {
                Err(TypeError::InvalidEnumVariant {
                    value: s.clone(),
                    expected: variants.clone(),
                })
            }
            (AttributeType::StringList, Value::List(items)) => {
                match items.iter().position(|item| item.as_str().is_none()) {
                    Some(index) => Err(TypeError::NonStringItem { index }),
                    None => Ok(()),
                }
            }
            (AttributeType::StringMap, Value::Map(map)) => {
                let mut keys: Vec<&String> = map
                    .iter()
                    .filter(|(_, v)| v.as_str().is_none())
                    .map(|(k, _)| k)
                    .collect();
                keys.sort();
                match keys.first() {
                    Some(key) => Err(TypeError::NonStringValue {
                        key: key.to_string(),
                    }),
                    None => Ok(()),
                }
            }
            _ => Err(TypeError::TypeMismatch {
                expected: self.to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => f.write_str("String"),
            AttributeType::PositiveInt => f.write_str("PositiveInt"),
            AttributeType::Arn => f.write_str("Arn"),
            AttributeType::Enum(variants) => write!(f, "Enum({})", variants.join(" | ")),
            AttributeType::StringList => f.write_str("List<String>"),
            AttributeType::StringMap => f.write_str("Map<String>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Value must be positive, got {0}")]
    NotPositive(i64),

    #[error("{0}")]
    InvalidArn(String),

    #[error("List item at index {index} is not a string")]
    NonStringItem { index: usize },

    #[error("Map value for key '{key}' is not a string")]
    NonStringValue { key: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Set by the provider only
    pub computed: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            force_new: false,
            computed: false,
            default: None,
            description: None,
        }
    }

    pub fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub fn force_new(self) -> Self {
        Self {
            force_new: true,
            ..self
        }
    }

    pub fn computed(self) -> Self {
        Self {
            computed: true,
            ..self
        }
    }

    pub fn with_default(self, value: Value) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate declared attributes; errors are sorted by message
    ///
    /// Attributes the schema does not know are passed through untouched.
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let missing = self
            .attributes
            .values()
            .filter(|s| s.required && s.default.is_none() && !attributes.contains_key(&s.name))
            .map(|s| TypeError::MissingRequired {
                name: s.name.clone(),
            });

        let invalid = attributes.iter().filter_map(|(name, value)| {
            let schema = self.attributes.get(name)?;
            if schema.computed {
                return Some(TypeError::ComputedAttribute { name: name.clone() });
            }
            schema
                .attr_type
                .validate(value)
                .err()
                .map(|e| TypeError::AttributeError {
                    name: name.clone(),
                    inner: Box::new(e),
                })
        });

        let mut errors: Vec<TypeError> = missing.chain(invalid).collect();
        if errors.is_empty() {
            return Ok(());
        }
        errors.sort_by_key(|e| e.to_string());
        Err(errors)
    }

    /// Return declared attributes with schema defaults filled in
    pub fn with_defaults(&self, attributes: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut merged = attributes.clone();
        for schema in self.attributes.values() {
            if let Some(default) = &schema.default {
                merged
                    .entry(schema.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        merged
    }

    /// Names of force-new attributes whose value differs between two attribute sets
    pub fn force_new_changes(
        &self,
        from: &HashMap<String, Value>,
        to: &HashMap<String, Value>,
    ) -> Vec<String> {
        let mut changed: Vec<String> = self
            .attributes
            .values()
            .filter(|schema| schema.force_new && from.get(&schema.name) != to.get(&schema.name))
            .map(|schema| schema.name.clone())
            .collect();
        changed.sort();
        changed
    }
}

/// Validate ARN format: `arn:partition:service:region:account:resource`
pub fn validate_arn(arn: &str) -> Result<(), String> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    let [prefix, partition, service, _region, _account, resource] = parts.as_slice() else {
        return Err(format!(
            "Invalid ARN '{}': expected arn:partition:service:region:account:resource",
            arn
        ));
    };
    if *prefix != "arn" {
        return Err(format!("Invalid ARN '{}': must start with 'arn:'", arn));
    }
    if partition.is_empty() || service.is_empty() || resource.is_empty() {
        return Err(format!(
            "Invalid ARN '{}': partition, service and resource must be set",
            arn
        ));
    }
    Ok(())
}
