//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "msk_connector", "cloudformation_stack")
    pub resource_type: String,
    /// Resource name (the declared block name)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// List of strings; non-string items are skipped
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            Value::List(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Map of strings; non-string values are skipped
    pub fn as_string_map(&self) -> Option<HashMap<String, String>> {
        match self {
            Value::Map(map) => Some(
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }
}

/// Desired state declared for a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_int)
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// AWS identifier (stack ID, connector ARN)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_list_skips_non_strings() {
        let v = Value::List(vec![
            Value::String("sg-1".to_string()),
            Value::Int(3),
            Value::String("sg-2".to_string()),
        ]);
        assert_eq!(
            v.as_string_list(),
            Some(vec!["sg-1".to_string(), "sg-2".to_string()])
        );
        assert_eq!(Value::Int(1).as_string_list(), None);
    }

    #[test]
    fn resource_accessors() {
        let r = Resource::new("msk_connector", "sink")
            .with_attribute("connector_name", Value::String("sink".to_string()))
            .with_attribute("mcu_count", Value::Int(2));
        assert_eq!(r.get_string("connector_name"), Some("sink"));
        assert_eq!(r.get_int("mcu_count"), Some(2));
        assert_eq!(r.get_int("connector_name"), None);
        assert_eq!(r.id.to_string(), "msk_connector.sink");
    }

    #[test]
    fn state_with_identifier() {
        let state = State::existing(ResourceId::new("a", "b"), HashMap::new())
            .with_identifier("arn:aws:kafkaconnect:x");
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("arn:aws:kafkaconnect:x"));
        assert!(!State::not_found(ResourceId::new("a", "b")).exists);
    }
}
