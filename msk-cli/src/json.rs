//! Conversion between JSON resource files and resource values

use std::collections::HashMap;

use msk_core::resource::{Resource, State, Value};

/// Parse a resource file: `{ "type": ..., "name": ..., "attributes": {...} }`
pub fn parse_resource(content: &str) -> Result<Resource, String> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {}", e))?;

    let field = |name: &str| {
        json.get(name)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| format!("Resource file must have a string '{}' field", name))
    };
    let mut resource = Resource::new(field("type")?, field("name")?);

    match json.get("attributes") {
        None => {}
        Some(serde_json::Value::Object(map)) => {
            for (key, value) in map {
                let value = json_to_value(value).map_err(|e| format!("{}: {}", key, e))?;
                resource.attributes.insert(key.clone(), value);
            }
        }
        Some(_) => return Err("'attributes' must be an object".to_string()),
    }
    Ok(resource)
}

pub fn json_to_value(json: &serde_json::Value) -> Result<Value, String> {
    Ok(match json {
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Number(n) => Value::Int(
            n.as_i64()
                .ok_or_else(|| format!("{} is not an integer", n))?,
        ),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), json_to_value(v)?)))
                .collect::<Result<HashMap<_, _>, String>>()?,
        ),
        serde_json::Value::Null => return Err("null is not a valid value".to_string()),
    })
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

pub fn state_to_json(state: &State) -> serde_json::Value {
    let attributes: serde_json::Map<_, _> = state
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();
    serde_json::json!({
        "type": state.id.resource_type,
        "name": state.id.name,
        "identifier": state.identifier,
        "exists": state.exists,
        "attributes": attributes,
    })
}
