//! Utility functions for value normalization and conversion

use std::collections::HashMap;

use msk_core::resource::Value;

/// Normalize region value (e.g., "aws.Region.ap_northeast_1" -> "ap-northeast-1")
pub fn normalize_region(s: &str) -> String {
    let region_part = if s.contains('.') {
        s.split('.').next_back().unwrap_or(s)
    } else {
        s
    };
    region_part.trim().replace('_', "-")
}

/// Convert a string list to a list Value
pub fn string_list(items: &[String]) -> Value {
    Value::List(items.iter().cloned().map(Value::String).collect())
}

/// Convert a string map to a map Value
pub fn string_map(entries: &HashMap<String, String>) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

// SDK getters for members the service models as required return the value
// itself, optional ones return an `Option`. These accept either.

pub(crate) fn text<'a>(value: impl Into<Option<&'a str>>) -> Option<String> {
    value.into().map(str::to_string)
}

pub(crate) fn number<T>(value: impl Into<Option<T>>) -> Option<T> {
    value.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("ap_northeast_1"), "ap-northeast-1");
        assert_eq!(normalize_region("aws.Region.us_east_1"), "us-east-1");
        assert_eq!(normalize_region("eu-west-1"), "eu-west-1");
    }

    #[test]
    fn field_helpers_accept_required_and_optional() {
        assert_eq!(text("a"), Some("a".to_string()));
        assert_eq!(text(None::<&str>), None);
        assert_eq!(number(3_i64), Some(3));
        assert_eq!(number(Some(4_i32)), Some(4));
    }
}
