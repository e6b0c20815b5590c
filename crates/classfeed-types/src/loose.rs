//! Accessors for loosely-typed server records.
//!
//! The upstream API does not commit to a single field-naming convention
//! (`_id` vs `id` vs `statusId`; list payloads arrive bare or wrapped in
//! `data`). Every logical field is read through an explicit ordered
//! candidate list, first non-empty wins, instead of ad hoc fallbacks at
//! call sites.

use serde_json::Value;

/// Value of the first candidate key that holds a non-empty string.
pub fn first_string<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|key| match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    })
}

/// Like [`first_string`], but also accepts numbers (stringified).
/// Some deployments return numeric ids and years.
pub fn first_scalar(record: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Unwrap a list payload that is either a bare array or `{"data": [...]}`.
/// Anything else yields an empty list.
pub fn list_payload(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
