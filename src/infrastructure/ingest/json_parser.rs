use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::REQUIRED_FIELDS;
use crate::domain::endpoint::{EndpointDescription, HttpMethod};
use crate::domain::error::{AppError, Result};

/// Accepts a single endpoint object or an array of them. Any invalid entry
/// rejects the whole document.
pub fn parse_json_endpoints(content: &str, user_id: &str) -> Result<Vec<EndpointDescription>> {
    let data: Value = serde_json::from_str(content)
        .map_err(|e| AppError::ParseError(format!("Invalid JSON format: {}", e)))?;

    let items = match data {
        Value::Object(map) => vec![Value::Object(map)],
        Value::Array(items) => items,
        _ => {
            return Err(AppError::ParseError(
                "JSON content must be an object or an array of API details".to_string(),
            ))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item, user_id))
        .collect()
}

fn parse_item(index: usize, item: &Value, user_id: &str) -> Result<EndpointDescription> {
    let object = item.as_object().ok_or_else(|| {
        AppError::ParseError(format!("Entry {} is not a JSON object", index))
    })?;

    let required = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Entry {}: missing or empty required fields. Required: {}",
                    index,
                    REQUIRED_FIELDS.join(", ")
                ))
            })
    };

    let name = required(REQUIRED_FIELDS[0])?;
    let url = required(REQUIRED_FIELDS[1])?;
    let http_method: HttpMethod = required(REQUIRED_FIELDS[2])?.parse()?;

    let mut endpoint = EndpointDescription::new(name, url, http_method, user_id);
    endpoint.headers = optional_object(object, "headers", index)?
        .map(|headers| {
            headers
                .into_iter()
                .map(|(key, value)| match value {
                    Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect::<BTreeMap<_, _>>()
        });
    endpoint.parameters =
        optional_object(object, "parameters", index)?.map(|params| params.into_iter().collect());
    endpoint.payload = optional_object(object, "payload", index)?;

    endpoint
        .validated()
        .map_err(|e| AppError::ValidationError(format!("Entry {}: {}", index, e)))
}

fn optional_object(object: &Map<String, Value>, key: &str, index: usize) -> Result<Option<Map<String, Value>>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(AppError::ParseError(format!(
            "Entry {}: {} must be a JSON object",
            index, key
        ))),
    }
}
