use crate::domain::error::{AppError, Result};
use crate::domain::test_case::{TestCase, TestType, ValidationPolicy};
use crate::infrastructure::response::{clean_llm_response, strip_code_fences};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use tracing::warn;

const STATUS_RANGE: RangeInclusive<u64> = 100..=599;

/// Turns raw model text into validated test cases, keeping the model's order.
pub struct ResponseParser {
    policy: ValidationPolicy,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(ValidationPolicy::Strict)
    }
}

impl ResponseParser {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn parse(&self, raw: &str) -> Result<Vec<TestCase>> {
        let normalized = normalize(raw);

        let value: Value = serde_json::from_str(&normalized).map_err(|e| {
            AppError::MalformedGenerationOutput {
                reason: e.to_string(),
                raw: raw.to_string(),
            }
        })?;

        let elements = match value {
            Value::Array(elements) => elements,
            other => {
                return Err(AppError::MalformedGenerationOutput {
                    reason: format!("expected a JSON array, found {}", json_kind(&other)),
                    raw: raw.to_string(),
                })
            }
        };

        match self.policy {
            ValidationPolicy::Strict => elements
                .iter()
                .enumerate()
                .map(|(index, element)| validate_element(index, element))
                .collect(),
            ValidationPolicy::Salvage => salvage(&elements),
        }
    }
}

/// Strips reasoning tags and markdown fences around the JSON payload.
pub(crate) fn normalize(raw: &str) -> String {
    strip_code_fences(&clean_llm_response(raw))
}

fn salvage(elements: &[Value]) -> Result<Vec<TestCase>> {
    let mut cases = Vec::with_capacity(elements.len());
    let mut first_error = None;

    for (index, element) in elements.iter().enumerate() {
        match validate_element(index, element) {
            Ok(case) => cases.push(case),
            Err(err) => {
                warn!(index, error = %err, "Dropping invalid generated test case");
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) if cases.is_empty() => Err(err),
        _ => Ok(cases),
    }
}

fn validate_element(index: usize, element: &Value) -> Result<TestCase> {
    let invalid = |field: &str, reason: &str| AppError::TestCaseValidation {
        index,
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let object = element
        .as_object()
        .ok_or_else(|| invalid("element", "expected a JSON object"))?;

    let description = required(object, "description", index)?
        .as_str()
        .ok_or_else(|| invalid("description", "expected a string"))?
        .to_string();

    let payload = required(object, "payload", index)?
        .as_object()
        .cloned()
        .ok_or_else(|| invalid("payload", "expected a JSON object"))?;

    let expected_status = required(object, "expected_status", index)?
        .as_u64()
        .ok_or_else(|| invalid("expected_status", "expected an integer"))?;
    if !STATUS_RANGE.contains(&expected_status) {
        return Err(invalid(
            "expected_status",
            &format!("{} is not an HTTP status code", expected_status),
        ));
    }

    let tag = required(object, "test_type", index)?
        .as_str()
        .ok_or_else(|| invalid("test_type", "expected a string"))?;
    let test_type = TestType::parse(tag).ok_or_else(|| {
        invalid(
            "test_type",
            &format!("'{}' is not one of positive, negative, boundary", tag),
        )
    })?;

    Ok(TestCase {
        description,
        payload,
        expected_status: expected_status as u16,
        test_type,
    })
}

fn required<'a>(object: &'a Map<String, Value>, field: &str, index: usize) -> Result<&'a Value> {
    object.get(field).ok_or_else(|| AppError::TestCaseValidation {
        index,
        field: field.to_string(),
        reason: "missing".to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
