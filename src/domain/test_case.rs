use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Status recorded when a request could not be completed.
pub const EXECUTION_FAILURE_STATUS: u16 = 500;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Positive,
    Negative,
    Boundary,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Positive => "positive",
            TestType::Negative => "negative",
            TestType::Boundary => "boundary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "positive" => Some(TestType::Positive),
            "negative" => Some(TestType::Negative),
            "boundary" => Some(TestType::Boundary),
            _ => None,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the parser does with generated elements that fail validation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// One invalid element discards the whole batch.
    #[default]
    Strict,
    /// Invalid elements are dropped; the batch fails only if none survive.
    Salvage,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestCase {
    pub description: String,
    pub payload: Map<String, Value>,
    pub expected_status: u16,
    pub test_type: TestType,
}

/// Why a request produced no usable response.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connect,
    InvalidRequest,
    InvalidBody,
    Task,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExecutionResult {
    pub test_case: TestCase,
    pub status_code: u16,
    pub response_data: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn completed(
        test_case: TestCase,
        status_code: u16,
        response_data: Option<Value>,
        headers: BTreeMap<String, String>,
        duration_ms: u64,
    ) -> Self {
        let success = status_code == test_case.expected_status;
        Self {
            test_case,
            status_code,
            response_data,
            headers,
            success,
            failure: None,
            duration_ms,
        }
    }

    pub fn failed(test_case: TestCase, kind: FailureKind, message: &str, duration_ms: u64) -> Self {
        Self {
            test_case,
            status_code: EXECUTION_FAILURE_STATUS,
            response_data: Some(serde_json::json!({ "error": message })),
            headers: BTreeMap::new(),
            success: false,
            failure: Some(kind),
            duration_ms,
        }
    }
}
