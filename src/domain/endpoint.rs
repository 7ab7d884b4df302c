use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::domain::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(AppError::ValidationError(format!(
                "Invalid HTTP method: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Definition of an API under test, as supplied by its owner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct EndpointDescription {
    #[validate(length(min = 1, max = 256))]
    pub api_name: String,
    #[validate(url)]
    pub api_url: String,
    pub http_method: HttpMethod,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[validate(length(min = 1))]
    pub user_id: String,
}

impl EndpointDescription {
    pub fn new(api_name: &str, api_url: &str, http_method: HttpMethod, user_id: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            api_url: api_url.to_string(),
            http_method,
            headers: None,
            parameters: None,
            payload: None,
            user_id: user_id.to_string(),
        }
    }

    /// Query parameters rendered as strings; JSON strings are used unquoted.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .flatten()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    pub fn validated(self) -> crate::domain::error::Result<Self> {
        self.validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid endpoint: {}", e)))?;
        Ok(self)
    }
}

/// A stored endpoint description.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EndpointRecord {
    pub id: String,
    #[serde(flatten)]
    pub endpoint: EndpointDescription,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointFilter {
    pub user_id: Option<String>,
}

impl EndpointFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(" patch ".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_method_serializes_upper_case() {
        let value = serde_json::to_value(HttpMethod::Delete).unwrap();
        assert_eq!(value, json!("DELETE"));
        let parsed: HttpMethod = serde_json::from_value(json!("post")).unwrap();
        assert_eq!(parsed, HttpMethod::Post);
    }

    #[test]
    fn test_query_pairs_render_scalars() {
        let mut endpoint = EndpointDescription::new(
            "Users",
            "https://api.example.com/users",
            HttpMethod::Get,
            "user-1",
        );
        let mut params = BTreeMap::new();
        params.insert("page".to_string(), json!(2));
        params.insert("q".to_string(), json!("jane"));
        endpoint.parameters = Some(params);

        assert_eq!(
            endpoint.query_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "jane".to_string())
            ]
        );
    }

    #[test]
    fn test_validation_rejects_bad_url_and_empty_name() {
        let endpoint = EndpointDescription::new("", "not a url", HttpMethod::Get, "user-1");
        let err = endpoint.validated().unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_record_flattens_endpoint_fields() {
        let record = EndpointRecord {
            id: "abc".to_string(),
            endpoint: EndpointDescription::new(
                "Users",
                "https://api.example.com/users",
                HttpMethod::Get,
                "user-1",
            ),
            created_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["api_name"], json!("Users"));
        assert_eq!(value["http_method"], json!("GET"));
        assert_eq!(value["id"], json!("abc"));
    }
}
