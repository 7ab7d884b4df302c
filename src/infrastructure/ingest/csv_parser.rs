// ============================================================
// ENDPOINT CSV PARSER
// ============================================================
// Header row must name api_name, api_url and http_method

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::Value;

use super::REQUIRED_FIELDS;
use crate::domain::endpoint::{EndpointDescription, HttpMethod};
use crate::domain::error::{AppError, Result};

const PAYLOAD_COLUMN: &str = "payload";

#[derive(Default)]
pub struct EndpointCsvParser;

struct Columns {
    name: usize,
    url: usize,
    method: usize,
    payload: Option<usize>,
}

impl EndpointCsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Blank rows and rows missing a required value are skipped; an unknown
    /// HTTP method or an invalid row rejects the whole file.
    pub fn parse_content(&self, content: &str, user_id: &str) -> Result<Vec<EndpointDescription>> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let columns = Self::locate_columns(&headers)?;

        let mut endpoints = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let row_number = index + 2;
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", row_number, e))
            })?;

            if record.iter().all(|value| value.is_empty()) {
                continue;
            }

            let field = |column: usize| record.get(column).unwrap_or("").trim();
            let (name, url, method) = (field(columns.name), field(columns.url), field(columns.method));
            if name.is_empty() || url.is_empty() || method.is_empty() {
                continue;
            }

            let http_method: HttpMethod = method.parse()?;
            let mut endpoint = EndpointDescription::new(name, url, http_method, user_id);
            if let Some(column) = columns.payload {
                endpoint.payload = Self::parse_payload(field(column), row_number)?;
            }

            let endpoint = endpoint.validated().map_err(|e| {
                AppError::ValidationError(format!("CSV row {}: {}", row_number, e))
            })?;
            endpoints.push(endpoint);
        }

        Ok(endpoints)
    }

    fn locate_columns(headers: &StringRecord) -> Result<Columns> {
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };

        match (
            position(REQUIRED_FIELDS[0]),
            position(REQUIRED_FIELDS[1]),
            position(REQUIRED_FIELDS[2]),
        ) {
            (Some(name), Some(url), Some(method)) => Ok(Columns {
                name,
                url,
                method,
                payload: position(PAYLOAD_COLUMN),
            }),
            _ => Err(AppError::ParseError(format!(
                "CSV must contain all required fields: {}",
                REQUIRED_FIELDS.join(", ")
            ))),
        }
    }

    fn parse_payload(raw: &str, row_number: usize) -> Result<Option<serde_json::Map<String, Value>>> {
        if raw.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(AppError::ParseError(format!(
                "CSV row {}: payload must be a JSON object",
                row_number
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_rows_and_normalizes_method() {
        let csv = "api_name,api_url,http_method\nList users,https://api.example.com/users, get \n";
        let endpoints = EndpointCsvParser::new().parse_content(csv, "user-1").unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].http_method, HttpMethod::Get);
        assert_eq!(endpoints[0].user_id, "user-1");
    }

    #[test]
    fn test_skips_blank_and_incomplete_rows() {
        let csv = "api_name,api_url,http_method\n,,\nNo url,,POST\nOk,https://api.example.com/a,POST\n";
        let endpoints = EndpointCsvParser::new().parse_content(csv, "user-1").unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].api_name, "Ok");
    }

    #[test]
    fn test_missing_required_header() {
        let csv = "name,api_url,http_method\nA,https://api.example.com/a,GET\n";
        let err = EndpointCsvParser::new().parse_content(csv, "user-1").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_unknown_method_rejects_file() {
        let csv = "api_name,api_url,http_method\nA,https://api.example.com/a,FETCH\n";
        let err = EndpointCsvParser::new().parse_content(csv, "user-1").unwrap_err();
        assert_eq!(err, AppError::ValidationError("Invalid HTTP method: FETCH".to_string()));
    }

    #[test]
    fn test_optional_payload_column() {
        let csv = "api_name,api_url,http_method,payload\nSignup,https://api.example.com/signup,POST,\"{\"\"email\"\": \"\"rasel@gmail.com\"\"}\"\n";
        let endpoints = EndpointCsvParser::new().parse_content(csv, "user-1").unwrap();
        let payload = endpoints[0].payload.as_ref().unwrap();
        assert_eq!(payload["email"], "rasel@gmail.com");
    }
}
