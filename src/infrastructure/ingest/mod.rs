// ============================================================
// BULK ENDPOINT INGESTION
// ============================================================
// Turns uploaded CSV / JSON files into endpoint descriptions

mod csv_parser;
mod json_parser;

pub use csv_parser::EndpointCsvParser;
pub use json_parser::parse_json_endpoints;

use crate::domain::endpoint::EndpointDescription;
use crate::domain::error::{AppError, Result};

pub(crate) const REQUIRED_FIELDS: [&str; 3] = ["api_name", "api_url", "http_method"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Json,
}

impl UploadFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let lower = file_name.trim().to_lowercase();
        if lower.ends_with(".csv") {
            Ok(UploadFormat::Csv)
        } else if lower.ends_with(".json") {
            Ok(UploadFormat::Json)
        } else {
            Err(AppError::ValidationError(
                "Unsupported file format. Please upload CSV or JSON file.".to_string(),
            ))
        }
    }
}

/// Decodes upload bytes, honouring a UTF-8 or UTF-16 byte order mark.
pub fn decode_upload(bytes: &[u8]) -> Result<String> {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        return Err(AppError::ParseError(format!(
            "File is not valid {} text",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Parses an uploaded file; the extension picks the format.
pub fn parse_upload(file_name: &str, bytes: &[u8], user_id: &str) -> Result<Vec<EndpointDescription>> {
    let format = UploadFormat::from_file_name(file_name)?;
    let content = decode_upload(bytes)?;
    if content.trim().is_empty() {
        return Err(AppError::ValidationError("File is empty".to_string()));
    }

    match format {
        UploadFormat::Csv => EndpointCsvParser::new().parse_content(&content, user_id),
        UploadFormat::Json => parse_json_endpoints(&content, user_id),
    }
}
