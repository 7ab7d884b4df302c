use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_language() -> String {
    "python".to_string()
}

fn default_framework() -> String {
    "postman".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScriptRequest {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_framework")]
    pub framework: String,
}

impl Default for ScriptRequest {
    fn default() -> Self {
        Self {
            language: default_language(),
            framework: default_framework(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedScript {
    pub script: String,
}

/// Where scripts for an owner get committed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct ExportCredentials {
    #[validate(length(min = 1))]
    pub owner: String,
    /// Repository URL, e.g. `https://github.com/acme/api-tests.git`.
    #[validate(length(min = 1))]
    pub repo: String,
    #[validate(length(min = 1))]
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ScriptExport {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    pub script_content: String,
    #[validate(length(min = 1))]
    pub owner: String,
}
