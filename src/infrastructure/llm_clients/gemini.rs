use super::{join_url, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(rename = "topK", skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn api_key(config: &LLMConfig) -> Result<String> {
        config
            .api_key
            .clone()
            .ok_or_else(|| AppError::LLMError("Missing API key for Google provider".to_string()))
    }

    fn build_request(config: &LLMConfig, system: &str, user: &str) -> GeminiRequest {
        let system_instruction = if system.trim().is_empty() {
            None
        } else {
            Some(GeminiContent {
                parts: vec![GeminiPart {
                    text: system.to_string(),
                }],
                role: None,
            })
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: user.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: config.temperature.unwrap_or(1.0) as f64,
                top_p: config.top_p.map(|value| value as f64),
                top_k: config.top_k,
                max_output_tokens: config.max_tokens,
                response_mime_type: "text/plain",
            }),
        }
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let url = join_url(
            &config.base_url,
            &format!("{}:generateContent", config.model.trim()),
        );
        let body = Self::build_request(config, system, user);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let text: String = json
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .ok_or_else(|| AppError::LLMError("Response contained no candidates".to_string()))?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::json;

    fn config_for(base_url: String) -> LLMConfig {
        LLMConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            ..LLMConfig::default()
        }
    }

    #[test]
    fn test_request_carries_generation_config() {
        let request = GeminiClient::build_request(&LLMConfig::default(), "", "hello");
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("systemInstruction").is_none());
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[actix_web::test]
    async fn test_generate_joins_candidate_parts() {
        let server = HttpServer::new(|| {
            App::new().route(
                "/models/gemini-1.5-flash:generateContent",
                web::post().to(|| async {
                    HttpResponse::Ok().json(json!({
                        "candidates": [{
                            "content": { "parts": [{ "text": "[" }, { "text": "]" }] }
                        }]
                    }))
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        let client = GeminiClient::new();
        let config = config_for(format!("http://{}/models", addr));
        let text = client.generate(&config, "", "prompt").await.unwrap();
        assert_eq!(text, "[]");
    }

    #[actix_web::test]
    async fn test_generate_reports_api_errors() {
        let server = HttpServer::new(|| {
            App::new().default_service(web::to(|| async {
                HttpResponse::TooManyRequests().body("quota exceeded")
            }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        let client = GeminiClient::new();
        let config = config_for(format!("http://{}/models", addr));
        let err = client.generate(&config, "", "prompt").await.unwrap_err();
        match err {
            AppError::LLMError(message) => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[actix_web::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new();
        let config = LLMConfig::default();
        assert!(matches!(
            client.generate(&config, "", "prompt").await,
            Err(AppError::LLMError(_))
        ));
    }
}
