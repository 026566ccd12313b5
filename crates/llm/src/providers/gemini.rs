//! Gemini LLM provider implementation.
//!
//! Talks to the Google Generative Language REST API
//! (`POST /v1beta/models/{model}:generateContent`).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::DEFAULT_GEMINI_URL;
use mediguide_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API request format.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    message: String,
}

/// Gemini LLM client.
pub struct GeminiClient {
    /// Base URL for the Generative Language API
    base_url: String,

    /// API key sent as `x-goog-api-key`
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_GEMINI_URL, api_key, timeout)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Gemini: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Endpoint URL for a model.
    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            normalize_model(model)
        )
    }

    /// Convert LlmRequest to Gemini format.
    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
        }
    }

    /// Convert Gemini response to LlmResponse.
    fn convert_response(
        &self,
        response: GenerateContentResponse,
        requested_model: &str,
    ) -> AppResult<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Gemini returned no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::Llm(format!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: text,
            model: response
                .model_version
                .unwrap_or_else(|| normalize_model(requested_model).to_string()),
            usage,
        })
    }
}

/// Accept both "gemini-2.5-flash" and "models/gemini-2.5-flash".
fn normalize_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini ({})", request.model);
        tracing::debug!("Prompt length: {} bytes", request.prompt.len());

        let body = self.to_gemini_request(request);
        let url = self.generate_url(&request.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&error_text) {
                return Err(AppError::Llm(format!(
                    "Gemini API error ({} {}): {}",
                    status, envelope.error.status, envelope.error.message
                )));
            }

            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let converted = self.convert_response(gemini_response, &request.model)?;

        tracing::info!(
            "Received completion from Gemini ({} completion tokens)",
            converted.usage.completion_tokens
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_gemini_client_creation() {
        let client = client();
        assert_eq!(client.provider_name(), "gemini");
        assert_eq!(client.base_url, DEFAULT_GEMINI_URL);
    }

    #[test]
    fn test_generate_url_normalizes_model() {
        let client = client();
        assert_eq!(
            client.generate_url("models/gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.generate_url("gemini-2.5-flash"),
            client.generate_url("models/gemini-2.5-flash")
        );
    }

    #[test]
    fn test_gemini_request_conversion() {
        let client = client();
        let request = LlmRequest::new("Hello", "gemini-2.5-flash");

        let json = serde_json::to_value(client.to_gemini_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_convert_response_joins_parts() {
        let client = client();
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Diabetes is "}, {"text": "a chronic disease."}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 12,
                "candidatesTokenCount": 5,
                "totalTokenCount": 17
            },
            "modelVersion": "gemini-2.5-flash"
        }))
        .unwrap();

        let converted = client.convert_response(response, "gemini-2.5-flash").unwrap();
        assert_eq!(converted.content, "Diabetes is a chronic disease.");
        assert_eq!(converted.usage, LlmUsage::new(12, 5));
        assert_eq!(converted.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_convert_response_without_text_fails() {
        let client = client();
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        let err = client
            .convert_response(response, "gemini-2.5-flash")
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_convert_response_without_candidates_fails() {
        let client = client();
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(client.convert_response(response, "m").is_err());
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|Json(body): Json<serde_json::Value>| async move {
                let prompt = body["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                Json(serde_json::json!({
                    "candidates": [{
                        "content": {"parts": [{"text": format!("echo: {}", prompt)}]},
                        "finishReason": "STOP"
                    }]
                }))
            }),
        );
        let base_url = spawn_server(app).await;

        let client =
            GeminiClient::with_base_url(base_url, "test-key", Duration::from_secs(5)).unwrap();
        let response = client
            .complete(&LlmRequest::new("ping", "models/gemini-2.5-flash"))
            .await
            .unwrap();

        assert_eq!(response.content, "echo: ping");
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|| async {
                (
                    axum::http::StatusCode::FORBIDDEN,
                    Json(serde_json::json!({
                        "error": {
                            "code": 403,
                            "message": "API key not valid",
                            "status": "PERMISSION_DENIED"
                        }
                    })),
                )
            }),
        );
        let base_url = spawn_server(app).await;

        let client =
            GeminiClient::with_base_url(base_url, "bad-key", Duration::from_secs(5)).unwrap();
        let err = client
            .complete(&LlmRequest::new("ping", "gemini-2.5-flash"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("API key not valid"));
    }
}
