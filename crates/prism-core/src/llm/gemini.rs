//! Gemini provider using the `generateContent` REST API.

use super::provider::{resolve_env_var, LlmProvider, LlmRequest, LlmResponse};
use crate::config::{GeminiConfig, LimitsConfig};
use crate::error::{ConfigError, PipelineError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Gemini provider. Built once at startup; the HTTP client and key are reused
/// for every request.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_output_tokens: None,
            temperature: None,
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    /// Build from config, resolving the API key from the environment.
    ///
    /// Fails when the key cannot be resolved, so a misconfigured process
    /// never starts serving.
    pub fn from_config(config: &GeminiConfig, limits: &LimitsConfig) -> Result<Self, ConfigError> {
        let api_key = resolve_env_var(&config.api_key)
            .ok_or_else(|| ConfigError::MissingApiKey(config.api_key.clone()))?;
        let mut provider = Self::new(&api_key, &config.model, &config.endpoint);
        provider.max_output_tokens = config.max_output_tokens;
        provider.temperature = config.temperature;
        provider.timeout = Duration::from_millis(limits.llm_timeout_ms);
        Ok(provider)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated verbatim.
    fn text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

fn build_request(
    prompt: &str,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
) -> GenerateRequest {
    let generation_config = (max_output_tokens.is_some() || temperature.is_some()).then_some(
        GenerationConfig {
            max_output_tokens,
            temperature,
        },
    );
    GenerateRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        generation_config,
    }
}

/// Connect failures and transport timeouts are transient; anything else
/// reqwest reports is a plain LLM error.
fn send_error(e: reqwest::Error) -> PipelineError {
    if e.is_connect() || e.is_timeout() {
        PipelineError::LlmUnreachable {
            message: format!("Gemini request failed: {e}"),
        }
    } else {
        PipelineError::Llm {
            message: format!("Gemini request failed: {e}"),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        let start = Instant::now();

        let body = build_request(
            &request.prompt,
            request.max_tokens.or(self.max_output_tokens),
            request.temperature.or(self.temperature),
        );

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout())
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("Gemini HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse Gemini response: {e}"),
            status_code: None,
        })?;

        let tokens_used = parsed
            .usage_metadata
            .as_ref()
            .and_then(|u| u.total_token_count);
        let model = parsed
            .model_version
            .clone()
            .unwrap_or_else(|| self.model.clone());

        let text = parsed.text().ok_or_else(|| PipelineError::Llm {
            message: "Gemini returned no text candidates".to_string(),
            status_code: None,
        })?;

        Ok(LlmResponse {
            text,
            model,
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::retry;

    #[test]
    fn test_request_body_without_generation_config() {
        let body = serde_json::to_value(build_request("Title please", None, None)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Title please" }] }]
            })
        );
    }

    #[test]
    fn test_request_body_with_generation_config() {
        let body = serde_json::to_value(build_request("x", Some(256), Some(0.2))).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_response_text_concatenates_parts_verbatim() {
        let raw = r#"{
            "candidates": [{ "content": { "parts": [{ "text": "[your brand name] " }, { "text": "Leather Wallet\n" }] } }],
            "usageMetadata": { "totalTokenCount": 91 },
            "modelVersion": "gemini-1.5-flash-002"
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.usage_metadata.as_ref().unwrap().total_token_count,
            Some(91)
        );
        assert_eq!(
            parsed.text().as_deref(),
            Some("[your brand name] Leather Wallet\n")
        );
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = GeminiConfig {
            api_key: "${PRISM_TEST_UNSET_KEY_8841}".to_string(),
            ..GeminiConfig::default()
        };
        let err = GeminiProvider::from_config(&config, &LimitsConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingApiKey(_)));
    }

    #[test]
    fn test_from_config_builds_url() {
        let config = GeminiConfig {
            api_key: "literal-key".to_string(),
            endpoint: "http://localhost:9999/v1beta/".to_string(),
            ..GeminiConfig::default()
        };
        let provider = GeminiProvider::from_config(&config, &LimitsConfig::default()).unwrap();
        assert_eq!(
            provider.url(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(provider.timeout(), Duration::from_millis(60000));
    }

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        let provider = GeminiProvider::new("key", "m", "http://127.0.0.1:1/v1beta");
        let err = provider.generate(&LlmRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, PipelineError::LlmUnreachable { .. }));
        assert!(retry::is_retryable(&err));
    }

    #[tokio::test]
    async fn test_silent_server_hits_client_timeout() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut provider = GeminiProvider::new("key", "m", &format!("http://{addr}/v1beta"));
        provider.timeout = Duration::from_millis(100);

        let started = Instant::now();
        let err = provider.generate(&LlmRequest::new("x")).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, PipelineError::LlmUnreachable { .. }));
        assert!(retry::is_retryable(&err));
    }
}
