//! Google Gemini `generateContent` client.

use crate::error::{LlmError, LlmResult};
use crate::traits::Generator;
use crate::types::*;
use async_trait::async_trait;
use atlas_config::LlmConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the hosted Gemini chat API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client, reading the API key from the environment variable
    /// named in `llm.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::InvalidConfig(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;

        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> LlmResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, system: &str, user: &str) -> GeminiRequest {
        GeminiRequest {
            system_instruction: if system.is_empty() {
                None
            } else {
                Some(GeminiContent::text(None, system))
            },
            contents: vec![GeminiContent::text(Some("user"), user)],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Interpret a `generateContent` reply body.
pub(crate) fn parse_gemini_body(status: u16, body: &str) -> LlmResult<String> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        let preview: String = trimmed.chars().take(200).collect();
        return Err(LlmError::ParseError(format!(
            "expected JSON but got HTML (HTTP {}): {}",
            status, preview
        )));
    }

    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<GeminiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(300).collect());
        return Err(LlmError::ApiError { status, message });
    }

    let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(300).collect();
        LlmError::ParseError(format!("{} in body: {}", e, preview))
    })?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" {
            warn!("Gemini finished with reason {}", reason);
        }
    }

    // A candidate without text (e.g. blocked for safety) is an empty reply, not a failure.
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(text)
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = self.endpoint();
        debug!("Generating with Gemini model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(system, user))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if status == 404 {
            return Err(LlmError::ModelNotFound {
                model: self.model.clone(),
            });
        }

        parse_gemini_body(status, &body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::with_api_key(&LlmConfig::default(), "test-key").unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(client().build_request("Be brief.", "Who was Hannibal?"))
            .unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Who was Hannibal?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert!(body["generationConfig"]["temperature"].as_f64().is_some());
    }

    #[test]
    fn test_parse_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Answer: "},{"text":"Carthage."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_gemini_body(200, body).unwrap(), "Answer: Carthage.");
    }

    #[test]
    fn test_parse_no_candidates() {
        let err = parse_gemini_body(200, r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));

        let err = parse_gemini_body(200, r#"{}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn test_parse_candidate_without_text() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert_eq!(parse_gemini_body(200, body).unwrap(), "");

        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"  "}]},"finishReason":"MAX_TOKENS"}]}"#;
        assert_eq!(parse_gemini_body(200, body).unwrap().trim(), "");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        match parse_gemini_body(400, body).unwrap_err() {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_html_body() {
        let err = parse_gemini_body(502, "<!DOCTYPE html><html>Bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            api_key_env: "ATLAS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = GeminiClient::from_config(&config).unwrap_err();
        assert!(matches!(err, LlmError::InvalidConfig(_)));
    }
}
