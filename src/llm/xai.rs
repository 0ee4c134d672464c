use std::time::Instant;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{BoxFuture, FortuneTeller, SYSTEM_PROMPT, fortune_prompt};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;

/// Upstream error bodies are truncated to this many characters in logs.
const ERROR_SNIPPET_CHARS: usize = 800;

/// Client for xAI's OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct XaiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl std::fmt::Debug for XaiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XaiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key_set", &self.api_key.is_some())
            .finish()
    }
}

impl XaiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: config.xai_api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.xai_api_base.trim_end_matches('/')
            ),
            model: config.fortune_model.clone(),
        })
    }

    /// Run one chat completion and return the trimmed assistant message.
    #[instrument(skip(self, keywords), fields(model = %self.model))]
    async fn complete(&self, keywords: &[String]) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError("XAI_API_KEY is not set".to_string()))?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: fortune_prompt(keywords),
                },
            ],
        };

        let start = Instant::now();
        let result = self.send(api_key, &request).await;
        let elapsed = start.elapsed().as_secs_f64();

        metrics::record_llm_request(if result.is_ok() { "success" } else { "error" }, elapsed);
        debug!(elapsed_secs = elapsed, ok = result.is_ok(), "Completion call finished");

        result
    }

    async fn send(&self, api_key: &str, request: &ChatCompletionRequest<'_>) -> AppResult<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let snippet: String = body.chars().take(ERROR_SNIPPET_CHARS).collect();
            warn!(status = status.as_u16(), body = %snippet, "Upstream returned an error status");
            return Err(AppError::Upstream(format!("{}: {snippet}", status.as_u16())));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("Malformed completion response: {e}")))?;

        extract_fortune(parsed)
    }
}

impl FortuneTeller for XaiClient {
    fn tell<'a>(&'a self, keywords: &'a [String]) -> BoxFuture<'a, AppResult<String>> {
        Box::pin(self.complete(keywords))
    }
}

fn map_transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout(e.to_string())
    } else {
        AppError::Upstream(e.to_string())
    }
}

/// Pull the first choice's content out of a completion.
fn extract_fortune(response: ChatCompletionResponse) -> AppResult<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AppError::Upstream("Completion contained no text".to_string()));
    }

    Ok(content)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = Config {
            xai_api_base: "https://api.x.ai/v1/".to_string(),
            ..Config::default()
        };

        let client = XaiClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint, "https://api.x.ai/v1/chat/completions");
    }

    #[test]
    fn test_extract_fortune_trims_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"  🌟 Good luck! \n"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();

        assert_eq!(extract_fortune(parsed).unwrap(), "🌟 Good luck!");
    }

    #[test]
    fn test_extract_fortune_empty_choices() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();

        assert!(matches!(extract_fortune(parsed), Err(AppError::Upstream(_))));
    }

    #[test]
    fn test_extract_fortune_null_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();

        assert!(extract_fortune(parsed).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "grok-3-beta",
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: "hi".to_string(),
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "grok-3-beta");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let client = XaiClient::from_config(&Config::default()).unwrap();
        let keywords = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let err = client.tell(&keywords).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
