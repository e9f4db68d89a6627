//! OpenAI-compatible chat-completions insight generator.

use super::generator::{GeneratorError, InsightGenerator};
use super::prompt::{user_prompt, SYSTEM_PROMPT};
use super::schema::response_format_schema;
use crate::error::ErrorContext;
use crate::resilience::RetryPolicy;
use crate::weather::WeatherRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    /// Attempts per insight, covering transient and malformed-output failures.
    pub retry: RetryPolicy,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiInsightClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiInsightClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to build insight HTTP client: {}", e),
                    ErrorContext::new().with_source("openai"),
                )
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
            model: config.model,
            retry: config.retry,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(&self, record: &WeatherRecord) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(record)},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "weather_insight",
                    "strict": true,
                    "schema": response_format_schema(),
                }
            }
        })
    }

    async fn attempt(&self, api_key: &str, body: &Value) -> std::result::Result<Value, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(GeneratorError::from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(GeneratorError::from_reqwest)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let malformed = |message: String| GeneratorError::Malformed {
            attempts: 1,
            message,
        };
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| malformed(format!("response body: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| malformed("response has no message content".to_string()))?;

        serde_json::from_str(&content).map_err(|e| malformed(format!("message content: {}", e)))
    }
}

#[async_trait]
impl InsightGenerator for OpenAiInsightClient {
    async fn generate(&self, record: &WeatherRecord) -> std::result::Result<Value, GeneratorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeneratorError::Status {
                status: 401,
                message: "OpenAI API key is not configured".to_string(),
            });
        };

        let body = self.request_body(record);
        debug!(model = %self.model, city = record.city(), "requesting weather insight");

        self.retry
            .run(
                "insight.generate",
                |_| self.attempt(api_key, &body),
                GeneratorError::is_retryable,
            )
            .await
            .map_err(|failure| failure.error.with_attempts(failure.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> WeatherRecord {
        WeatherRecord::builder()
            .city("London")
            .temperature(15.2)
            .feels_like(13.8)
            .humidity(75)
            .description("light rain")
            .wind_speed(5.5)
            .timestamp(1234567890)
            .build()
            .unwrap()
    }

    #[test]
    fn test_request_body_is_deterministic_and_structured() {
        let client = OpenAiInsightClient::new(OpenAiConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .unwrap();
        let body = client.request_body(&record());

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("light rain"));
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["additionalProperties"],
            false
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = OpenAiInsightClient::new(OpenAiConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(!client.has_api_key());
        let err = client.generate(&record()).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Status { status: 401, .. }));
    }
}
