//! OpenWeatherMap current-weather client.

use super::provider::{ProviderError, WeatherProvider};
use super::types::{ProviderWeather, Units};
use crate::error::ErrorContext;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Error body the provider sends with non-2xx answers, e.g.
/// `{"cod": "404", "message": "city not found"}`.
#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(config: OpenWeatherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to build weather HTTP client: {}", e),
                    ErrorContext::new().with_source("openweather"),
                )
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_current(
        &self,
        city: &str,
        units: Units,
    ) -> std::result::Result<ProviderWeather, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::Status {
                status: 401,
                message: "OpenWeatherMap API key is not configured".to_string(),
            });
        };

        let url = format!("{}/weather", self.base_url);
        debug!(city, units = %units, "requesting current weather");

        let resp = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", units.as_str())])
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(ProviderError::from_reqwest)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = OpenWeatherClient::new(OpenWeatherConfig {
            // Nothing listens here; a network attempt would surface as Connect.
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: Some("   ".to_string()),
            timeout: Duration::from_millis(100),
        })
        .unwrap();

        assert!(!client.has_api_key());
        let err = client.fetch_current("London", Units::Metric).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenWeatherClient::new(OpenWeatherConfig {
            base_url: "http://localhost:1234/data/2.5/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:1234/data/2.5");
    }
}
