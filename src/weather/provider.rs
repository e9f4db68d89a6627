use super::types::{ProviderWeather, Units};
use async_trait::async_trait;
use thiserror::Error;

/// Raw failure from a weather provider, before it is mapped onto [`crate::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Timeouts and connection failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::Connect(_))
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Connect(err.to_string())
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Connect(err.to_string())
        }
    }
}

/// Source of current-weather observations.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_current(&self, city: &str, units: Units)
        -> Result<ProviderWeather, ProviderError>;
}
