use crate::weather::WeatherRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by an insight generator after its own retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("connection failed after {attempts} attempt(s): {message}")]
    Connect { attempts: u32, message: String },

    #[error("malformed output after {attempts} attempt(s): {message}")]
    Malformed { attempts: u32, message: String },
}

impl GeneratorError {
    /// Transient failures, including unparseable output, are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GeneratorError::Status { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            GeneratorError::Status { .. } => 1,
            GeneratorError::Timeout { attempts }
            | GeneratorError::Connect { attempts, .. }
            | GeneratorError::Malformed { attempts, .. } => *attempts,
        }
    }

    pub(crate) fn with_attempts(mut self, n: u32) -> Self {
        match &mut self {
            GeneratorError::Status { .. } => {}
            GeneratorError::Timeout { attempts }
            | GeneratorError::Connect { attempts, .. }
            | GeneratorError::Malformed { attempts, .. } => *attempts = n,
        }
        self
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeneratorError::Timeout { attempts: 1 }
        } else if err.is_decode() {
            GeneratorError::Malformed {
                attempts: 1,
                message: err.to_string(),
            }
        } else {
            GeneratorError::Connect {
                attempts: 1,
                message: err.to_string(),
            }
        }
    }
}

/// Turns a weather record into an insight-shaped JSON value.
///
/// The value is unchecked; the adapter validates it against the insight
/// schema before anything is cached.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, record: &WeatherRecord) -> Result<serde_json::Value, GeneratorError>;
}
