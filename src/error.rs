use crate::error_code::ErrorKind;
use std::fmt;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "cache.weather_ttl_secs", "comfort_level")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "settings", "insight_validator")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Which external collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Weather,
    Insight,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Weather => write!(f, "Weather API"),
            Upstream::Insight => write!(f, "Insight generator"),
        }
    }
}

/// Unified error type for the weather insights pipeline.
///
/// The first six variants are the request taxonomy (see [`ErrorKind`]);
/// the rest only occur while loading settings or starting the server and
/// are reported as `Misconfigured`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("City '{city}' not found. Please check the spelling and try again.")]
    CityNotFound { city: String },

    #[error("{upstream} rate limit exceeded. Please try again later.")]
    RateLimited { upstream: Upstream },

    #[error("{upstream} authentication failed: {message}")]
    Misconfigured { upstream: Upstream, message: String },

    #[error("{upstream} unavailable after {attempts} attempt(s): {message}")]
    Unavailable {
        upstream: Upstream,
        attempts: u32,
        message: String,
    },

    #[error("{upstream} error{}: {message}", format_status(.status))]
    UpstreamError {
        upstream: Upstream,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid insight: {message}{}", format_context(.context))]
    InvalidInsight {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (HTTP {})", s),
        None => String::new(),
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new invalid-insight error with structured context
    pub fn invalid_insight_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidInsight {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// The taxonomy kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CityNotFound { .. } => ErrorKind::CityNotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Misconfigured { .. } | Error::Configuration { .. } | Error::Io(_) => {
                ErrorKind::Misconfigured
            }
            Error::Unavailable { .. } => ErrorKind::Unavailable,
            Error::UpstreamError { .. } => ErrorKind::UpstreamError,
            Error::InvalidInsight { .. } => ErrorKind::InvalidInsight,
        }
    }

    /// The collaborator that failed, if the error came from one.
    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            Error::RateLimited { upstream }
            | Error::Misconfigured { upstream, .. }
            | Error::Unavailable { upstream, .. }
            | Error::UpstreamError { upstream, .. } => Some(*upstream),
            Error::InvalidInsight { .. } => Some(Upstream::Insight),
            Error::CityNotFound { .. } => Some(Upstream::Weather),
            Error::Configuration { .. } | Error::Io(_) => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidInsight { context, .. } | Error::Configuration { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::CityNotFound {
            city: "Atlantis".into(),
        };
        assert_eq!(err.kind(), ErrorKind::CityNotFound);
        assert_eq!(
            err.to_string(),
            "City 'Atlantis' not found. Please check the spelling and try again."
        );

        let err = Error::configuration_with_context(
            "ttl must be positive",
            ErrorContext::new().with_field_path("cache.weather_ttl_secs"),
        );
        assert_eq!(err.kind(), ErrorKind::Misconfigured);
        assert!(err.upstream().is_none());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::invalid_insight_with_context(
            "comfort level out of range",
            ErrorContext::new()
                .with_field_path("comfort_level")
                .with_source("insight_validator"),
        );
        let text = err.to_string();
        assert!(text.contains("field: comfort_level"));
        assert!(text.contains("source: insight_validator"));
    }

    #[test]
    fn test_upstream_error_display() {
        let err = Error::UpstreamError {
            upstream: Upstream::Weather,
            status: Some(502),
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Weather API error (HTTP 502): bad gateway");
        assert_eq!(err.upstream(), Some(Upstream::Weather));
    }
}
