//! Error kinds surfaced by the request pipeline.
//!
//! Every failure that leaves [`Pipeline::handle_request`](crate::pipeline::Pipeline::handle_request)
//! belongs to exactly one of six kinds. Each kind carries fixed metadata: a
//! stable code, a snake_case name, whether a caller may retry, and the HTTP
//! status the server maps it to.
//!
//! | Code  | Name             | Retryable | HTTP |
//! |-------|------------------|-----------|------|
//! | W1001 | `city_not_found` | no        | 404  |
//! | W2001 | `rate_limited`   | later     | 429  |
//! | W3001 | `misconfigured`  | no        | 500  |
//! | W4001 | `unavailable`    | yes       | 504  |
//! | W4002 | `upstream_error` | no        | 500  |
//! | W5001 | `invalid_insight`| no        | 500  |
//!
//! ## Example
//!
//! ```rust
//! use weather_insights::error_code::ErrorKind;
//!
//! let kind = ErrorKind::from_http_status(429);
//! assert_eq!(kind, ErrorKind::RateLimited);
//! assert_eq!(kind.code(), "W2001");
//! assert_eq!(kind.http_status(), 429);
//! ```

use serde::Serialize;
use std::fmt;

/// The unified failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// W1001: the provider does not know the requested city
    CityNotFound,
    /// W2001: an upstream throttled us; the caller may retry later
    RateLimited,
    /// W3001: credentials or settings are invalid; fatal
    Misconfigured,
    /// W4001: timeout or connection failure that outlived the retry budget
    Unavailable,
    /// W4002: unexpected provider failure
    UpstreamError,
    /// W5001: the insight generator produced a non-conforming result
    InvalidInsight,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        Self::CityNotFound,
        Self::RateLimited,
        Self::Misconfigured,
        Self::Unavailable,
        Self::UpstreamError,
        Self::InvalidInsight,
    ];

    /// Returns the stable code string (e.g., `"W1001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CityNotFound => "W1001",
            Self::RateLimited => "W2001",
            Self::Misconfigured => "W3001",
            Self::Unavailable => "W4001",
            Self::UpstreamError => "W4002",
            Self::InvalidInsight => "W5001",
        }
    }

    /// Returns the snake_case name (e.g., `"city_not_found"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CityNotFound => "city_not_found",
            Self::RateLimited => "rate_limited",
            Self::Misconfigured => "misconfigured",
            Self::Unavailable => "unavailable",
            Self::UpstreamError => "upstream_error",
            Self::InvalidInsight => "invalid_insight",
        }
    }

    /// Whether a caller can reasonably try the same request again.
    ///
    /// `RateLimited` counts as retryable for the caller even though the
    /// gateway itself never retries it.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Unavailable)
    }

    /// HTTP status used by the server for this kind.
    #[inline]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::CityNotFound => 404,
            Self::RateLimited => 429,
            Self::Misconfigured => 500,
            Self::Unavailable => 504,
            Self::UpstreamError => 500,
            Self::InvalidInsight => 500,
        }
    }

    /// Classifies an upstream HTTP status.
    ///
    /// Only the statuses with a dedicated meaning are singled out; everything
    /// else is an `UpstreamError`.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            404 => Self::CityNotFound,
            429 => Self::RateLimited,
            401 | 403 => Self::Misconfigured,
            _ => Self::UpstreamError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
