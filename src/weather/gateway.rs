use super::provider::{ProviderError, WeatherProvider};
use super::types::{CurrentWeather, Units};
use crate::cache::{normalize_city, CacheKey, CacheTier};
use crate::error::Upstream;
use crate::error_code::ErrorKind;
use crate::resilience::{RetryFailure, RetryPolicy};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Cache-or-fetch access to current weather.
///
/// Provider failures are translated into the crate taxonomy here; only
/// successful, validated observations reach the cache.
pub struct WeatherGateway {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<CacheTier<CurrentWeather>>,
    retry: RetryPolicy,
}

impl WeatherGateway {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cache: Arc<CacheTier<CurrentWeather>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<CacheTier<CurrentWeather>> {
        &self.cache
    }

    pub async fn get_current_weather(&self, city: &str, units: Units) -> Result<CurrentWeather> {
        let city = city.trim();
        if normalize_city(city).is_empty() {
            return Err(Error::CityNotFound {
                city: city.to_string(),
            });
        }

        let key = CacheKey::weather(city, units);
        self.cache
            .get_or_try_fill(&key, || self.fetch(city, units))
            .await
    }

    async fn fetch(&self, city: &str, units: Units) -> Result<CurrentWeather> {
        let payload = self
            .retry
            .run(
                "weather.fetch_current",
                |_| self.provider.fetch_current(city, units),
                ProviderError::is_retryable,
            )
            .await
            .map_err(|failure| {
                warn!(city, units = %units, attempts = failure.attempts, error = %failure.error, "weather fetch failed");
                map_provider_error(city, failure)
            })?;

        let current = CurrentWeather::try_from(payload).map_err(|e| Error::UpstreamError {
            upstream: Upstream::Weather,
            status: None,
            message: e.to_string(),
        })?;

        info!(
            city = current.record.city(),
            country = %current.country,
            units = %units,
            "fetched current weather"
        );
        Ok(current)
    }
}

fn map_provider_error(city: &str, failure: RetryFailure<ProviderError>) -> Error {
    let upstream = Upstream::Weather;
    match failure.error {
        ProviderError::Status { status, message } => match ErrorKind::from_http_status(status) {
            ErrorKind::CityNotFound => Error::CityNotFound {
                city: city.to_string(),
            },
            ErrorKind::RateLimited => Error::RateLimited { upstream },
            ErrorKind::Misconfigured => Error::Misconfigured { upstream, message },
            _ => Error::UpstreamError {
                upstream,
                status: Some(status),
                message,
            },
        },
        ProviderError::Timeout => Error::Unavailable {
            upstream,
            attempts: failure.attempts,
            message: "request timed out".to_string(),
        },
        ProviderError::Connect(message) => Error::Unavailable {
            upstream,
            attempts: failure.attempts,
            message,
        },
        ProviderError::Decode(message) => Error::UpstreamError {
            upstream,
            status: None,
            message,
        },
    }
}
