use super::generator::{GeneratorError, InsightGenerator};
use super::schema::InsightValidator;
use super::types::WeatherInsight;
use crate::cache::{CacheKey, CacheTier, HashFields};
use crate::error::{ErrorContext, Upstream};
use crate::error_code::ErrorKind;
use crate::weather::WeatherRecord;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Cache-or-generate access to weather insights.
///
/// Insights are keyed by the content of the weather record, so any two
/// field-wise equal observations share one cached insight.
pub struct InsightAdapter {
    generator: Arc<dyn InsightGenerator>,
    cache: Arc<CacheTier<WeatherInsight>>,
    validator: InsightValidator,
    hash_fields: HashFields,
}

impl InsightAdapter {
    pub fn new(
        generator: Arc<dyn InsightGenerator>,
        cache: Arc<CacheTier<WeatherInsight>>,
        hash_fields: HashFields,
    ) -> Result<Self> {
        Ok(Self {
            generator,
            cache,
            validator: InsightValidator::new()?,
            hash_fields,
        })
    }

    pub fn cache(&self) -> &Arc<CacheTier<WeatherInsight>> {
        &self.cache
    }

    pub fn key_for(&self, record: &WeatherRecord) -> CacheKey {
        CacheKey::insight(record, self.hash_fields)
    }

    pub async fn generate_insight(&self, record: &WeatherRecord) -> Result<WeatherInsight> {
        let key = self.key_for(record);
        self.cache
            .get_or_try_fill(&key, || self.generate_uncached(record))
            .await
    }

    async fn generate_uncached(&self, record: &WeatherRecord) -> Result<WeatherInsight> {
        let value = self.generator.generate(record).await.map_err(|e| {
            warn!(city = record.city(), error = %e, "insight generation failed");
            map_generator_error(e)
        })?;

        let insight = self.validator.validate(&value).map_err(|e| {
            warn!(city = record.city(), error = %e, "insight rejected");
            e
        })?;

        info!(
            city = record.city(),
            comfort_level = %insight.comfort_level(),
            umbrella = insight.should_bring_umbrella(),
            "generated weather insight"
        );
        Ok(insight)
    }
}

fn map_generator_error(err: GeneratorError) -> Error {
    let upstream = Upstream::Insight;
    match err {
        GeneratorError::Status { status, message } => match ErrorKind::from_http_status(status) {
            ErrorKind::RateLimited => Error::RateLimited { upstream },
            ErrorKind::Misconfigured => Error::Misconfigured { upstream, message },
            _ => Error::UpstreamError {
                upstream,
                status: Some(status),
                message,
            },
        },
        GeneratorError::Timeout { attempts } => Error::Unavailable {
            upstream,
            attempts,
            message: "request timed out".to_string(),
        },
        GeneratorError::Connect { attempts, message } => Error::Unavailable {
            upstream,
            attempts,
            message,
        },
        GeneratorError::Malformed { attempts, message } => Error::invalid_insight_with_context(
            format!("unparseable output after {} attempt(s)", attempts),
            ErrorContext::new()
                .with_details(message)
                .with_source("insight_generator"),
        ),
    }
}
