//! # Request pipeline
//!
//! Composes the weather gateway and the insight adapter for one request:
//!
//! ```text
//! Start → FetchWeather → GenerateInsight → Assemble → Done
//!   └──────────┴──────────────┴──────────────┴──→ Failed(kind)
//! ```
//!
//! Weather is always resolved before insight generation starts. A failure
//! in any stage ends the request with the error passed through untouched;
//! no partial response is ever produced.
//!
//! ## Example
//!
//! ```rust,no_run
//! use weather_insights::config::Settings;
//! use weather_insights::pipeline::Pipeline;
//! use weather_insights::weather::Units;
//!
//! # async fn run() -> weather_insights::Result<()> {
//! let pipeline = Pipeline::from_settings(&Settings::default())?;
//! let response = pipeline.handle_request("London", Units::Metric).await?;
//! println!("{}: {}", response.city, response.insight.summary());
//! # Ok(())
//! # }
//! ```

mod response;
mod stage;

pub use response::{CacheReport, WeatherInsightResponse};
pub use stage::{Stage, StageTracker};

use crate::cache::CacheTier;
use crate::config::Settings;
use crate::insight::{InsightAdapter, OpenAiInsightClient};
use crate::weather::{OpenWeatherClient, Units, WeatherGateway};
use crate::Result;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Per-request orchestration over the two cache-backed collaborators.
pub struct Pipeline {
    weather: WeatherGateway,
    insights: InsightAdapter,
}

impl Pipeline {
    pub fn new(weather: WeatherGateway, insights: InsightAdapter) -> Self {
        Self { weather, insights }
    }

    /// Wire the HTTP clients, cache tiers and retry policy described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = OpenWeatherClient::new(settings.openweather_config())?;
        let generator = OpenAiInsightClient::new(settings.openai_config())?;

        let weather = WeatherGateway::new(
            Arc::new(provider),
            Arc::new(CacheTier::new("weather", settings.weather_cache_config())),
            settings.retry_policy(),
        );
        let insights = InsightAdapter::new(
            Arc::new(generator),
            Arc::new(CacheTier::new("insight", settings.insight_cache_config())),
            settings.hash_fields(),
        )?;
        Ok(Self::new(weather, insights))
    }

    pub fn weather(&self) -> &WeatherGateway {
        &self.weather
    }

    pub fn insights(&self) -> &InsightAdapter {
        &self.insights
    }

    /// Fetch (or reuse) the weather for `city`, then generate (or reuse) its insight.
    pub async fn handle_request(&self, city: &str, units: Units) -> Result<WeatherInsightResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, city, units = %units);
        self.run_stages(city, units).instrument(span).await
    }

    async fn run_stages(&self, city: &str, units: Units) -> Result<WeatherInsightResponse> {
        let mut tracker = StageTracker::new();

        tracker.advance();
        let current = match self.weather.get_current_weather(city, units).await {
            Ok(current) => current,
            Err(e) => {
                tracker.fail(e.kind());
                return Err(e);
            }
        };

        tracker.advance();
        let insight = match self.insights.generate_insight(&current.record).await {
            Ok(insight) => insight,
            Err(e) => {
                tracker.fail(e.kind());
                return Err(e);
            }
        };

        tracker.advance();
        let response = WeatherInsightResponse::assemble(&current, insight);

        tracker.advance();
        debug!(stages = tracker.history().len(), "request complete");
        Ok(response)
    }

    pub fn cache_report(&self) -> CacheReport {
        CacheReport {
            weather_cache: self.weather.cache().stats(),
            insight_cache: self.insights.cache().stats(),
        }
    }

    pub fn clear_caches(&self) {
        self.weather.cache().clear();
        self.insights.cache().clear();
        info!("caches cleared");
    }

    /// Periodically purge expired entries from both tiers.
    ///
    /// Returns `None` for a zero interval. The task ends on its own once the
    /// pipeline is dropped.
    pub fn spawn_cache_sweeper(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }
        let pipeline: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pipeline) = pipeline.upgrade() else {
                    break;
                };
                let weather = pipeline.weather.cache().purge_expired();
                let insight = pipeline.insights.cache().purge_expired();
                if weather + insight > 0 {
                    debug!(weather, insight, "purged expired cache entries");
                }
            }
        }))
    }
}
