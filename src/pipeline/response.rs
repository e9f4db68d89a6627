use crate::cache::CacheStats;
use crate::insight::WeatherInsight;
use crate::weather::CurrentWeather;
use serde::{Deserialize, Serialize};

/// Combined answer for one request. Built per request and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInsightResponse {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub conditions: String,
    pub wind_speed: f64,
    pub insight: WeatherInsight,
}

impl WeatherInsightResponse {
    pub fn assemble(current: &CurrentWeather, insight: WeatherInsight) -> Self {
        let record = &current.record;
        Self {
            city: record.city().to_string(),
            country: current.country.clone(),
            temperature: record.temperature(),
            feels_like: record.feels_like(),
            humidity: record.humidity(),
            conditions: record.description().to_string(),
            wind_speed: record.wind_speed(),
            insight,
        }
    }
}

/// Contents of both cache tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheReport {
    pub weather_cache: CacheStats,
    pub insight_cache: CacheStats,
}
