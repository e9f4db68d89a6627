use super::error::ApiError;
use super::AppState;
use crate::pipeline::{CacheReport, WeatherInsightResponse};
use crate::weather::Units;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const SERVICE_NAME: &str = "weather-insights";

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherQuery {
    pub city: String,
    #[serde(default)]
    pub units: Units,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<WeatherInsightResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if query.city.trim().is_empty() {
        return Err(ApiError::bad_request("city must not be blank"));
    }

    let response = state.pipeline.handle_request(&query.city, query.units).await?;
    info!(city = %response.city, country = %response.country, "weather insight served");
    Ok(Json(response))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheReport> {
    Json(state.pipeline.cache_report())
}
