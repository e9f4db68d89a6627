//! # weather-insights
//!
//! Current weather for a named city, paired with a structured insight from a
//! language model, served over HTTP behind a two-tier TTL cache.
//!
//! ## Overview
//!
//! Each request flows through the same pipeline:
//!
//! ```text
//! GET /weather?city=London
//!   → WeatherGateway   (weather cache, else OpenWeatherMap)
//!   → InsightAdapter   (insight cache keyed by the record's content, else LLM)
//!   → WeatherInsightResponse
//! ```
//!
//! Upstream calls happen only on cache misses. Failures are mapped onto a
//! six-kind taxonomy ([`error_code::ErrorKind`]) and are never cached.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL store, cache tiers, deterministic keys |
//! | [`weather`] | Weather record, provider trait, OpenWeatherMap client, gateway |
//! | [`insight`] | Insight type and schema, generator trait, OpenAI client, adapter |
//! | [`pipeline`] | Per-request orchestration and response assembly |
//! | [`resilience`] | Retry policy with bounded exponential backoff |
//! | [`server`] | `axum` routes and error responses |
//! | [`config`] | Layered settings: defaults, YAML, environment, keyring |
//! | [`telemetry`] | `tracing` subscriber installation |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weather_insights::{config::Settings, pipeline::Pipeline, server};
//!
//! #[tokio::main]
//! async fn main() -> weather_insights::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
//!     server::serve(pipeline, settings.bind_addr()?, server::shutdown_signal()).await
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error_code;
pub mod insight;
pub mod pipeline;
pub mod resilience;
pub mod server;
pub mod telemetry;
pub mod weather;

pub use insight::{ComfortLevel, WeatherInsight};
pub use pipeline::{Pipeline, WeatherInsightResponse};
pub use weather::{Units, WeatherRecord};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, Upstream};
