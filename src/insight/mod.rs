//! # Insight generation
//!
//! Turns a [`WeatherRecord`](crate::weather::WeatherRecord) into a validated
//! [`WeatherInsight`] through a language model.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`InsightGenerator`] | Seam to the model; returns unchecked JSON |
//! | [`OpenAiInsightClient`] | Chat-completions implementation with JSON-schema output |
//! | [`InsightValidator`] | Checks output against the schema derived from [`WeatherInsight`] |
//! | [`InsightAdapter`] | Content-addressed caching and error mapping in front of a generator |

mod adapter;
mod generator;
mod openai;
mod prompt;
mod schema;
mod types;

pub use adapter::InsightAdapter;
pub use generator::{GeneratorError, InsightGenerator};
pub use openai::{OpenAiConfig, OpenAiInsightClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompt::{user_prompt, SYSTEM_PROMPT};
pub use schema::{insight_schema, response_format_schema, InsightValidator};
pub use types::{ComfortLevel, WeatherInsight};
