//! # Weather
//!
//! Current-weather retrieval: the typed [`WeatherRecord`], the
//! [`WeatherProvider`] seam with its OpenWeatherMap implementation, and the
//! caching [`WeatherGateway`] the pipeline talks to.
//!
//! | Provider answer | Error |
//! |-----------------|-------|
//! | 404 | `CityNotFound` |
//! | 429 | `RateLimited` |
//! | 401 / 403 | `Misconfigured` |
//! | timeout, connection failure (after retries) | `Unavailable` |
//! | undecodable payload, any other status | `UpstreamError` |

mod gateway;
mod openweather;
mod provider;
mod types;

pub use gateway::WeatherGateway;
pub use openweather::{OpenWeatherClient, OpenWeatherConfig, DEFAULT_BASE_URL};
pub use provider::{ProviderError, WeatherProvider};
pub use types::{
    CurrentWeather, InvalidRecord, ProviderCondition, ProviderMain, ProviderSys, ProviderWeather,
    ProviderWind, Units, WeatherRecord, WeatherRecordBuilder,
};
