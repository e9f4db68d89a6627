//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use weather_insights::cache::{CacheConfig, CacheTier, HashFields};
use weather_insights::insight::{GeneratorError, InsightAdapter, InsightGenerator};
use weather_insights::pipeline::Pipeline;
use weather_insights::resilience::RetryPolicy;
use weather_insights::weather::{
    ProviderCondition, ProviderError, ProviderMain, ProviderSys, ProviderWeather, ProviderWind,
    Units, WeatherGateway, WeatherProvider,
};
use weather_insights::WeatherRecord;

pub const WEATHER_TTL: Duration = Duration::from_secs(600);
pub const INSIGHT_TTL: Duration = Duration::from_secs(1800);

pub fn london_payload() -> ProviderWeather {
    ProviderWeather {
        name: "London".into(),
        sys: ProviderSys {
            country: "GB".into(),
        },
        main: ProviderMain {
            temp: 15.2,
            feels_like: 13.8,
            humidity: 75,
        },
        weather: vec![ProviderCondition {
            description: "light rain".into(),
        }],
        wind: ProviderWind { speed: 5.5 },
        dt: 1234567890,
    }
}

pub fn rainy_insight() -> Value {
    json!({
        "summary": "Cool and damp with light rain.",
        "recommendation": "Wear a waterproof jacket.",
        "comfort_level": "moderate",
        "should_bring_umbrella": true
    })
}

/// Weather provider that replays scripted outcomes, then keeps answering
/// with the default payload. Every call is recorded.
pub struct StubProvider {
    default: Mutex<ProviderWeather>,
    script: Mutex<VecDeque<Result<ProviderWeather, ProviderError>>>,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Units)>>,
}

impl StubProvider {
    pub fn new(default: ProviderWeather) -> Arc<Self> {
        Self::build(default, Vec::new(), Duration::ZERO)
    }

    pub fn scripted(script: Vec<Result<ProviderWeather, ProviderError>>) -> Arc<Self> {
        Self::build(london_payload(), script, Duration::ZERO)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(london_payload(), Vec::new(), delay)
    }

    fn build(
        default: ProviderWeather,
        script: Vec<Result<ProviderWeather, ProviderError>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            default: Mutex::new(default),
            script: Mutex::new(script.into()),
            delay,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn set_default(&self, payload: ProviderWeather) {
        *self.default.lock().unwrap() = payload;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Units)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch_current(
        &self,
        city: &str,
        units: Units,
    ) -> Result<ProviderWeather, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((city.to_string(), units));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default.lock().unwrap().clone()))
    }
}

/// Insight generator with the same replay-then-default behaviour.
pub struct StubGenerator {
    default: Value,
    script: Mutex<VecDeque<Result<Value, GeneratorError>>>,
    calls: AtomicUsize,
    records: Mutex<Vec<WeatherRecord>>,
}

impl StubGenerator {
    pub fn new(default: Value) -> Arc<Self> {
        Self::scripted(default, Vec::new())
    }

    pub fn scripted(default: Value, script: Vec<Result<Value, GeneratorError>>) -> Arc<Self> {
        Arc::new(Self {
            default,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<WeatherRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsightGenerator for StubGenerator {
    async fn generate(&self, record: &WeatherRecord) -> Result<Value, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(record.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default.clone()))
    }
}

pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub provider: Arc<StubProvider>,
    pub generator: Arc<StubGenerator>,
}

pub fn harness(provider: Arc<StubProvider>, generator: Arc<StubGenerator>) -> Harness {
    harness_with(provider, generator, true, HashFields::All)
}

pub fn harness_with(
    provider: Arc<StubProvider>,
    generator: Arc<StubGenerator>,
    single_flight: bool,
    hash_fields: HashFields,
) -> Harness {
    let weather = WeatherGateway::new(
        provider.clone(),
        Arc::new(CacheTier::new(
            "weather",
            CacheConfig::new()
                .with_ttl(WEATHER_TTL)
                .with_single_flight(single_flight),
        )),
        RetryPolicy::immediate(3),
    );
    let insights = InsightAdapter::new(
        generator.clone(),
        Arc::new(CacheTier::new(
            "insight",
            CacheConfig::new()
                .with_ttl(INSIGHT_TTL)
                .with_single_flight(single_flight),
        )),
        hash_fields,
    )
    .expect("insight schema compiles");

    Harness {
        pipeline: Arc::new(Pipeline::new(weather, insights)),
        provider,
        generator,
    }
}

pub fn default_harness() -> Harness {
    harness(
        StubProvider::new(london_payload()),
        StubGenerator::new(rainy_insight()),
    )
}
