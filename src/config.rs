//! Runtime settings.
//!
//! Resolved in layers, later layers winning:
//!
//! 1. built-in defaults,
//! 2. an optional YAML file (`--config <path>` or `WEATHER_INSIGHTS_CONFIG`),
//! 3. environment variables, either the flat names in [`ENV_OVERRIDES`]
//!    (`OPENWEATHER_API_KEY`, `WEATHER_CACHE_TTL`, ...) or nested ones such
//!    as `WEATHER_INSIGHTS__CACHE__MAX_ENTRIES`.
//!
//! API keys that are still unset afterwards are looked up in the OS keyring
//! under the `weather-insights` service.
//!
//! ```yaml
//! openweather:
//!   base_url: https://api.openweathermap.org/data/2.5
//! llm:
//!   model: gpt-4o-mini
//! cache:
//!   weather_ttl_secs: 600
//!   insight_ttl_secs: 1800
//! logging:
//!   level: debug
//!   format: json
//! ```

use crate::cache::{CacheConfig, HashFields};
use crate::error::ErrorContext;
use crate::insight::{self, OpenAiConfig};
use crate::resilience::{self, RetryPolicy};
use crate::weather::{self, OpenWeatherConfig};
use crate::{Error, Result};
use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const CONFIG_PATH_ENV: &str = "WEATHER_INSIGHTS_CONFIG";
pub const ENV_PREFIX: &str = "WEATHER_INSIGHTS";
pub const KEYRING_SERVICE: &str = "weather-insights";

/// Flat environment names and the settings keys they override.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("OPENWEATHER_API_KEY", "openweather.api_key"),
    ("OPENWEATHER_BASE_URL", "openweather.base_url"),
    ("OPENAI_API_KEY", "llm.api_key"),
    ("OPENAI_BASE_URL", "llm.base_url"),
    ("OPENAI_MODEL", "llm.model"),
    ("LLM_MAX_ATTEMPTS", "llm.max_attempts"),
    ("HTTP_TIMEOUT_SECS", "http.timeout_secs"),
    ("WEATHER_CACHE_TTL", "cache.weather_ttl_secs"),
    ("LLM_CACHE_TTL", "cache.insight_ttl_secs"),
    ("CACHE_MAX_ENTRIES", "cache.max_entries"),
    ("CACHE_SWEEP_INTERVAL_SECS", "cache.sweep_interval_secs"),
    ("CACHE_SINGLE_FLIGHT", "cache.single_flight"),
    ("INSIGHT_KEY_IGNORES_TIMESTAMP", "cache.insight_key_ignores_timestamp"),
    ("RETRY_MAX_ATTEMPTS", "retry.max_attempts"),
    ("RETRY_MIN_DELAY_MS", "retry.min_delay_ms"),
    ("RETRY_MAX_DELAY_MS", "retry.max_delay_ms"),
    ("BIND_ADDR", "server.bind_addr"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openweather: OpenWeatherSettings,
    pub llm: LlmSettings,
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherSettings {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for OpenWeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: weather::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_attempts: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: insight::DEFAULT_BASE_URL.to_string(),
            model: insight::DEFAULT_MODEL.to_string(),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub weather_ttl_secs: u64,
    pub insight_ttl_secs: u64,
    /// Per-tier entry bound; 0 means unbounded.
    pub max_entries: usize,
    /// 0 disables the background sweep.
    pub sweep_interval_secs: u64,
    pub single_flight: bool,
    pub insight_key_ignores_timestamp: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            weather_ttl_secs: 600,
            insight_ttl_secs: 1800,
            max_entries: 10_000,
            sweep_interval_secs: 60,
            single_flight: true,
            insight_key_ignores_timestamp: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: resilience::DEFAULT_MAX_ATTEMPTS,
            min_delay_ms: resilience::DEFAULT_MIN_DELAY_MS,
            max_delay_ms: resilience::DEFAULT_MAX_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` still takes precedence at runtime.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingSettings {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(self.level.trim()).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid log level '{}': {}", self.level, e),
                ErrorContext::new().with_field_path("logging.level"),
            )
        })
    }
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("settings"),
    )
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn build_error(err: ConfigError, path: Option<&Path>) -> Error {
    let mut context = ErrorContext::new().with_source("settings");
    if let Some(path) = path {
        context = context.with_details(path.display().to_string());
    }
    Error::configuration_with_context(format!("invalid settings: {}", err), context)
}

impl Settings {
    /// Load from the optional file, the process environment and the keyring, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env: Map<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let mut settings = Self::from_sources(path, &env)?;
        settings.resolve_keys_from_keyring();
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults, then the YAML file, then `env`. Neither the keyring nor
    /// validation is involved.
    ///
    /// `path` falls back to `WEATHER_INSIGHTS_CONFIG` in `env`. Besides the
    /// flat names in [`ENV_OVERRIDES`], any field can be set through a nested
    /// `WEATHER_INSIGHTS__<SECTION>__<FIELD>` variable; the flat names win.
    pub fn from_sources(path: Option<&Path>, env: &Map<String, String>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(|| {
            env.get(CONFIG_PATH_ENV)
                .and_then(|p| non_blank(p))
                .map(PathBuf::from)
        });

        let mut builder = Config::builder();
        if let Some(path) = path.as_ref() {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Yaml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .source(Some(env.clone())),
        );
        for (var, key) in ENV_OVERRIDES {
            let value = env.get(*var).and_then(|v| non_blank(v));
            builder = builder
                .set_override_option(*key, value)
                .map_err(|e| build_error(e, None))?;
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| build_error(e, path.as_deref()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| build_error(e, None))
    }

    /// Fill API keys still missing from the OS keyring. Failures are silent.
    pub fn resolve_keys_from_keyring(&mut self) {
        if self.openweather.api_key.is_none() {
            self.openweather.api_key = keyring_password("openweather");
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = keyring_password("openai");
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("openweather.base_url", &self.openweather.base_url),
            ("llm.base_url", &self.llm.base_url),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| invalid(field, format!("'{}' is not a valid URL: {}", value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(field, format!("'{}' must be http or https", value)));
            }
        }

        for (field, value) in [
            ("http.timeout_secs", self.http.timeout_secs),
            ("cache.weather_ttl_secs", self.cache.weather_ttl_secs),
            ("cache.insight_ttl_secs", self.cache.insight_ttl_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be positive"));
            }
        }
        for (field, value) in [
            ("llm.max_attempts", self.llm.max_attempts),
            ("retry.max_attempts", self.retry.max_attempts),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(invalid(
                "retry.min_delay_ms",
                format!(
                    "must not exceed retry.max_delay_ms ({} > {})",
                    self.retry.min_delay_ms, self.retry.max_delay_ms
                ),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }
        self.bind_addr()?;
        self.logging.level_filter()?;
        Ok(())
    }

    /// Environment names of the API keys that are still unset.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openweather.api_key.is_none() {
            missing.push("OPENWEATHER_API_KEY");
        }
        if self.llm.api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        missing
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.parse().map_err(|e| {
            invalid(
                "server.bind_addr",
                format!("'{}' is not a socket address: {}", self.server.bind_addr, e),
            )
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.min_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    fn cache_config(&self, ttl_secs: u64) -> CacheConfig {
        CacheConfig::new()
            .with_ttl(Duration::from_secs(ttl_secs))
            .with_max_entries((self.cache.max_entries > 0).then_some(self.cache.max_entries))
            .with_single_flight(self.cache.single_flight)
    }

    pub fn weather_cache_config(&self) -> CacheConfig {
        self.cache_config(self.cache.weather_ttl_secs)
    }

    pub fn insight_cache_config(&self) -> CacheConfig {
        self.cache_config(self.cache.insight_ttl_secs)
    }

    pub fn hash_fields(&self) -> HashFields {
        if self.cache.insight_key_ignores_timestamp {
            HashFields::IgnoreTimestamp
        } else {
            HashFields::All
        }
    }

    pub fn openweather_config(&self) -> OpenWeatherConfig {
        OpenWeatherConfig {
            base_url: self.openweather.base_url.clone(),
            api_key: self.openweather.api_key.clone(),
            timeout: self.http_timeout(),
        }
    }

    /// The generator's own retry budget: `llm.max_attempts` on the shared backoff schedule.
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            timeout: self.http_timeout(),
            retry: RetryPolicy::new(
                self.llm.max_attempts,
                Duration::from_millis(self.retry.min_delay_ms),
                Duration::from_millis(self.retry.max_delay_ms),
            ),
        }
    }
}

fn keyring_password(user: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, user)
        .ok()
        .and_then(|entry| entry.get_password().ok())
        .and_then(|p| non_blank(&p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;

    fn env(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn yaml_file(text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("weather-insights-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn field_path(err: &Error) -> Option<&str> {
        err.context().and_then(|c| c.field_path.as_deref())
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.cache.weather_ttl_secs, 600);
        assert_eq!(s.cache.insight_ttl_secs, 1800);
        assert_eq!(s.llm.model, "gpt-4o-mini");
        assert_eq!(s.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(s.hash_fields(), HashFields::All);
        assert_eq!(s.retry_policy(), RetryPolicy::default());
        assert!(s.validate().is_ok());

        let layered = Settings::from_sources(None, &env(&[("PATH", "/usr/bin")])).unwrap();
        assert_eq!(layered, s);
    }

    #[test]
    fn test_env_overrides_yaml() {
        let path = yaml_file(
            "cache:\n  weather_ttl_secs: 120\n  insight_ttl_secs: 240\nllm:\n  model: gpt-4o\n",
        );
        let s = Settings::from_sources(
            None,
            &env(&[
                (CONFIG_PATH_ENV, path.to_str().unwrap()),
                ("WEATHER_CACHE_TTL", "60"),
                ("OPENWEATHER_API_KEY", " abc "),
                ("OPENAI_API_KEY", ""),
                ("INSIGHT_KEY_IGNORES_TIMESTAMP", "true"),
                ("LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(s.cache.weather_ttl_secs, 60);
        assert_eq!(s.cache.insight_ttl_secs, 240);
        assert_eq!(s.llm.model, "gpt-4o");
        // Sections and fields not in the file keep their defaults.
        assert_eq!(s.cache.max_entries, 10_000);
        assert_eq!(s.http.timeout_secs, 10);
        assert_eq!(s.openweather.api_key.as_deref(), Some("abc"));
        assert!(s.llm.api_key.is_none());
        assert_eq!(s.hash_fields(), HashFields::IgnoreTimestamp);
        assert_eq!(s.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_nested_env_and_flat_precedence() {
        let s = Settings::from_sources(
            None,
            &env(&[
                ("WEATHER_INSIGHTS__CACHE__MAX_ENTRIES", "5"),
                ("WEATHER_INSIGHTS__SERVER__BIND_ADDR", "127.0.0.1:9000"),
                ("BIND_ADDR", "127.0.0.1:9100"),
            ]),
        )
        .unwrap();
        assert_eq!(s.cache.max_entries, 5);
        assert_eq!(s.server.bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn test_unparseable_env_is_configuration_error() {
        let err = Settings::from_sources(None, &env(&[("LLM_CACHE_TTL", "soon")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Misconfigured);
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let path = Path::new("/nonexistent/weather-insights.yaml");
        let err = Settings::from_sources(Some(path), &Map::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.context().and_then(|c| c.details.as_deref()),
            Some("/nonexistent/weather-insights.yaml")
        );
    }

    #[test]
    fn test_missing_keys_are_reported() {
        let mut s = Settings::default();
        assert_eq!(s.missing_keys(), vec!["OPENWEATHER_API_KEY", "OPENAI_API_KEY"]);
        // Missing keys are a warning at start-up, not a validation failure.
        assert!(s.validate().is_ok());

        s.openweather.api_key = Some("abc".into());
        assert_eq!(s.missing_keys(), vec!["OPENAI_API_KEY"]);
    }

    #[test]
    fn test_validation_failures() {
        let mut s = Settings::default();
        s.cache.weather_ttl_secs = 0;
        assert_eq!(
            field_path(&s.validate().unwrap_err()),
            Some("cache.weather_ttl_secs")
        );

        let mut s = Settings::default();
        s.openweather.base_url = "not a url".into();
        assert_eq!(
            field_path(&s.validate().unwrap_err()),
            Some("openweather.base_url")
        );

        let mut s = Settings::default();
        s.retry.min_delay_ms = 5_000;
        assert_eq!(
            field_path(&s.validate().unwrap_err()),
            Some("retry.min_delay_ms")
        );

        let mut s = Settings::default();
        s.server.bind_addr = "localhost".into();
        assert_eq!(
            field_path(&s.validate().unwrap_err()),
            Some("server.bind_addr")
        );

        let mut s = Settings::default();
        s.logging.level = "chatty".into();
        assert_eq!(field_path(&s.validate().unwrap_err()), Some("logging.level"));
    }

    #[test]
    fn test_zero_max_entries_is_unbounded() {
        let mut s = Settings::default();
        s.cache.max_entries = 0;
        assert_eq!(s.weather_cache_config().max_entries, None);
        assert_eq!(
            s.insight_cache_config().ttl,
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn test_bad_yaml_is_configuration_error() {
        let err = Settings::from_yaml_str("cache: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
