//! Cache key generation.

use crate::weather::{Units, WeatherRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters of the SHA-256 digest kept in insight keys.
const HASH_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `weather:{normalized_city}:{units}`
    pub fn weather(city: &str, units: Units) -> Self {
        Self(format!("weather:{}:{}", normalize_city(city), units))
    }

    /// `insight:{normalized_city}:{stable_hash}`
    pub fn insight(record: &WeatherRecord, fields: HashFields) -> Self {
        Self(format!(
            "insight:{}:{}",
            normalize_city(record.city()),
            stable_hash(record, fields)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Which record fields feed the insight hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFields {
    /// Every field, including the observation timestamp.
    #[default]
    All,
    /// Every field except the observation timestamp, so a refetch that only
    /// moved the clock still hits the cached insight.
    IgnoreTimestamp,
}

/// Lowercased, trimmed city name used inside keys.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Deterministic structural hash of a weather record.
///
/// Fields are fed in a fixed order, each prefixed by its name and terminated
/// by a NUL byte. Floats go in by bit pattern with `-0.0` folded onto `0.0`,
/// so field-wise equal records hash identically across runs.
pub fn stable_hash(record: &WeatherRecord, fields: HashFields) -> String {
    let mut hasher = Sha256::new();
    let mut put = |name: &str, value: &[u8]| {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value);
        hasher.update([0u8]);
    };

    put("city", normalize_city(record.city()).as_bytes());
    put("temperature", &float_bytes(record.temperature()));
    put("feels_like", &float_bytes(record.feels_like()));
    put("humidity", &[record.humidity()]);
    put("description", record.description().as_bytes());
    put("wind_speed", &float_bytes(record.wind_speed()));
    if fields == HashFields::All {
        put("timestamp", &record.timestamp().to_be_bytes());
    }

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .take(HASH_LEN / 2)
        .collect()
}

fn float_bytes(v: f64) -> [u8; 8] {
    let v = if v == 0.0 { 0.0 } else { v };
    v.to_bits().to_be_bytes()
}
