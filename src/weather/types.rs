use crate::cache::normalize_city;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unit system forwarded verbatim to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Celsius, metres per second.
    #[default]
    Metric,
    /// Fahrenheit, miles per hour.
    Imperial,
    /// Kelvin, metres per second.
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            other => Err(format!(
                "unknown units '{}', expected metric, imperial or standard",
                other
            )),
        }
    }
}

/// A weather observation that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid weather record: {field} {reason}")]
pub struct InvalidRecord {
    pub field: &'static str,
    pub reason: String,
}

impl InvalidRecord {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validated current-weather observation for one city.
///
/// Fields are private; construct through [`WeatherRecord::builder`]. Two
/// records are equal when every field matches, with the city compared
/// through [`normalize_city`], the same form the cache keys use.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    city: String,
    temperature: f64,
    feels_like: f64,
    humidity: u8,
    description: String,
    wind_speed: f64,
    timestamp: i64,
}

impl WeatherRecord {
    pub fn builder() -> WeatherRecordBuilder {
        WeatherRecordBuilder::default()
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn feels_like(&self) -> f64 {
        self.feels_like
    }

    /// Relative humidity, 0-100.
    pub fn humidity(&self) -> u8 {
        self.humidity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn wind_speed(&self) -> f64 {
        self.wind_speed
    }

    /// Observation time, seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl PartialEq for WeatherRecord {
    fn eq(&self, other: &Self) -> bool {
        normalize_city(&self.city) == normalize_city(&other.city)
            && self.temperature == other.temperature
            && self.feels_like == other.feels_like
            && self.humidity == other.humidity
            && self.description == other.description
            && self.wind_speed == other.wind_speed
            && self.timestamp == other.timestamp
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeatherRecordBuilder {
    city: Option<String>,
    temperature: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<i64>,
    description: Option<String>,
    wind_speed: Option<f64>,
    timestamp: Option<i64>,
}

impl WeatherRecordBuilder {
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn feels_like(mut self, feels_like: f64) -> Self {
        self.feels_like = Some(feels_like);
        self
    }

    /// Accepts any integer so out-of-range provider values are reported, not truncated.
    pub fn humidity(mut self, humidity: impl Into<i64>) -> Self {
        self.humidity = Some(humidity.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn wind_speed(mut self, wind_speed: f64) -> Self {
        self.wind_speed = Some(wind_speed);
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Result<WeatherRecord, InvalidRecord> {
        let city = self
            .city
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| InvalidRecord::new("city", "is required"))?;
        let temperature = finite("temperature", self.temperature)?;
        let feels_like = finite("feels_like", self.feels_like)?;

        let humidity = self
            .humidity
            .ok_or_else(|| InvalidRecord::new("humidity", "is required"))?;
        let humidity = u8::try_from(humidity)
            .ok()
            .filter(|h| *h <= 100)
            .ok_or_else(|| {
                InvalidRecord::new("humidity", format!("must be within 0-100, got {}", humidity))
            })?;

        let description = self
            .description
            .ok_or_else(|| InvalidRecord::new("description", "is required"))?;

        let wind_speed = finite("wind_speed", self.wind_speed)?;
        if wind_speed < 0.0 {
            return Err(InvalidRecord::new(
                "wind_speed",
                format!("must be non-negative, got {}", wind_speed),
            ));
        }

        let timestamp = self
            .timestamp
            .ok_or_else(|| InvalidRecord::new("timestamp", "is required"))?;

        Ok(WeatherRecord {
            city,
            temperature,
            feels_like,
            humidity,
            description,
            wind_speed,
            timestamp,
        })
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, InvalidRecord> {
    match value {
        None => Err(InvalidRecord::new(field, "is required")),
        Some(v) if !v.is_finite() => Err(InvalidRecord::new(field, "must be finite")),
        Some(v) => Ok(v),
    }
}

/// What the weather gateway caches: the record plus the country code,
/// which the response needs but the insight key must not see.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub record: WeatherRecord,
    pub country: String,
}

/// Current-weather payload as the provider returns it. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderWeather {
    pub name: String,
    #[serde(default)]
    pub sys: ProviderSys,
    pub main: ProviderMain,
    #[serde(default)]
    pub weather: Vec<ProviderCondition>,
    pub wind: ProviderWind,
    pub dt: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSys {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCondition {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderWind {
    pub speed: f64,
}

impl TryFrom<ProviderWeather> for CurrentWeather {
    type Error = InvalidRecord;

    fn try_from(payload: ProviderWeather) -> Result<Self, Self::Error> {
        let description = payload
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| InvalidRecord::new("description", "missing from provider payload"))?;

        let record = WeatherRecord::builder()
            .city(payload.name)
            .temperature(payload.main.temp)
            .feels_like(payload.main.feels_like)
            .humidity(payload.main.humidity)
            .description(description)
            .wind_speed(payload.wind.speed)
            .timestamp(payload.dt)
            .build()?;

        Ok(CurrentWeather {
            record,
            country: payload.sys.country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "coord": {"lon": -0.13, "lat": 51.51},
        "name": "London",
        "sys": {"country": "GB"},
        "main": {"temp": 15.2, "feels_like": 13.8, "humidity": 75, "pressure": 1012},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
        "wind": {"speed": 5.5, "deg": 230},
        "dt": 1234567890
    }"#;

    fn base() -> WeatherRecordBuilder {
        WeatherRecord::builder()
            .city("London")
            .temperature(15.2)
            .feels_like(13.8)
            .humidity(75)
            .description("light rain")
            .wind_speed(5.5)
            .timestamp(1234567890)
    }

    #[test]
    fn test_units_parse_and_display() {
        assert_eq!("metric".parse::<Units>().unwrap(), Units::Metric);
        assert_eq!("Imperial".parse::<Units>().unwrap(), Units::Imperial);
        assert_eq!(Units::Standard.to_string(), "standard");
        assert_eq!(Units::default(), Units::Metric);
        assert!("kelvin".parse::<Units>().is_err());
    }

    #[test]
    fn test_provider_payload_converts() {
        let payload: ProviderWeather = serde_json::from_str(LONDON).unwrap();
        let current = CurrentWeather::try_from(payload).unwrap();

        assert_eq!(current.country, "GB");
        assert_eq!(current.record, base().build().unwrap());
        assert_eq!(current.record.description(), "light rain");
        assert_eq!(current.record.humidity(), 75);
    }

    #[test]
    fn test_missing_conditions_is_rejected() {
        let mut payload: ProviderWeather = serde_json::from_str(LONDON).unwrap();
        payload.weather.clear();
        let err = CurrentWeather::try_from(payload).unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn test_record_validation() {
        assert_eq!(base().city("  ").build().unwrap_err().field, "city");
        assert_eq!(base().humidity(101).build().unwrap_err().field, "humidity");
        assert_eq!(base().humidity(-1).build().unwrap_err().field, "humidity");
        assert_eq!(base().wind_speed(-0.5).build().unwrap_err().field, "wind_speed");
        assert_eq!(
            base().temperature(f64::NAN).build().unwrap_err().field,
            "temperature"
        );
        assert!(base().humidity(0).wind_speed(0.0).build().is_ok());
        assert!(base().humidity(100).build().is_ok());
    }

    #[test]
    fn test_city_comparison_ignores_case() {
        let a = base().build().unwrap();
        let b = base().city("LONDON").build().unwrap();
        let c = base().timestamp(1).build().unwrap();
        assert_eq!(a, b);
        assert_eq!(b.city(), "LONDON");
        assert_ne!(a, c);
    }

    #[test]
    fn test_equal_records_share_insight_key() {
        use crate::cache::{CacheKey, HashFields};

        let a = base().build().unwrap();
        let b = base().city(" london ").build().unwrap();
        assert_eq!(a, b);
        assert_eq!(
            CacheKey::insight(&a, HashFields::All),
            CacheKey::insight(&b, HashFields::All)
        );
    }
}
