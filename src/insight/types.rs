use crate::error::ErrorContext;
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComfortLevel {
    Comfortable,
    Moderate,
    Uncomfortable,
}

impl fmt::Display for ComfortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComfortLevel::Comfortable => "comfortable",
            ComfortLevel::Moderate => "moderate",
            ComfortLevel::Uncomfortable => "uncomfortable",
        };
        f.write_str(s)
    }
}

/// Structured, human-readable reading of a weather observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WeatherInsight {
    /// One or two sentences describing the current conditions.
    #[schemars(length(min = 1))]
    summary: String,
    /// Practical advice for someone heading outside.
    #[schemars(length(min = 1))]
    recommendation: String,
    /// How pleasant the conditions feel.
    comfort_level: ComfortLevel,
    /// Whether rain or snow makes an umbrella worthwhile.
    should_bring_umbrella: bool,
}

impl WeatherInsight {
    pub fn new(
        summary: impl Into<String>,
        recommendation: impl Into<String>,
        comfort_level: ComfortLevel,
        should_bring_umbrella: bool,
    ) -> Result<Self> {
        let insight = Self {
            summary: summary.into(),
            recommendation: recommendation.into(),
            comfort_level,
            should_bring_umbrella,
        };
        insight.check_texts()?;
        Ok(insight)
    }

    pub(crate) fn check_texts(&self) -> Result<()> {
        for (field, text) in [
            ("summary", &self.summary),
            ("recommendation", &self.recommendation),
        ] {
            if text.trim().is_empty() {
                return Err(Error::invalid_insight_with_context(
                    format!("{} must not be empty", field),
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("insight_validator"),
                ));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn comfort_level(&self) -> ComfortLevel {
        self.comfort_level
    }

    pub fn should_bring_umbrella(&self) -> bool {
        self.should_bring_umbrella
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_serializes_lowercase_comfort_level() {
        let insight = WeatherInsight::new(
            "Mild and drizzly.",
            "Take a light jacket.",
            ComfortLevel::Moderate,
            true,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&insight).unwrap(),
            json!({
                "summary": "Mild and drizzly.",
                "recommendation": "Take a light jacket.",
                "comfort_level": "moderate",
                "should_bring_umbrella": true
            })
        );
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let err = WeatherInsight::new(" ", "ok", ComfortLevel::Comfortable, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInsight);
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("summary")
        );
    }

    #[test]
    fn test_unknown_fields_do_not_decode() {
        let value = json!({
            "summary": "s",
            "recommendation": "r",
            "comfort_level": "comfortable",
            "should_bring_umbrella": false,
            "mood": "great"
        });
        assert!(serde_json::from_value::<WeatherInsight>(value).is_err());
    }
}
