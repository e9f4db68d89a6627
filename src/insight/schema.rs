//! JSON schema of [`WeatherInsight`] and validation of generator output against it.

use super::types::WeatherInsight;
use crate::error::ErrorContext;
use crate::{Error, Result};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use schemars::gen::SchemaSettings;
use serde_json::Value;

static INSIGHT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<WeatherInsight>();
    serde_json::to_value(schema).unwrap_or(Value::Null)
});

/// Draft-07 schema derived from the `WeatherInsight` type.
pub fn insight_schema() -> &'static Value {
    &INSIGHT_SCHEMA
}

/// The schema in the subset accepted by strict structured-output endpoints:
/// no `$schema`, no length constraints.
pub fn response_format_schema() -> Value {
    let mut schema = insight_schema().clone();
    strip_keywords(&mut schema, &["$schema", "minLength"]);
    schema
}

fn strip_keywords(value: &mut Value, keywords: &[&str]) {
    match value {
        Value::Object(map) => {
            for k in keywords {
                map.remove(*k);
            }
            for v in map.values_mut() {
                strip_keywords(v, keywords);
            }
        }
        Value::Array(items) => {
            for v in items {
                strip_keywords(v, keywords);
            }
        }
        _ => {}
    }
}

/// Compiled insight schema.
pub struct InsightValidator {
    schema: JSONSchema,
}

impl InsightValidator {
    pub fn new() -> Result<Self> {
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(insight_schema())
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to compile insight schema: {}", e),
                    ErrorContext::new().with_source("insight_schema"),
                )
            })?;
        Ok(Self { schema })
    }

    /// Check `value` against the schema, then decode it.
    pub fn validate(&self, value: &Value) -> Result<WeatherInsight> {
        if let Err(errors) = self.schema.validate(value) {
            let mut field_path = None;
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if field_path.is_none() && !path.is_empty() {
                        field_path = Some(path.trim_start_matches('/').replace('/', "."));
                    }
                    e.to_string()
                })
                .collect();

            let mut context = ErrorContext::new()
                .with_details(messages.join("; "))
                .with_source("insight_validator");
            if let Some(path) = field_path {
                context = context.with_field_path(path);
            }
            return Err(Error::invalid_insight_with_context(
                "generator output does not match the insight schema",
                context,
            ));
        }

        let insight: WeatherInsight = serde_json::from_value(value.clone()).map_err(|e| {
            Error::invalid_insight_with_context(
                format!("could not decode insight: {}", e),
                ErrorContext::new().with_source("insight_validator"),
            )
        })?;
        insight.check_texts()?;
        Ok(insight)
    }
}
