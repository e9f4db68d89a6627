//! Tracing subscriber installation.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` overrides `logging.level` when set.

use crate::config::{LogFormat, LoggingSettings};
use crate::error::ErrorContext;
use crate::{Error, Result};
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global subscriber. Fails if one is already installed.
pub fn init(logging: &LoggingSettings) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level_filter()?.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| {
            Error::configuration_with_context(
                format!("failed to install tracing subscriber: {}", e),
                ErrorContext::new().with_source("telemetry"),
            )
        })
}
