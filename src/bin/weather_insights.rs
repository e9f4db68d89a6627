//! weather-insights server
//!
//! Usage:
//!   weather-insights [--config <path>]    Serve the HTTP API
//!   weather-insights --version            Print the version
//!   weather-insights --help               Show this help message

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use weather_insights::config::Settings;
use weather_insights::pipeline::Pipeline;
use weather_insights::{server, telemetry};

enum Command {
    Serve { config: Option<PathBuf> },
    Version,
    Help,
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut config = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().context("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(Command::Serve { config })
}

fn print_usage() {
    println!(
        r#"weather-insights — current weather with LLM insights

USAGE:
    weather-insights [--config <path>]

OPTIONS:
    -c, --config <path>     YAML settings file (default: $WEATHER_INSIGHTS_CONFIG)
    -V, --version           Show version information
    -h, --help              Show this help message

ENVIRONMENT:
    OPENWEATHER_API_KEY     OpenWeatherMap API key
    OPENAI_API_KEY          OpenAI API key
    WEATHER_CACHE_TTL       Weather cache TTL in seconds (600)
    LLM_CACHE_TTL           Insight cache TTL in seconds (1800)
    BIND_ADDR               Listen address (0.0.0.0:8000)
    RUST_LOG                Log filter, overrides LOG_LEVEL"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args)? {
        Command::Serve { config } => config,
        Command::Version => {
            println!("weather-insights {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Help => {
            print_usage();
            return Ok(());
        }
    };

    let settings = Settings::load(config.as_deref()).context("failed to load settings")?;
    telemetry::init(&settings.logging)?;
    for key in settings.missing_keys() {
        warn!(key, "API key is not set; requests to this upstream will fail");
    }

    info!(
        weather_key = settings.openweather.api_key.is_some(),
        llm_key = settings.llm.api_key.is_some(),
        model = %settings.llm.model,
        weather_ttl_secs = settings.cache.weather_ttl_secs,
        insight_ttl_secs = settings.cache.insight_ttl_secs,
        "starting weather-insights"
    );

    let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
    let sweeper = pipeline.spawn_cache_sweeper(settings.sweep_interval());

    let result = server::serve(
        Arc::clone(&pipeline),
        settings.bind_addr()?,
        server::shutdown_signal(),
    )
    .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    result?;
    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert!(matches!(
            parse_args(&args(&[])).unwrap(),
            Command::Serve { config: None }
        ));
        match parse_args(&args(&["--config", "settings.yaml"])).unwrap() {
            Command::Serve { config } => assert_eq!(config, Some(PathBuf::from("settings.yaml"))),
            _ => panic!("expected serve"),
        }
        assert!(matches!(parse_args(&args(&["-V"])).unwrap(), Command::Version));
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["--port", "1"])).is_err());
    }
}
