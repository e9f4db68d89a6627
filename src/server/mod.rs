//! # HTTP surface
//!
//! | Route | Answer |
//! |-------|--------|
//! | `GET /weather?city=&units=` | [`WeatherInsightResponse`](crate::pipeline::WeatherInsightResponse) |
//! | `GET /health` | `{"status": "healthy", "service": "weather-insights"}` |
//! | `GET /cache/stats` | `{"weather_cache": {size, keys}, "insight_cache": {size, keys}}` |
//!
//! Failures are answered with `{"detail", "code", "status_code"}` and the
//! status of their [`ErrorKind`](crate::error_code::ErrorKind). Malformed
//! queries and blank cities get a 400.
//!
//! Every route answers cross-origin `GET`s from any origin.

mod error;
mod handlers;

pub use error::{codes, ApiError, ApiErrorBody};
pub use handlers::{HealthResponse, WeatherQuery, SERVICE_NAME};

use crate::pipeline::Pipeline;
use crate::Result;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/weather", get(handlers::get_weather))
        .route("/health", get(handlers::health))
        .route("/cache/stats", get(handlers::cache_stats))
        .layer(cors())
        .with_state(AppState { pipeline })
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Serve until `shutdown` resolves, then clear both caches.
pub async fn serve(
    pipeline: Arc<Pipeline>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(Arc::clone(&pipeline)))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    pipeline.clear_caches();
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
