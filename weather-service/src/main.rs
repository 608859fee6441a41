use axum::{
    Router,
    routing::{delete, get, post},
};
use common::tracing::init_tracing_pretty;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use weather_service::api_client::OpenWeatherClient;
use weather_service::cache::FastCache;
use weather_service::config::Config;
use weather_service::db::{self, PgRecordStore};
use weather_service::handlers::{self, AppState};
use weather_service::openapi;
use weather_service::service::WeatherService;
use weather_service::staleness::StalenessPolicy;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing_pretty();

    let config = Config::from_env();
    let pool = db::create_pool(&config.database_url).await?;
    let store = PgRecordStore::new(pool);

    let provider = Arc::new(OpenWeatherClient::new(
        config.openweather_base_url.clone(),
        config.openweather_api_key.clone(),
        config.request_timeout_secs,
        config.max_retries,
    ));

    let weather = Arc::new(WeatherService::new(
        store.clone(),
        provider,
        FastCache::with_ttl(config.cache_ttl_seconds),
        FastCache::with_ttl(config.cache_ttl_seconds),
        StalenessPolicy::new(config.staleness_window_secs),
    ));

    let state = AppState { store, weather };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Weather service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Weather service stopped");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/cities", get(handlers::list_cities))
        .route("/api/cities", post(handlers::register_city))
        .route("/api/cities/{id}", delete(handlers::delete_city))
        .route("/api/cities/{id}/weather", get(handlers::get_weather))
        .route("/api/cities/{id}/forecast", get(handlers::get_forecast))
        .route("/api/weather", get(handlers::list_weather))
        .route("/api/forecast", get(handlers::list_forecasts))
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    warn!("Shutting down gracefully...");
}
