use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::catalog::{self, CatalogHandle};
use crate::chat::GeminiClient;
use crate::config::SkydashConfig;
use crate::router::ChatRouter;
use crate::weather::OpenWeatherClient;

/// Page served at `/`.
pub const DASHBOARD_PAGE: &str = "dashboard.html";

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatRouter,
    pub catalog: CatalogHandle,
    pub weather_api_key: Arc<str>,
}

impl AppState {
    pub fn new(chat: ChatRouter, catalog: CatalogHandle, weather_api_key: &str) -> Self {
        Self {
            chat,
            catalog,
            weather_api_key: Arc::from(weather_api_key),
        }
    }
}

/// The full HTTP application: API routes plus the static dashboard.
pub fn app(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let static_dir = static_dir.as_ref();
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join(DASHBOARD_PAGE)))
        .merge(api::router())
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(config: SkydashConfig) -> Result<()> {
    if config.weather.api_key.is_none() {
        tracing::warn!("No weather API key configured, weather lookups will fail");
    }
    if config.chat.api_key.is_none() {
        tracing::warn!("No chat API key configured, chat replies will fail");
    }

    let weather = OpenWeatherClient::new(&config.weather)?;
    let chat = GeminiClient::new(&config.chat)?;
    let router = ChatRouter::new(Arc::new(weather), Arc::new(chat));

    let cities = CatalogHandle::new();
    let source = catalog::source_from_config(&config.catalog)?;
    catalog::spawn_load(cities.clone(), source);

    let state = AppState::new(
        router,
        cities,
        config.weather.api_key.as_deref().unwrap_or_default(),
    );
    let app = app(state, &config.server.static_dir);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running on port {}", config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
