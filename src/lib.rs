//! `skydash` - weather dashboard server
//!
//! Serves the dashboard page, hands the browser its weather API key and
//! answers chat messages, either with a weather summary for a recognized
//! city or with a short reply from a generative model.

pub mod api;
pub mod catalog;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod error;
pub mod router;
pub mod telemetry;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use catalog::{CatalogHandle, CityCatalog, CitySource};
pub use chat::{ChatGateway, GeminiClient};
pub use classifier::{extract_city, is_weather_intent};
pub use crate::config::SkydashConfig;
pub use error::SkydashError;
pub use router::{ChatRouter, Route};
pub use weather::{OpenWeatherClient, WeatherGateway};
pub use web::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkydashError>;
