use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod open_weather;

pub use open_weather::OpenWeatherClient;

/// Looks up current conditions for a city and renders them as one line.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn fetch(&self, city: &str) -> crate::Result<String>;
}

/// Current conditions as reported by the provider, in metric units.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentWeather {
    /// City name as it was asked for
    pub city: String,
    /// Provider's condition text, e.g. "light rain"
    pub description: String,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Display for CurrentWeather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The weather in {}: {}, Temperature: {}°C, Humidity: {}%",
            self.city, self.description, self.temperature, self.humidity
        )
    }
}
