//! OpenWeatherMap current-weather client
//!
//! The provider reports failures in the body (`cod` / `message`), so the
//! body is decoded regardless of the HTTP status and `cod` decides success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{CurrentWeather, WeatherGateway};
use crate::SkydashError;
use crate::config::WeatherConfig;

const PROVIDER: &str = "OpenWeather";

/// OpenWeatherMap API client
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// `cod` is numeric on success and a string on most errors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseCode {
    Number(i64),
    Text(String),
}

impl ResponseCode {
    fn is_success(&self) -> bool {
        match self {
            ResponseCode::Number(code) => *code == 200,
            ResponseCode::Text(code) => code.trim() == "200",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    cod: Option<ResponseCode>,
    message: Option<Value>,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Option<MainReadings>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

impl WeatherResponse {
    fn into_current(self, city: &str) -> crate::Result<CurrentWeather> {
        if !self.cod.as_ref().is_some_and(ResponseCode::is_success) {
            let message = match self.message {
                Some(Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            return Err(SkydashError::provider(PROVIDER, message));
        }

        let description = self
            .weather
            .into_iter()
            .next()
            .map(|condition| condition.description)
            .ok_or_else(|| SkydashError::provider(PROVIDER, "response without weather conditions"))?;
        let main = self
            .main
            .ok_or_else(|| SkydashError::provider(PROVIDER, "response without main readings"))?;

        Ok(CurrentWeather {
            city: city.to_string(),
            description,
            temperature: main.temp,
            humidity: main.humidity,
        })
    }
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("skydash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkydashError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }

    /// Current conditions for `city`, in metric units.
    #[instrument(skip(self))]
    pub async fn current_weather(&self, city: &str) -> crate::Result<CurrentWeather> {
        let url = format!("{}/weather", self.base_url);
        debug!("OpenWeather request: {}?q={}&units=metric", url, city);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| SkydashError::provider(PROVIDER, format!("request failed: {e}")))?;

        let status = response.status();
        let body: WeatherResponse = response.json().await.map_err(|e| {
            SkydashError::provider(
                PROVIDER,
                format!("failed to parse response (HTTP {status}): {e}"),
            )
        })?;

        body.into_current(city).inspect_err(|e| {
            warn!("Weather lookup for '{}' failed: {}", city, e);
        })
    }
}

#[async_trait]
impl WeatherGateway for OpenWeatherClient {
    async fn fetch(&self, city: &str) -> crate::Result<String> {
        Ok(self.current_weather(city).await?.to_string())
    }
}
