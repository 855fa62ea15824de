//! Configuration management for the `skydash` server
//!
//! Settings are layered: built-in defaults, an optional TOML file,
//! `SKYDASH_*` environment overrides and finally the plain provider
//! variables (`OPEN_WEATHER_API_KEY`, `GEMINI_API_KEY`, ...) that the
//! dashboard has always been deployed with.

use crate::SkydashError;
use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Local configuration file picked up from the working directory.
const LOCAL_CONFIG_FILE: &str = "skydash.toml";

/// Root configuration structure for the `skydash` server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkydashConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Weather provider settings
    pub weather: WeatherConfig,
    /// Generative chat provider settings
    pub chat: ChatConfig,
    /// City catalog settings
    pub catalog: CatalogConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding `dashboard.html` and the browser scripts
    pub static_dir: String,
}

/// Weather provider (OpenWeatherMap) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// API key, also handed to the browser through `/api/config`
    pub api_key: Option<String>,
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Generative chat provider (Gemini) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Where the list of known cities comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSourceKind {
    /// Local CSV export (e.g. the simplemaps world cities file)
    #[default]
    Csv,
    /// GeoDB Cities API, paged
    GeoDb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub source: CatalogSourceKind,
    pub csv_path: String,
    /// CSV column holding the city display name
    pub column: String,
    pub geodb_base_url: String,
    pub geodb_api_key: Option<String>,
    /// Cities requested per GeoDB page
    pub page_size: u32,
    /// GeoDB request timeout in seconds
    pub timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_chat_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_chat_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    25
}

fn default_stop_sequences() -> Vec<String> {
    vec!["x".to_string()]
}

fn default_csv_path() -> String {
    "worldcities.csv".to_string()
}

fn default_csv_column() -> String {
    "city_ascii".to_string()
}

fn default_geodb_base_url() -> String {
    "https://wft-geo-db.p.rapidapi.com/v1/geo".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: 0.0,
            stop_sequences: default_stop_sequences(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: CatalogSourceKind::default(),
            csv_path: default_csv_path(),
            column: default_csv_column(),
            geodb_base_url: default_geodb_base_url(),
            geodb_api_key: None,
            page_size: default_page_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SkydashConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(config_path, None)
    }

    /// Load configuration reading environment variables from `env` instead
    /// of the process environment when it is given.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: Option<Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.or_else(|| {
            let local = PathBuf::from(LOCAL_CONFIG_FILE);
            if local.exists() {
                Some(local)
            } else {
                Self::get_config_path()
            }
        });

        if let Some(config_file) = config_file.filter(|path| path.exists()) {
            tracing::debug!("Using config file {}", config_file.display());
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SKYDASH_WEATHER__API_KEY style overrides. Values stay strings so
        // keys like "0123" survive; numeric fields are parsed on deserialize.
        builder = builder.add_source(
            Environment::with_prefix("SKYDASH")
                .prefix_separator("_")
                .separator("__")
                .source(env.clone()),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SkydashConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        match &env {
            Some(vars) => config.apply_env_fallbacks_from(|name| vars.get(name).cloned()),
            None => config.apply_env_fallbacks(),
        }
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skydash").join("config.toml"))
    }

    /// Pick up the plain provider variables from the process environment
    pub fn apply_env_fallbacks(&mut self) {
        self.apply_env_fallbacks_from(|name| std::env::var(name).ok());
    }

    /// Fill unset keys from `lookup`, and the port while it is still the
    /// built-in default. Values already set through the file or
    /// `SKYDASH_*` overrides take precedence.
    pub fn apply_env_fallbacks_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if self.weather.api_key.is_none() {
            self.weather.api_key = non_empty("OPEN_WEATHER_API_KEY");
        }
        if self.chat.api_key.is_none() {
            self.chat.api_key = non_empty("GEMINI_API_KEY");
        }
        if self.catalog.geodb_api_key.is_none() {
            self.catalog.geodb_api_key = non_empty("RAPIDAPI_API_KEY");
        }
        if self.server.port != default_port() {
            return;
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.port == 0 {
            self.server.port = default_port();
        }
        if self.server.static_dir.is_empty() {
            self.server.static_dir = default_static_dir();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_timeout();
        }
        if self.chat.base_url.is_empty() {
            self.chat.base_url = default_chat_base_url();
        }
        if self.chat.model.is_empty() {
            self.chat.model = default_chat_model();
        }
        if self.chat.max_output_tokens == 0 {
            self.chat.max_output_tokens = default_max_output_tokens();
        }
        if self.chat.timeout_seconds == 0 {
            self.chat.timeout_seconds = default_timeout();
        }
        if self.catalog.csv_path.is_empty() {
            self.catalog.csv_path = default_csv_path();
        }
        if self.catalog.column.is_empty() {
            self.catalog.column = default_csv_column();
        }
        if self.catalog.geodb_base_url.is_empty() {
            self.catalog.geodb_base_url = default_geodb_base_url();
        }
        if self.catalog.page_size == 0 {
            self.catalog.page_size = default_page_size();
        }
        if self.catalog.timeout_seconds == 0 {
            self.catalog.timeout_seconds = default_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Keys are optional at startup, but an explicitly empty key is a mistake.
    pub fn validate_api_keys(&self) -> Result<()> {
        let keys = [
            ("Weather", &self.weather.api_key),
            ("Chat", &self.chat.api_key),
            ("GeoDB", &self.catalog.geodb_api_key),
        ];

        for (name, key) in keys {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(SkydashError::config(format!(
                        "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SkydashError::config("Server port cannot be 0").into());
        }

        if self.weather.timeout_seconds > 300 {
            return Err(
                SkydashError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.chat.timeout_seconds > 300 {
            return Err(SkydashError::config("Chat API timeout cannot exceed 300 seconds").into());
        }

        if self.catalog.timeout_seconds > 300 {
            return Err(
                SkydashError::config("GeoDB API timeout cannot exceed 300 seconds").into(),
            );
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(
                SkydashError::config("Chat temperature must be between 0.0 and 2.0").into(),
            );
        }

        if !(1..=8192).contains(&self.chat.max_output_tokens) {
            return Err(
                SkydashError::config("Chat max output tokens must be between 1 and 8192").into(),
            );
        }

        if !(1..=100).contains(&self.catalog.page_size) {
            return Err(
                SkydashError::config("Catalog page size must be between 1 and 100").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SkydashError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SkydashError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Weather API", &self.weather.base_url),
            ("Chat API", &self.chat.base_url),
            ("GeoDB API", &self.catalog.geodb_base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SkydashError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
