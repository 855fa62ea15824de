//! Error types and handling for the `skydash` server

use thiserror::Error;

/// Message returned to the browser whenever a chat interaction fails.
pub const CHAT_FAILURE_MESSAGE: &str = "Error during chat interaction.";

/// Main error type for the `skydash` server
#[derive(Error, Debug)]
pub enum SkydashError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// City catalog could not be (fully) loaded
    #[error("Catalog load error: {message}")]
    CatalogLoad { message: String },

    /// Upstream provider call failed or answered with a non-success code
    #[error("{provider} provider error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SkydashError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new catalog load error
    pub fn catalog_load<S: Into<String>>(message: S) -> Self {
        Self::CatalogLoad {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(provider: &'static str, message: S) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SkydashError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            SkydashError::CatalogLoad { .. } => {
                "City list unavailable. Weather lookups may not recognize your city.".to_string()
            }
            SkydashError::Provider { .. } => CHAT_FAILURE_MESSAGE.to_string(),
            SkydashError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
