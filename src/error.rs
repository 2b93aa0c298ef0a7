// src/error.rs

//! Unified error handling for the clip harvester.

use thiserror::Error;

/// Result type alias for clipmine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Upstream returned a non-success status other than 429
    #[error("Upstream returned status {status} for {url}")]
    Upstream { status: u16, url: String },

    /// Rate-limit retries exhausted the attempt cap
    #[error("Rate limited, retry attempts exhausted for {url}")]
    RateLimited { url: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl AppError {
    /// Create an upstream-status error.
    pub fn upstream(status: u16, url: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            url: url.into(),
        }
    }

    /// Create a rate-limit exhaustion error.
    pub fn rate_limited(url: impl Into<String>) -> Self {
        Self::RateLimited { url: url.into() }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a snapshot error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }
}
