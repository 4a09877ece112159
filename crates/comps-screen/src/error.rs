//! Error types for screening and multiples operations

use thiserror::Error;

/// Structural errors raised while screening or fetching provider data.
///
/// Per-metric extraction problems are not errors; see
/// [`MultipleFailure`](crate::multiples::MultipleFailure).
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Provider answered with a non-success HTTP status
    #[error("API error ({status}) from {endpoint}")]
    ApiError {
        endpoint: String,
        status: u16,
    },

    /// Provider answered but the payload could not be used
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Provider returned no data for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Frequency selector for financial statements is not recognized
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Symbol table supplied by the caller is malformed
    #[error("Invalid input table: {0}")]
    InvalidInput(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for screening operations
pub type Result<T> = std::result::Result<T, ScreenError>;

impl From<anyhow::Error> for ScreenError {
    fn from(err: anyhow::Error) -> Self {
        ScreenError::Other(err.to_string())
    }
}

impl From<url::ParseError> for ScreenError {
    fn from(err: url::ParseError) -> Self {
        ScreenError::ConfigError(format!("invalid URL: {err}"))
    }
}
