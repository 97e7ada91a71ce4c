//! Error types for the concierge coordination core

use thiserror::Error;

/// Result type alias for concierge operations
pub type ConciergeResult<T> = Result<T, ConciergeError>;

/// Errors that can occur while driving the interaction cycle
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("Dialog service error: {0}")]
    DialogService(String),

    #[error("Malformed dialog response: {0}")]
    MalformedResponse(String),

    #[error("Malformed perception feed: {0}")]
    MalformedFeed(String),

    #[error("Actuation error: {0}")]
    Actuation(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Estimated duration out of range: {0} s")]
    DurationOutOfRange(f64),

    #[error("Perception slot closed: {0}")]
    SlotClosed(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
