//! Error types for the SportMonks client

use thiserror::Error;

/// Errors that can occur while talking to the SportMonks API
#[derive(Error, Debug)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid API key: {0}")]
    Unauthorized(String),

    #[error("insufficient plan permissions: {0}")]
    Forbidden(String),

    #[error("no content: {0}")]
    NotFound(String),

    #[error("request limit reached: {0}")]
    TooManyRequests(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no API key given and SPORTMONKS_KEY is not set")]
    MissingApiKey,

    #[error("response contained no data")]
    NoData,

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("response is not representable as a flat table")]
    NotTabular,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for SportMonks client operations
pub type Result<T> = std::result::Result<T, Error>;
