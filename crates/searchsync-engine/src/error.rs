//! Engine client error types.

use thiserror::Error;

/// Errors that can occur talking to the search engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the engine
    #[error("Engine returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    /// Request serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
