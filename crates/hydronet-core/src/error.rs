use std::time::Duration;
use thiserror::Error;

/// A convenience `Result` alias using [`HydroNetError`].
pub type HydroNetResult<T> = Result<T, HydroNetError>;

/// Top-level error type for the HydroNet client.
///
/// Stream failures fall into three kinds that callers may want to tell
/// apart: the transport broke ([`HydroNetError::Http`]), a `data:` payload
/// was not JSON ([`HydroNetError::Decode`]), or the server reported an error
/// event ([`HydroNetError::Server`]). None of them are retried internally.
#[derive(Error, Debug)]
pub enum HydroNetError {
    /// The request could not be sent, or reading the response body failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status code.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// A `data:` line carried a payload that is not valid JSON.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The stream delivered an `error` event.
    #[error("{0}")]
    Server(String),

    /// A chat turn did not finish within the configured limit.
    #[error("Chat turn timed out after {0:?}")]
    Timeout(Duration),

    /// The caller supplied an argument the client refuses to send.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read or failed validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HydroNetError {
    /// Human-readable cause carried by a server `error` event, if this is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server(message) => Some(message),
            _ => None,
        }
    }
}
