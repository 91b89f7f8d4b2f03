//! Error types for the BlockDAG visualization server.

use thiserror::Error;

/// A specialized `Result` type for visualization server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `bdag_viz` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to the web server (e.g., binding to a port).
    #[error("Server error: {0}")]
    Server(String),

    /// An error related to WebSocket communication.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request to the upstream network explorer failed or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// A requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller supplied a value the dashboard does not understand.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error related to the server's configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Network(format!("request timed out: {}", e))
        } else {
            Error::Network(e.to_string())
        }
    }
}
