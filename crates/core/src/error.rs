use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The DevTools discovery endpoint was unreachable or returned
    /// malformed data.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// No target matched the resolution criteria.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The WebSocket connect failed or the session is closed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No matching response arrived within the timeout or frame bound.
    /// Carries the method name that was waiting.
    #[error("Timeout waiting for response to {0}")]
    Timeout(String),

    /// The remote end answered the command with an error payload.
    #[error("Protocol error for {method}: {payload}")]
    Protocol { method: String, payload: Value },

    /// The evaluated script raised inside the page.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
