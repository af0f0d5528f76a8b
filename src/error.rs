use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why a gateway connection attempt ended. `GatewayConnection::run` only ever
/// returns one of these.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway endpoint discovery failed: {0}")]
    Discovery(#[from] RestError),
    #[error("gateway connection closed by peer: {0}")]
    ConnectionClosed(String),
    #[error("gateway protocol error: {0}")]
    Protocol(String),
    #[error("gateway transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("gateway connection is already running")]
    AlreadyRunning,
}

impl GatewayError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        GatewayError::Protocol(msg.into())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Protocol(format!("malformed frame: {e}"))
    }
}

/// Failure of a single REST call. Never affects the gateway connection.
#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    /// Status code of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error returned by an application event handler. Logged at the dispatch
/// boundary and otherwise dropped.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("CPBOT_TOKEN is required")]
    MissingToken,
    #[error("token contains characters not allowed in an Authorization header")]
    InvalidToken,
    #[error("client name {0:?} is not a valid User-Agent header")]
    InvalidName(String),
}
