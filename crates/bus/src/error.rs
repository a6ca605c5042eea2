use thiserror::Error;

/// Errors from managing a bus connection's lifecycle.
///
/// Publishing and subscribing never return these; they report a dropped
/// request as `false` and log instead.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Connection was closed and cannot be reused")]
    Closed,

    #[error("Connection driver already started")]
    AlreadyStarted,

    #[error("No tokio runtime to spawn the connection driver on")]
    NoRuntime,
}

/// Errors surfaced by the transport underneath a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection refused by broker: {0}")]
    Refused(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Client request queue rejected the request: {0}")]
    Request(String),
}

impl TransportError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }
}
