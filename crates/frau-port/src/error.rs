/// Errors that can occur in port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] frau_transport::TransportError),

    /// Envelope encoding error.
    #[error("envelope error: {0}")]
    Envelope(#[from] frau_envelope::EnvelopeError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request server is already registered for this subtype.
    #[error("duplicate request handler for type {0:?}")]
    DuplicateHandler(String),

    /// The port has been closed and cannot be reopened.
    #[error("port is closed")]
    Closed,

    /// The operation needs a tokio runtime and none is running.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// The port went away before the operation completed.
    #[error("port disconnected: {0}")]
    Disconnected(String),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, PortError>;
