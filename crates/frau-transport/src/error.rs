use crate::traits::EndpointId;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote context no longer exists.
    #[error("endpoint {0} is detached")]
    Detached(EndpointId),

    /// An origin restriction could not be parsed.
    #[error("invalid origin {0:?}")]
    InvalidOrigin(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
