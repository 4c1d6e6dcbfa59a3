/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope is not valid JSON or does not have the envelope shape.
    #[error("envelope json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The serialized envelope exceeds the configured maximum size.
    #[error("envelope too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The message has no string `key` field.
    #[error("message has no envelope key")]
    MissingKey,

    /// The key belongs to another protocol.
    #[error("foreign namespace in key {0:?}")]
    ForeignNamespace(String),

    /// The family code is not `evt`, `req` or `res`.
    #[error("unknown message family {0:?}")]
    UnknownFamily(String),

    /// The key has the namespace but not the `<family>.<subtype>` structure.
    #[error("malformed key {0:?}")]
    MalformedKey(String),

    /// The payload does not match what its family requires.
    #[error("malformed {family} payload: {reason}")]
    MalformedPayload {
        family: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
