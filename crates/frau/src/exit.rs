use std::fmt;

use frau_envelope::EnvelopeError;
use frau_port::PortError;
use frau_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidOrigin(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Detached(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn envelope_error(context: &str, err: EnvelopeError) -> CliError {
    match err {
        EnvelopeError::PayloadTooLarge { .. }
        | EnvelopeError::Json(_)
        | EnvelopeError::MalformedPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn port_error(context: &str, err: PortError) -> CliError {
    match err {
        PortError::Transport(err) => transport_error(context, err),
        PortError::Envelope(err) => envelope_error(context, err),
        PortError::Json(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        PortError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        PortError::DuplicateHandler(_) => CliError::new(USAGE, format!("{context}: {err}")),
        PortError::Disconnected(_) | PortError::Closed => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = port_error("request failed", PortError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("request failed: "));
    }

    #[test]
    fn oversized_envelopes_are_invalid_data() {
        let err = port_error(
            "send failed",
            PortError::Envelope(EnvelopeError::PayloadTooLarge { size: 10, max: 1 }),
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn bad_origin_is_usage() {
        let err = port_error(
            "bad config",
            PortError::Transport(TransportError::InvalidOrigin(String::new())),
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn missing_runtime_is_internal() {
        assert_eq!(port_error("open", PortError::NoRuntime).code, INTERNAL);
    }
}
