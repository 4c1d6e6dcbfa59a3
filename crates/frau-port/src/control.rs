use std::fmt;

use serde::{Deserialize, Serialize};

/// Event sent by an embedded client once it is listening.
pub const EVENT_READY: &str = "ready";
/// Event carrying the host's CSRF token, answering [`EVENT_READY`].
pub const EVENT_CSRF: &str = "csrf";
/// Event reporting the client's content height.
pub const EVENT_HEIGHT: &str = "height";
/// Event asking the host to navigate to a URL.
pub const EVENT_NAVIGATE: &str = "navigate";
/// Event asking the host to change its title.
pub const EVENT_TITLE: &str = "title";

/// Payload of the [`EVENT_CSRF`] event.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsrfToken {
    /// Origin the token is valid for.
    pub origin: String,
    /// Opaque token value. Redacted in debug output.
    pub token: String,
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("origin", &self.origin)
            .field(
                "token",
                &format_args!("<redacted:{} bytes>", self.token.len()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn csrf_token_wire_shape() {
        let token = CsrfToken {
            origin: "https://lms.example".to_string(),
            token: "s3cret".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            json!({ "origin": "https://lms.example", "token": "s3cret" })
        );
    }

    #[test]
    fn csrf_token_debug_redacts_token() {
        let token = CsrfToken {
            origin: "https://lms.example".to_string(),
            token: "s3cret".to_string(),
        };
        let rendered = format!("{token:?}");
        assert!(rendered.contains("<redacted:6 bytes>"));
        assert!(!rendered.contains("s3cret"));
    }
}
