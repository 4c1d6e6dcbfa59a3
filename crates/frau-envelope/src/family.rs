//! Protocol namespace and message families.

/// Namespace prefix that identifies this protocol's traffic.
pub const NAMESPACE: &str = "frau";

/// The three message families multiplexed over one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Fire-and-forget notification.
    Event,
    /// Outbound call awaiting a response.
    Request,
    /// Answer to a request, correlated by id.
    Response,
}

impl Family {
    /// Width of every family code on the wire.
    pub const CODE_LEN: usize = 3;

    /// Three-letter wire code.
    pub fn code(self) -> &'static str {
        match self {
            Family::Event => "evt",
            Family::Request => "req",
            Family::Response => "res",
        }
    }

    /// Look up a family by wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "evt" => Some(Family::Event),
            "req" => Some(Family::Request),
            "res" => Some(Family::Response),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Family::Event => "event",
            Family::Request => "request",
            Family::Response => "response",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
