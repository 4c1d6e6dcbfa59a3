use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Origin restriction applied when posting, and when accepting inbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TargetOrigin {
    /// `*`: no restriction.
    #[default]
    Any,
    /// Only the given origin, compared byte for byte.
    Exact(String),
}

impl TargetOrigin {
    /// Parse an origin restriction. `*` means [`TargetOrigin::Any`].
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() || input.chars().any(char::is_whitespace) {
            return Err(TransportError::InvalidOrigin(input.to_string()));
        }
        if input == "*" {
            return Ok(Self::Any);
        }
        Ok(Self::Exact(input.to_string()))
    }

    /// Whether a context with `origin` satisfies this restriction.
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == origin,
        }
    }
}

impl FromStr for TargetOrigin {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(origin) => f.write_str(origin),
        }
    }
}
