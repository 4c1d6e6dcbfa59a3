use std::fmt;

use crate::error::{EnvelopeError, Result};
use crate::family::{Family, NAMESPACE};

/// Parsed envelope key: `frau.<family>.<subtype>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub family: Family,
    /// Application-chosen subtype. Opaque to the protocol; may contain dots.
    pub subtype: String,
}

impl MessageKey {
    /// Build a key.
    pub fn new(family: Family, subtype: impl Into<String>) -> Self {
        Self {
            family,
            subtype: subtype.into(),
        }
    }

    /// Wire form of this key.
    pub fn format(&self) -> String {
        format!("{NAMESPACE}.{}.{}", self.family.code(), self.subtype)
    }

    /// Parse a wire key.
    ///
    /// The family is the fixed-width code right after the namespace; the
    /// subtype is everything after the separator that follows it.
    pub fn parse(key: &str) -> Result<Self> {
        let rest = key
            .strip_prefix(NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| EnvelopeError::ForeignNamespace(key.to_string()))?;

        let code = rest
            .get(..Family::CODE_LEN)
            .ok_or_else(|| EnvelopeError::MalformedKey(key.to_string()))?;
        let subtype = rest[Family::CODE_LEN..]
            .strip_prefix('.')
            .ok_or_else(|| EnvelopeError::MalformedKey(key.to_string()))?;

        let family =
            Family::from_code(code).ok_or_else(|| EnvelopeError::UnknownFamily(code.to_string()))?;

        Ok(Self {
            family,
            subtype: subtype.to_string(),
        })
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NAMESPACE}.{}.{}", self.family.code(), self.subtype)
    }
}
