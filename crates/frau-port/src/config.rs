use frau_envelope::DEFAULT_MAX_MESSAGE_SIZE;
use frau_transport::TargetOrigin;

use crate::error::Result;

/// Configuration for a [`Port`](crate::Port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Origin restriction for outbound posts. When exact, inbound messages
    /// from any other origin are ignored as well.
    pub target_origin: TargetOrigin,
    /// Maximum serialized envelope size in bytes, both directions.
    pub max_message_size: usize,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            target_origin: TargetOrigin::Any,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl PortConfig {
    /// Default configuration restricted to `origin` (`*` for none).
    pub fn for_origin(origin: &str) -> Result<Self> {
        Ok(Self::default().with_target_origin(TargetOrigin::parse(origin)?))
    }

    /// Override the origin restriction.
    pub fn with_target_origin(mut self, target_origin: TargetOrigin) -> Self {
        self.target_origin = target_origin;
        self
    }

    /// Override the maximum envelope size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}
