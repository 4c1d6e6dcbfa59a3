use std::fmt;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::origin::TargetOrigin;

/// Opaque identifier of an execution context.
///
/// Two handles compare equal only if they refer to the same context, which is
/// what inbound source filtering relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint-{}", self.0)
    }
}

/// One message as delivered to a context's listeners.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// The context that posted the message.
    pub source: EndpointId,
    /// Origin of the posting context.
    pub origin: String,
    /// Serialized message body.
    pub data: Bytes,
}

/// Receiving half of a message subscription.
///
/// A subscription only sees messages posted after it was created. A slow
/// subscriber that falls behind the buffer loses the oldest messages.
pub type Inbox = broadcast::Receiver<RawMessage>;

/// A postable channel bound to one remote endpoint.
pub trait Transport: Send + Sync + 'static {
    /// The endpoint messages are posted to, and the only source inbound
    /// messages should be accepted from.
    fn remote(&self) -> EndpointId;

    /// Deliver `data` to the remote endpoint if its origin satisfies
    /// `target_origin`. No acknowledgement; success means "handed off".
    fn post(&self, data: Bytes, target_origin: &TargetOrigin) -> Result<()>;

    /// Start listening for inbound messages on the local side.
    ///
    /// Messages from every source are delivered; filtering is the caller's job.
    fn subscribe(&self) -> Inbox;
}
