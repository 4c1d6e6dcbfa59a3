//! Postable message channel abstraction.
//!
//! Models the fire-and-forget channel two execution contexts use to talk to
//! each other (think an embedding page and its embedded frame):
//! - every context has an origin and a list of message listeners
//! - posting delivers to exactly one remote context, restricted by origin
//! - inbound messages are tagged with their source endpoint
//!
//! This is the lowest layer of frau. The envelope codec and the channel
//! engine build on the [`Transport`] trait provided here.

pub mod context;
pub mod error;
pub mod origin;
pub mod traits;

pub use context::{ContextLink, MessageContext, DEFAULT_INBOX_CAPACITY};
pub use error::{Result, TransportError};
pub use origin::TargetOrigin;
pub use traits::{EndpointId, Inbox, RawMessage, Transport};
