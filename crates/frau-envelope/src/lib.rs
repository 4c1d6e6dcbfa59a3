//! Keyed JSON envelopes with event/request/response multiplexing.
//!
//! Every message on the wire is a single envelope:
//! - a `key` of the form `frau.<family>.<subtype>`
//! - a `payload` whose shape depends on the family
//!
//! The `frau` namespace lets unrelated traffic share the same channel; the
//! three-letter family code selects event, request, or response handling.

pub mod codec;
pub mod error;
pub mod family;
pub mod key;
pub mod message;

pub use codec::{
    decode_envelope, encode_envelope, Envelope, RequestPayload, ResponsePayload,
    DEFAULT_MAX_MESSAGE_SIZE,
};
pub use error::{EnvelopeError, Result};
pub use family::{Family, NAMESPACE};
pub use key::MessageKey;
pub use message::Message;
