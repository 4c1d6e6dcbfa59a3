//! Events and request/response calls between two postMessage-connected
//! contexts.
//!
//! frau lets an embedding page and its embedded frame emit fire-and-forget
//! events to each other and expose named computations the other side can
//! call. Calls that arrive before their server is registered are held and
//! answered once it is.
//!
//! # Crate Structure
//!
//! - [`transport`]: postable channel abstraction and in-memory contexts
//! - [`envelope`]: keyed JSON envelopes and the event/request/response codec
//! - [`port`]: the channel engine plus the client/host handshake (behind `port` feature)

/// Re-export transport types.
pub mod transport {
    pub use frau_transport::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use frau_envelope::*;
}

/// Re-export port types (requires `port` feature).
#[cfg(feature = "port")]
pub mod port {
    pub use frau_port::*;
}
