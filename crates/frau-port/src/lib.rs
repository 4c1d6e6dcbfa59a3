//! Event and request/response channel engine.
//!
//! A [`Port`] owns one logical connection to one remote endpoint. Over a
//! single postable transport it multiplexes fire-and-forget events, outbound
//! calls awaiting a response, and inbound calls answered by a registered
//! server. Calls that arrive before their server is registered are held and
//! answered as soon as it is.
//!
//! [`Client`] and [`Host`] layer the connect handshake and size reporting of
//! an embedded frame on top of the port API.

pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod port;
pub mod reply;
pub mod stream;

pub use client::{Client, ClientConfig, SizeSource, TokenStore};
pub use config::PortConfig;
pub use control::{CsrfToken, EVENT_CSRF, EVENT_HEIGHT, EVENT_NAVIGATE, EVENT_READY, EVENT_TITLE};
pub use error::{PortError, Result};
pub use host::{Host, HostConfig};
pub use port::{Lifecycle, Port, ResponseFuture, WeakPort};
pub use reply::{Reply, ServeFuture};
pub use stream::EventStream;
