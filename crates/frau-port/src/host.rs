use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::control::{CsrfToken, EVENT_CSRF, EVENT_HEIGHT, EVENT_NAVIGATE, EVENT_READY, EVENT_TITLE};
use crate::error::Result;
use crate::port::Port;

/// Credentials a [`Host`] hands to its client.
#[derive(Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Origin the token is valid for.
    pub origin: String,
    /// CSRF token sent in answer to `ready`.
    /// Treated as opaque credential material and redacted in debug output.
    pub token: String,
}

impl HostConfig {
    pub fn new(origin: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("origin", &self.origin)
            .field(
                "token",
                &format_args!("<redacted:{} bytes>", self.token.len()),
            )
            .finish()
    }
}

/// Embedding side of the handshake.
///
/// Answers the client's `ready` with a CSRF token and records the height and
/// title the client reports.
pub struct Host {
    port: Port,
    config: HostConfig,
    height: Arc<Mutex<Option<u64>>>,
    title: Arc<Mutex<Option<String>>>,
}

impl Host {
    pub fn new(port: Port, config: HostConfig) -> Self {
        Self {
            port,
            config,
            height: Arc::default(),
            title: Arc::default(),
        }
    }

    /// The underlying port.
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Register the handshake handlers and open the port.
    pub fn open(&self) -> Result<&Self> {
        let port = self.port.downgrade();
        let csrf = CsrfToken {
            origin: self.config.origin.clone(),
            token: self.config.token.clone(),
        };
        self.port.on(EVENT_READY, move |_| {
            let Some(port) = port.upgrade() else {
                return;
            };
            debug!(origin = %csrf.origin, "client ready; sending csrf token");
            if let Err(err) = port.send_event(EVENT_CSRF, &csrf) {
                warn!(error = %err, "failed to send csrf token");
            }
        });

        let height = Arc::clone(&self.height);
        self.port.on(EVENT_HEIGHT, move |data| match data.as_u64() {
            Some(value) => *height.lock().unwrap_or_else(PoisonError::into_inner) = Some(value),
            None => debug!(%data, "ignoring non-numeric height"),
        });

        let title = Arc::clone(&self.title);
        self.port.on(EVENT_TITLE, move |data| match data.as_str() {
            Some(value) => {
                *title.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string())
            }
            None => debug!(%data, "ignoring non-string title"),
        });

        self.port.open()?;
        Ok(self)
    }

    /// Call `handler` with every URL the client asks to navigate to.
    pub fn on_navigate<F>(&self, handler: F) -> &Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.port.on(EVENT_NAVIGATE, move |data| match data.as_str() {
            Some(url) => handler(url),
            None => debug!(%data, "ignoring non-string navigate target"),
        });
        self
    }

    /// Height last reported by the client.
    pub fn height(&self) -> Option<u64> {
        *self.height.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Title last set by the client.
    pub fn title(&self) -> Option<String> {
        self.title
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close the port.
    pub fn close(&self) {
        self.port.close();
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("port", &self.port)
            .field("config", &self.config)
            .field("height", &self.height())
            .field("title", &self.title())
            .finish()
    }
}
