use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control::{CsrfToken, EVENT_CSRF, EVENT_HEIGHT, EVENT_NAVIGATE, EVENT_READY, EVENT_TITLE};
use crate::error::{PortError, Result};
use crate::port::Port;

const MIN_HEIGHT_INTERVAL: Duration = Duration::from_millis(1);

/// Something whose rendered size the client reports to its host.
pub trait SizeSource: Send + Sync + 'static {
    /// Current size, in whatever unit the host expects.
    fn current_size(&self) -> u64;
}

impl<F> SizeSource for F
where
    F: Fn() -> u64 + Send + Sync + 'static,
{
    fn current_size(&self) -> u64 {
        self()
    }
}

/// CSRF tokens received from hosts, keyed by origin.
///
/// Cloning shares the underlying table.
#[derive(Clone, Default)]
pub struct TokenStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage key for `origin`'s token.
    pub fn storage_key(origin: &str) -> String {
        format!("XSRF.Token@{origin}")
    }

    /// Store `token` for `origin`, replacing any previous one.
    pub fn insert(&self, origin: &str, token: &str) {
        self.entries()
            .insert(Self::storage_key(origin), token.to_string());
    }

    /// Token stored for `origin`.
    pub fn get(&self, origin: &str) -> Option<String> {
        self.entries().get(&Self::storage_key(origin)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries();
        let mut dbg = f.debug_map();
        for (key, token) in entries.iter() {
            dbg.entry(key, &format_args!("<redacted:{} bytes>", token.len()));
        }
        dbg.finish()
    }
}

/// Configuration for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How often the size source is polled.
    pub height_interval: Duration,
    /// How long [`Client::connect`] waits for the host's token. `None` waits
    /// indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            height_interval: Duration::from_millis(100),
            connect_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn with_height_interval(mut self, height_interval: Duration) -> Self {
        self.height_interval = height_interval;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }
}

/// Embedded side of the host handshake.
///
/// Wraps a [`Port`] talking to the host: announces readiness, collects the
/// host's CSRF token, and keeps the host informed of the embedded content's
/// height.
pub struct Client {
    port: Port,
    config: ClientConfig,
    tokens: TokenStore,
    size: Arc<dyn SizeSource>,
    last_height: Arc<AtomicU64>,
    shutdown: CancellationToken,
    reporter: Mutex<Option<CancellationToken>>,
    token_waiter: TokenWaiter,
}

type TokenWaiter = Arc<Mutex<Option<oneshot::Sender<CsrfToken>>>>;

impl Client {
    /// Wrap `port`. The `csrf` handler is registered here, once per client.
    pub fn new(port: Port, config: ClientConfig, size: impl SizeSource) -> Self {
        let tokens = TokenStore::new();
        let token_waiter = TokenWaiter::default();

        let store = tokens.clone();
        let waiter = Arc::clone(&token_waiter);
        port.on(EVENT_CSRF, move |data| {
            let token: CsrfToken = match serde_json::from_value(data.clone()) {
                Ok(token) => token,
                Err(err) => {
                    debug!(error = %err, "ignoring malformed csrf event");
                    return;
                }
            };
            store.insert(&token.origin, &token.token);
            if let Some(ready) = waiter.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = ready.send(token);
            }
        });

        Self {
            port,
            config,
            tokens,
            size: Arc::new(size),
            last_height: Arc::new(AtomicU64::new(0)),
            shutdown: CancellationToken::new(),
            reporter: Mutex::new(None),
            token_waiter,
        }
    }

    /// The underlying port.
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Tokens received so far.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Height last sent to the host, `0` before the first report.
    pub fn last_height(&self) -> u64 {
        self.last_height.load(Ordering::SeqCst)
    }

    /// Connect to the host.
    ///
    /// Opens the port, sends `ready`, starts height reporting, and resolves
    /// with the first CSRF token the host sends back. Every token received is
    /// kept in [`tokens`](Client::tokens). Height reporting stops if
    /// connecting fails.
    pub async fn connect(&self) -> Result<CsrfToken> {
        let (ready, token_received) = oneshot::channel();
        *self
            .token_waiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ready);

        self.port.open()?;
        self.port.send_event(EVENT_READY, &Value::Null)?;
        self.start_reporter()?;

        let wait = async {
            token_received.await.map_err(|_| {
                PortError::Disconnected("port dropped before the host sent a token".to_string())
            })
        };
        let outcome = match self.config.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok(outcome) => outcome,
                Err(_) => Err(PortError::Timeout(timeout)),
            },
            None => wait.await,
        };

        match &outcome {
            Ok(token) => info!(origin = %token.origin, "connected to host"),
            Err(err) => {
                warn!(error = %err, "connect failed");
                self.stop_reporter();
            }
        }
        outcome
    }

    /// Send the current height if it changed since the last report.
    ///
    /// Returns whether a `height` event was sent.
    pub fn report_height(&self) -> Result<bool> {
        report_height(&self.port, self.size.as_ref(), &self.last_height)
    }

    /// Ask the host to navigate to `url`.
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.port.send_event(EVENT_NAVIGATE, url)
    }

    /// Ask the host to change its title.
    pub fn set_title(&self, title: &str) -> Result<()> {
        self.port.send_event(EVENT_TITLE, title)
    }

    /// Stop height reporting and close the port.
    pub fn close(&self) {
        self.shutdown.cancel();
        self.port.close();
    }

    fn start_reporter(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        let stop = self.shutdown.child_token();
        if let Some(previous) = self
            .reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(stop.clone())
        {
            previous.cancel();
        }

        let port = self.port.downgrade();
        let size = Arc::clone(&self.size);
        let last_height = Arc::clone(&self.last_height);
        let period = self.config.height_interval.max(MIN_HEIGHT_INTERVAL);
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(port) = port.upgrade() else {
                    break;
                };
                if let Err(err) = report_height(&port, size.as_ref(), &last_height) {
                    warn!(error = %err, "height report failed");
                }
            }
            debug!("height reporter stopped");
        });
        Ok(())
    }

    fn stop_reporter(&self) {
        if let Some(stop) = self
            .reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            stop.cancel();
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("port", &self.port)
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("last_height", &self.last_height())
            .finish()
    }
}

fn report_height(port: &Port, size: &dyn SizeSource, last_height: &AtomicU64) -> Result<bool> {
    let height = size.current_size();
    if last_height.swap(height, Ordering::SeqCst) == height {
        return Ok(false);
    }
    port.send_event(EVENT_HEIGHT, &height)?;
    Ok(true)
}
