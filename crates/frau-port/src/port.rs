use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use frau_envelope::{decode_envelope, encode_envelope, Message};
use frau_transport::{EndpointId, Inbox, RawMessage, Transport};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::config::PortConfig;
use crate::error::{PortError, Result};
use crate::reply::Reply;
use crate::stream::EventStream;

type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;
type RequestHandler = Arc<dyn Fn() -> Reply + Send + Sync>;

/// Where a port is in its lifetime. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Constructed, not listening yet.
    #[default]
    Unopened,
    /// Listening on the transport.
    Open,
    /// Stopped listening for good.
    Closed,
}

/// Channel engine bound to one remote endpoint.
///
/// Cloning is cheap; every clone drives the same engine. Handler and server
/// tables may be changed at any time, before or after [`open`](Port::open).
#[derive(Clone)]
pub struct Port {
    shared: Arc<Shared>,
}

/// Non-owning handle to a [`Port`], for handlers that need to reach back into
/// the port they are registered on.
#[derive(Clone)]
pub struct WeakPort {
    shared: Weak<Shared>,
}

struct Shared {
    transport: Box<dyn Transport>,
    config: PortConfig,
    state: Mutex<PortState>,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct PortState {
    lifecycle: Lifecycle,
    event_handlers: HashMap<String, Vec<EventHandler>>,
    request_handlers: HashMap<String, RequestHandler>,
    /// Outbound requests awaiting a response, per subtype.
    pending: HashMap<String, Vec<PendingRequest>>,
    /// Inbound request ids not answered yet, per subtype.
    waiting: HashMap<String, Vec<u64>>,
    /// Subtypes whose server is currently computing a value.
    in_flight: HashSet<String>,
    last_request_id: u64,
}

struct PendingRequest {
    id: u64,
    completer: oneshot::Sender<Value>,
}

impl Port {
    /// Create a port talking to the transport's remote endpoint.
    pub fn new(transport: impl Transport, config: PortConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport: Box::new(transport),
                config,
                state: Mutex::new(PortState::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// The endpoint this port exchanges messages with.
    pub fn remote(&self) -> EndpointId {
        self.shared.transport.remote()
    }

    /// Port configuration.
    pub fn config(&self) -> &PortConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state().lifecycle
    }

    /// Non-owning handle to this port.
    pub fn downgrade(&self) -> WeakPort {
        WeakPort {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Start listening for inbound messages.
    ///
    /// The transport subscription is taken before this returns, so anything
    /// the remote posts afterwards is seen. Dispatch runs on a spawned tokio
    /// task. Opening an open port does nothing; a closed port stays closed.
    pub fn open(&self) -> Result<&Self> {
        let mut state = self.state();
        match state.lifecycle {
            Lifecycle::Open => {
                debug!(remote = %self.remote(), "port already open");
                return Ok(self);
            }
            Lifecycle::Closed => return Err(PortError::Closed),
            Lifecycle::Unopened => {}
        }
        let runtime = Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        state.lifecycle = Lifecycle::Open;
        drop(state);

        let inbox = self.shared.transport.subscribe();
        runtime.spawn(dispatch_loop(
            Arc::downgrade(&self.shared),
            inbox,
            self.shared.shutdown.clone(),
        ));
        debug!(remote = %self.remote(), "port opened");
        Ok(self)
    }

    /// Stop listening. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state();
            if state.lifecycle == Lifecycle::Closed {
                return;
            }
            state.lifecycle = Lifecycle::Closed;
        }
        self.shared.shutdown.cancel();
        debug!(remote = %self.remote(), "port closed");
    }

    /// Register `handler` for every event of `event_type`.
    ///
    /// Handlers run in registration order. A panicking handler unwinds into
    /// the dispatching context and the handlers after it do not run. The
    /// dispatch task started by [`open`](Port::open) logs the panic, drops
    /// that message, and keeps listening.
    pub fn on<F>(&self, event_type: &str, handler: F) -> &Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.state()
            .event_handlers
            .entry(event_type.to_string())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Receive every payload of `event_type` through a stream.
    pub fn event_stream(&self, event_type: &str) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.on(event_type, move |data| {
            let _ = sender.send(data.clone());
        });
        EventStream::new(receiver)
    }

    /// Post an event. Fire-and-forget.
    pub fn send_event<T>(&self, event_type: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.send_message(Message::Event {
            event_type: event_type.to_string(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Register the server for `request_type`.
    ///
    /// The server takes no arguments and returns anything convertible into a
    /// [`Reply`]. Requests that arrived before registration are answered right
    /// away.
    pub fn on_request<F, R>(&self, request_type: &str, handler: F) -> Result<&Self>
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        match self
            .state()
            .request_handlers
            .entry(request_type.to_string())
        {
            Entry::Occupied(_) => {
                return Err(PortError::DuplicateHandler(request_type.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(move || -> Reply { handler().into() }));
            }
        }
        self.flush(request_type);
        Ok(self)
    }

    /// Call the remote server for `request_type`.
    ///
    /// The request is posted before this returns. The future resolves with
    /// the response value; it stays pending for as long as no response
    /// arrives.
    pub fn request(&self, request_type: &str) -> Result<ResponseFuture> {
        let (completer, receiver) = oneshot::channel();
        let id = {
            let mut state = self.state();
            state.last_request_id += 1;
            let id = state.last_request_id;
            state
                .pending
                .entry(request_type.to_string())
                .or_default()
                .push(PendingRequest { id, completer });
            id
        };

        if let Err(err) = self.send_message(Message::Request {
            request_type: request_type.to_string(),
            id,
        }) {
            self.forget_request(request_type, id);
            return Err(err);
        }

        Ok(ResponseFuture {
            request_type: request_type.to_string(),
            id,
            receiver,
        })
    }

    /// [`request`](Port::request) with a deadline.
    ///
    /// On expiry the pending entry is dropped, so a late response is ignored.
    pub fn request_timeout(
        &self,
        request_type: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let port = self.clone();
        let issued = self.request(request_type);
        async move {
            let response = issued?;
            let (request_type, id) = (response.request_type.clone(), response.id);
            match tokio::time::timeout(timeout, response).await {
                Ok(result) => result,
                Err(_) => {
                    port.forget_request(&request_type, id);
                    debug!(%request_type, id, ?timeout, "request timed out");
                    Err(PortError::Timeout(timeout))
                }
            }
        }
    }

    /// Number of outbound `request_type` calls still awaiting a response.
    pub fn pending_requests(&self, request_type: &str) -> usize {
        self.state().pending.get(request_type).map_or(0, Vec::len)
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.state().event_handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Number of inbound `request_type` calls not answered yet.
    pub fn waiting_requests(&self, request_type: &str) -> usize {
        self.state().waiting.get(request_type).map_or(0, Vec::len)
    }

    /// Handle one raw inbound message.
    ///
    /// Called by the dispatch task for every message the transport delivers.
    /// Messages from other sources or origins, foreign traffic, and malformed
    /// envelopes are ignored.
    pub fn receive_message(&self, raw: &RawMessage) {
        if self.lifecycle() == Lifecycle::Closed {
            trace!("port closed; ignoring message");
            return;
        }
        if raw.source != self.remote() {
            trace!(source = %raw.source, "ignoring message from foreign source");
            return;
        }
        if !self.shared.config.target_origin.matches(&raw.origin) {
            trace!(origin = %raw.origin, "ignoring message from foreign origin");
            return;
        }

        let message = match decode_envelope(&raw.data, self.shared.config.max_message_size)
            .and_then(Message::from_envelope)
        {
            Ok(message) => message,
            Err(err) => {
                trace!(error = %err, "ignoring non-protocol message");
                return;
            }
        };

        debug!(key = %message.key(), "received");
        match message {
            Message::Event { event_type, data } => self.receive_event(&event_type, &data),
            Message::Request { request_type, id } => self.receive_request(&request_type, id),
            Message::Response {
                request_type,
                id,
                val,
            } => self.receive_response(&request_type, id, val),
        }
    }

    fn receive_event(&self, event_type: &str, data: &Value) {
        let handlers = match self.state().event_handlers.get(event_type) {
            Some(handlers) => handlers.clone(),
            None => return,
        };
        for handler in handlers {
            handler(data);
        }
    }

    fn receive_request(&self, request_type: &str, id: u64) {
        self.state()
            .waiting
            .entry(request_type.to_string())
            .or_default()
            .push(id);
        self.flush(request_type);
    }

    fn receive_response(&self, request_type: &str, id: u64, val: Value) {
        let completer = {
            let mut state = self.state();
            let Some(requests) = state.pending.get_mut(request_type) else {
                trace!(%request_type, id, "response without pending requests");
                return;
            };
            let Some(index) = requests.iter().position(|request| request.id == id) else {
                trace!(%request_type, id, "response for unknown id");
                return;
            };
            let request = requests.remove(index);
            if requests.is_empty() {
                state.pending.remove(request_type);
            }
            request.completer
        };

        if completer.send(val).is_err() {
            trace!(%request_type, id, "response arrived after caller stopped waiting");
        }
    }

    /// Invoke the server once and answer every waiting id with its value.
    ///
    /// Does nothing without a server, without waiting ids, or while a
    /// previous invocation is still computing; ids that arrive meanwhile are
    /// answered with that invocation's value.
    fn flush(&self, request_type: &str) {
        let handler = {
            let mut state = self.state();
            if state.in_flight.contains(request_type) {
                trace!(%request_type, "server busy; request queued");
                return;
            }
            let Some(handler) = state.request_handlers.get(request_type).cloned() else {
                return;
            };
            if state.waiting.get(request_type).map_or(true, Vec::is_empty) {
                return;
            }
            state.in_flight.insert(request_type.to_string());
            handler
        };

        let guard = InFlightGuard {
            shared: Arc::downgrade(&self.shared),
            request_type: request_type.to_string(),
            armed: true,
        };

        match handler() {
            Reply::Ready(val) => self.answer_waiting(guard, val),
            Reply::Deferred(future) => match Handle::try_current() {
                Ok(runtime) => {
                    let port = self.downgrade();
                    runtime.spawn(async move {
                        let val = future.await;
                        if let Some(port) = port.upgrade() {
                            port.answer_waiting(guard, val);
                        }
                    });
                }
                Err(_) => {
                    warn!(
                        %request_type,
                        "deferred reply needs a tokio runtime; requests left waiting"
                    );
                }
            },
        }
    }

    fn answer_waiting(&self, guard: InFlightGuard, val: Value) {
        let ids = {
            let mut state = self.state();
            state.in_flight.remove(&guard.request_type);
            state.waiting.remove(&guard.request_type).unwrap_or_default()
        };
        let request_type = guard.disarm();

        for id in ids {
            if let Err(err) = self.send_message(Message::Response {
                request_type: request_type.clone(),
                id,
                val: val.clone(),
            }) {
                warn!(%request_type, id, error = %err, "failed to send response");
            }
        }
    }

    fn forget_request(&self, request_type: &str, id: u64) -> bool {
        let mut state = self.state();
        let Some(requests) = state.pending.get_mut(request_type) else {
            return false;
        };
        let before = requests.len();
        requests.retain(|request| request.id != id);
        let removed = requests.len() != before;
        if requests.is_empty() {
            state.pending.remove(request_type);
        }
        removed
    }

    fn send_message(&self, message: Message) -> Result<()> {
        let envelope = message.into_envelope()?;
        let wire = encode_envelope(&envelope, self.shared.config.max_message_size)?;
        debug!(key = %envelope.key, "sending");
        if let Err(err) = self
            .shared
            .transport
            .post(wire, &self.shared.config.target_origin)
        {
            warn!(key = %envelope.key, error = %err, "post failed; message dropped");
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, PortState> {
        self.shared.lock_state()
    }
}

impl WeakPort {
    /// The port, if it still exists.
    pub fn upgrade(&self) -> Option<Port> {
        self.shared.upgrade().map(|shared| Port { shared })
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, PortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("remote", &self.remote())
            .field("lifecycle", &self.lifecycle())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl fmt::Debug for WeakPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPort")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Clears a subtype's in-flight mark unless the invocation was answered,
/// so a panicking or abandoned server does not block later requests.
struct InFlightGuard {
    shared: Weak<Shared>,
    request_type: String,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.request_type)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.lock_state().in_flight.remove(&self.request_type);
        }
    }
}

/// The eventual response to one outbound request.
#[derive(Debug)]
pub struct ResponseFuture {
    request_type: String,
    id: u64,
    receiver: oneshot::Receiver<Value>,
}

impl ResponseFuture {
    /// Request id on the wire.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request subtype.
    pub fn request_type(&self) -> &str {
        &self.request_type
    }
}

impl Future for ResponseFuture {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        Pin::new(&mut this.receiver).poll(cx).map(|result| {
            result.map_err(|_| {
                PortError::Disconnected(format!(
                    "port dropped before response to {} #{}",
                    this.request_type, this.id
                ))
            })
        })
    }
}

async fn dispatch_loop(shared: Weak<Shared>, mut inbox: Inbox, shutdown: CancellationToken) {
    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = inbox.recv() => received,
        };
        match received {
            Ok(raw) => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let port = Port { shared };
                // A panicking handler loses this message only; the listener stays.
                let dispatched =
                    panic::catch_unwind(AssertUnwindSafe(|| port.receive_message(&raw)));
                if let Err(panic) = dispatched {
                    error!(
                        source = %raw.source,
                        panic = panic_message(&*panic),
                        "handler panicked; message dropped"
                    );
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "inbox lagged; messages dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("dispatch loop stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
