use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::origin::TargetOrigin;
use crate::traits::{EndpointId, Inbox, RawMessage, Transport};

/// Default number of undelivered messages buffered per context.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An in-memory execution context that messages can be posted to.
///
/// Behaves like a browsing context: it has a fixed origin, any number of
/// message listeners, and accepts posts from any other context. Cloning
/// yields another handle to the same context.
#[derive(Clone)]
pub struct MessageContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: EndpointId,
    origin: String,
    listeners: broadcast::Sender<RawMessage>,
}

impl MessageContext {
    /// Create a context with the given origin and the default inbox capacity.
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_capacity(origin, DEFAULT_INBOX_CAPACITY)
    }

    /// Create a context with an explicit inbox capacity.
    pub fn with_capacity(origin: impl Into<String>, capacity: usize) -> Self {
        let (listeners, _) = broadcast::channel(capacity.max(1));
        let id = EndpointId::new(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let origin = origin.into();
        debug!(%id, %origin, "created message context");
        Self {
            inner: Arc::new(ContextInner {
                id,
                origin,
                listeners,
            }),
        }
    }

    /// Identifier of this context.
    pub fn id(&self) -> EndpointId {
        self.inner.id
    }

    /// Origin of this context.
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Add a message listener.
    pub fn subscribe(&self) -> Inbox {
        self.inner.listeners.subscribe()
    }

    /// Number of active message listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.receiver_count()
    }

    /// Post `data` to this context on behalf of `source`.
    ///
    /// Dropped silently when `target_origin` does not match this context's
    /// origin or when nobody is listening.
    pub fn post_message(
        &self,
        source: &MessageContext,
        data: Bytes,
        target_origin: &TargetOrigin,
    ) -> Result<()> {
        if !target_origin.matches(&self.inner.origin) {
            debug!(
                target = %self.inner.id,
                %target_origin,
                origin = %self.inner.origin,
                "dropping message: target origin mismatch"
            );
            return Ok(());
        }

        let message = RawMessage {
            source: source.id(),
            origin: source.origin().to_string(),
            data,
        };
        if self.inner.listeners.send(message).is_err() {
            trace!(target = %self.inner.id, "dropping message: no listeners");
        }
        Ok(())
    }

    /// Bind this context to `remote`, producing the transport an engine
    /// living in this context uses to talk to `remote`.
    pub fn link(&self, remote: &MessageContext) -> ContextLink {
        ContextLink {
            local: self.clone(),
            remote_id: remote.id(),
            remote: Arc::downgrade(&remote.inner),
        }
    }
}

impl std::fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("id", &self.inner.id)
            .field("origin", &self.inner.origin)
            .finish()
    }
}

/// Transport between a local context and one remote context.
///
/// Holds the remote weakly: once the remote context is gone, posting fails
/// with [`TransportError::Detached`].
#[derive(Clone)]
pub struct ContextLink {
    local: MessageContext,
    remote_id: EndpointId,
    remote: Weak<ContextInner>,
}

impl ContextLink {
    /// The local side of the link.
    pub fn local(&self) -> &MessageContext {
        &self.local
    }
}

impl Transport for ContextLink {
    fn remote(&self) -> EndpointId {
        self.remote_id
    }

    fn post(&self, data: Bytes, target_origin: &TargetOrigin) -> Result<()> {
        let inner = self
            .remote
            .upgrade()
            .ok_or(TransportError::Detached(self.remote_id))?;
        MessageContext { inner }.post_message(&self.local, data, target_origin)
    }

    fn subscribe(&self) -> Inbox {
        self.local.subscribe()
    }
}

impl std::fmt::Debug for ContextLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLink")
            .field("local", &self.local.id())
            .field("remote", &self.remote_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_distinct_ids() {
        let a = MessageContext::new("https://a.example");
        let b = MessageContext::new("https://b.example");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn post_tags_source_and_origin() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        let mut inbox = frame.subscribe();

        host.link(&frame)
            .post(Bytes::from_static(b"hello"), &TargetOrigin::Any)
            .unwrap();

        let message = inbox.try_recv().unwrap();
        assert_eq!(message.source, host.id());
        assert_eq!(message.origin, "https://host.example");
        assert_eq!(message.data.as_ref(), b"hello");
    }

    #[test]
    fn origin_mismatch_is_dropped() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        let mut inbox = frame.subscribe();

        let restricted = TargetOrigin::Exact("https://other.example".to_string());
        host.link(&frame)
            .post(Bytes::from_static(b"secret"), &restricted)
            .unwrap();

        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn post_without_listeners_is_not_an_error() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        assert_eq!(frame.listener_count(), 0);
        host.link(&frame)
            .post(Bytes::from_static(b"lost"), &TargetOrigin::Any)
            .unwrap();
    }

    #[test]
    fn subscription_only_sees_later_messages() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        let link = host.link(&frame);
        let mut early = frame.subscribe();

        link.post(Bytes::from_static(b"first"), &TargetOrigin::Any)
            .unwrap();
        let mut late = frame.subscribe();
        link.post(Bytes::from_static(b"second"), &TargetOrigin::Any)
            .unwrap();

        assert_eq!(early.try_recv().unwrap().data.as_ref(), b"first");
        assert_eq!(early.try_recv().unwrap().data.as_ref(), b"second");
        assert_eq!(late.try_recv().unwrap().data.as_ref(), b"second");
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn link_subscribes_on_local_side() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        let host_link = host.link(&frame);
        let frame_link = frame.link(&host);

        let mut host_inbox = host_link.subscribe();
        frame_link
            .post(Bytes::from_static(b"up"), &TargetOrigin::Any)
            .unwrap();

        let message = host_inbox.try_recv().unwrap();
        assert_eq!(message.source, frame.id());
        assert_eq!(host_link.remote(), frame.id());
    }

    #[test]
    fn dropped_remote_detaches_link() {
        let host = MessageContext::new("https://host.example");
        let frame = MessageContext::new("https://frame.example");
        let link = host.link(&frame);
        drop(frame);

        let err = link
            .post(Bytes::from_static(b"gone"), &TargetOrigin::Any)
            .unwrap_err();
        assert!(matches!(err, TransportError::Detached(_)));
    }
}
