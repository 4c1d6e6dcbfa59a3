use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

/// A value a request server is still computing.
pub type ServeFuture = Pin<Box<dyn Future<Output = Value> + Send + 'static>>;

/// What a request server produces for one invocation.
///
/// Synchronous servers return a value directly (a bare [`Value`] converts
/// into [`Reply::Ready`]); asynchronous ones hand back a future. The port
/// answers every waiting request the same way in both cases, once the value
/// is available.
pub enum Reply {
    /// The value is available now.
    Ready(Value),
    /// The value will be available when the future completes.
    Deferred(ServeFuture),
}

impl Reply {
    /// A value available now.
    pub fn ready(value: impl Into<Value>) -> Self {
        Reply::Ready(value.into())
    }

    /// A value produced by `future`.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Value> + Send + 'static,
    {
        Reply::Deferred(Box::pin(future))
    }

    /// Whether the value is already available.
    pub fn is_ready(&self) -> bool {
        matches!(self, Reply::Ready(_))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Ready(value)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Reply::Deferred(_) => f.debug_tuple("Deferred").field(&"<future>").finish(),
        }
    }
}
