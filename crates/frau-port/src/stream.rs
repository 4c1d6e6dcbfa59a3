use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

/// Payloads of one event subtype, as a stream.
///
/// Created by [`Port::event_stream`](crate::Port::event_stream). Ends when the
/// port is dropped.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl EventStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Value>) -> Self {
        Self { receiver }
    }

    /// Wait for the next payload.
    pub async fn next_event(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }

    /// Take a payload that has already arrived, without waiting.
    pub fn try_next_event(&mut self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn yields_payloads_in_order_then_ends() {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stream = EventStream::new(receiver);
        sender.send(json!(1)).unwrap();
        sender.send(json!({ "two": 2 })).unwrap();
        drop(sender);

        let payloads: Vec<Value> = stream.collect().await;
        assert_eq!(payloads, vec![json!(1), json!({ "two": 2 })]);
    }

    #[test]
    fn try_next_does_not_wait() {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut stream = EventStream::new(receiver);
        assert_eq!(stream.try_next_event(), None);
        sender.send(Value::Null).unwrap();
        assert_eq!(stream.try_next_event(), Some(Value::Null));
    }
}
