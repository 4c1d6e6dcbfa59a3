use serde_json::Value;

use crate::codec::{Envelope, RequestPayload, ResponsePayload};
use crate::error::{EnvelopeError, Result};
use crate::family::Family;
use crate::key::MessageKey;

/// Typed view of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Event {
        event_type: String,
        data: Value,
    },
    Request {
        request_type: String,
        id: u64,
    },
    Response {
        request_type: String,
        id: u64,
        val: Value,
    },
}

impl Message {
    /// Family of this message.
    pub fn family(&self) -> Family {
        match self {
            Message::Event { .. } => Family::Event,
            Message::Request { .. } => Family::Request,
            Message::Response { .. } => Family::Response,
        }
    }

    /// Subtype of this message.
    pub fn subtype(&self) -> &str {
        match self {
            Message::Event { event_type, .. } => event_type,
            Message::Request { request_type, .. } | Message::Response { request_type, .. } => {
                request_type
            }
        }
    }

    /// Wire key of this message.
    pub fn key(&self) -> MessageKey {
        MessageKey::new(self.family(), self.subtype())
    }

    /// Frame this message as an envelope.
    pub fn into_envelope(self) -> Result<Envelope> {
        let key = self.key().format();
        let payload = match self {
            Message::Event { data, .. } => data,
            Message::Request { id, .. } => serde_json::to_value(RequestPayload { id })?,
            Message::Response { id, val, .. } => serde_json::to_value(ResponsePayload { id, val })?,
        };
        Ok(Envelope { key, payload })
    }

    /// Classify an envelope by key and validate its payload shape.
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        let MessageKey { family, subtype } = MessageKey::parse(&envelope.key)?;
        match family {
            Family::Event => Ok(Message::Event {
                event_type: subtype,
                data: envelope.payload,
            }),
            Family::Request => {
                let payload: RequestPayload = serde_json::from_value(envelope.payload)
                    .map_err(|err| malformed(family, err))?;
                Ok(Message::Request {
                    request_type: subtype,
                    id: payload.id,
                })
            }
            Family::Response => {
                let payload: ResponsePayload = serde_json::from_value(envelope.payload)
                    .map_err(|err| malformed(family, err))?;
                Ok(Message::Response {
                    request_type: subtype,
                    id: payload.id,
                    val: payload.val,
                })
            }
        }
    }
}

fn malformed(family: Family, err: serde_json::Error) -> EnvelopeError {
    EnvelopeError::MalformedPayload {
        family: family.name(),
        reason: err.to_string(),
    }
}
