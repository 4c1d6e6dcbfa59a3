use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EnvelopeError, Result};

/// Default maximum serialized envelope size: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// The wire unit.
///
/// ```text
/// { "key": "frau.<evt|req|res>.<subtype>", "payload": <family-specific> }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Create an envelope.
    pub fn new(key: impl Into<String>, payload: Value) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }
}

/// Payload of a request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub id: u64,
}

/// Payload of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub id: u64,
    #[serde(default)]
    pub val: Value,
}

/// Serialize an envelope to its JSON wire form.
pub fn encode_envelope(envelope: &Envelope, max_size: usize) -> Result<Bytes> {
    let encoded = serde_json::to_vec(envelope)?;
    if encoded.len() > max_size {
        return Err(EnvelopeError::PayloadTooLarge {
            size: encoded.len(),
            max: max_size,
        });
    }
    Ok(Bytes::from(encoded))
}

/// Parse an envelope from its JSON wire form.
///
/// Only the envelope shape is checked here: a JSON object with a string
/// `key`. A missing `payload` decodes as `null`. Key structure is validated
/// by [`MessageKey::parse`](crate::MessageKey::parse).
pub fn decode_envelope(data: &[u8], max_size: usize) -> Result<Envelope> {
    if data.len() > max_size {
        return Err(EnvelopeError::PayloadTooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let value: Value = serde_json::from_slice(data)?;
    let Value::Object(mut fields) = value else {
        return Err(EnvelopeError::MissingKey);
    };
    let key = match fields.remove("key") {
        Some(Value::String(key)) => key,
        _ => return Err(EnvelopeError::MissingKey),
    };
    let payload = fields.remove("payload").unwrap_or(Value::Null);

    Ok(Envelope { key, payload })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_key_and_payload() {
        let envelope = Envelope::new("frau.evt.ping", json!({ "n": 1 }));
        let wire = encode_envelope(&envelope, DEFAULT_MAX_MESSAGE_SIZE).unwrap();

        let value: Value = serde_json::from_slice(&wire).unwrap();
        assert_eq!(value, json!({ "key": "frau.evt.ping", "payload": { "n": 1 } }));
        assert_eq!(
            decode_envelope(&wire, DEFAULT_MAX_MESSAGE_SIZE).unwrap(),
            envelope
        );
    }

    #[test]
    fn missing_payload_decodes_as_null() {
        let envelope = decode_envelope(br#"{"key":"frau.evt.ready"}"#, 1024).unwrap();
        assert_eq!(envelope.key, "frau.evt.ready");
        assert_eq!(envelope.payload, Value::Null);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let envelope =
            decode_envelope(br#"{"key":"frau.evt.a","payload":2,"extra":true}"#, 1024).unwrap();
        assert_eq!(envelope.payload, json!(2));
    }

    #[test]
    fn non_envelope_json_has_no_key() {
        for raw in [
            &b"[1,2,3]"[..],
            br#""frau.evt.ping""#,
            br#"{"payload":1}"#,
            br#"{"key":7,"payload":1}"#,
        ] {
            assert!(matches!(
                decode_envelope(raw, 1024),
                Err(EnvelopeError::MissingKey)
            ));
        }
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            decode_envelope(b"{not-json", 1024),
            Err(EnvelopeError::Json(_))
        ));
    }

    #[test]
    fn size_limit_applies_both_ways() {
        let envelope = Envelope::new("frau.evt.blob", json!("x".repeat(64)));
        assert!(matches!(
            encode_envelope(&envelope, 16),
            Err(EnvelopeError::PayloadTooLarge { max: 16, .. })
        ));

        let wire = encode_envelope(&envelope, DEFAULT_MAX_MESSAGE_SIZE).unwrap();
        assert!(matches!(
            decode_envelope(&wire, 16),
            Err(EnvelopeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn response_payload_defaults_val() {
        let payload: ResponsePayload = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(payload.id, 3);
        assert_eq!(payload.val, Value::Null);
    }
}
