//! Envelope decoding: queue message body to object reference
//!
//! Queue bodies are SNS notifications whose `Message` field carries the
//! CloudTrail delivery payload as a JSON string, so decoding is two passes.

use crate::error::{Result, TrailError};
use crate::types::{ObjectReference, ReceivedMessage, TransportEnvelope};

/// Payload CloudTrail sends when a trail's SNS topic is first wired up
pub const VALIDATION_MESSAGE: &str = "CloudTrail validation message.";

/// Outcome of decoding one queue message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A log object to ingest
    Reference(ObjectReference),

    /// The validation sentinel: acknowledge and skip, nothing to fetch
    Validation { message_id: String },
}

/// Decode a raw envelope body
///
/// The envelope's own `MessageId` is attached to the reference; callers
/// attach the receipt handle (see `decode_message`).
pub fn decode_envelope(body: &str) -> Result<Decoded> {
    let envelope: TransportEnvelope = serde_json::from_str(body)
        .map_err(|e| TrailError::Decode(format!("malformed envelope: {}", e)))?;

    if envelope.payload == VALIDATION_MESSAGE {
        return Ok(Decoded::Validation {
            message_id: envelope.message_id,
        });
    }

    let mut reference: ObjectReference = serde_json::from_str(&envelope.payload)
        .map_err(|e| TrailError::Decode(format!("malformed payload: {}", e)))?;

    if reference.keys.is_empty() {
        return Err(TrailError::Decode(format!(
            "payload for bucket '{}' has no object keys",
            reference.bucket
        )));
    }

    reference.message_id = envelope.message_id;
    Ok(Decoded::Reference(reference))
}

/// Decode a received queue message, attaching its receipt handle
///
/// Envelopes without a `MessageId` (e.g. backfill-generated ones) fall
/// back to the queue-assigned message id.
pub fn decode_message(message: &ReceivedMessage) -> Result<Decoded> {
    let decoded = match decode_envelope(&message.body)? {
        Decoded::Reference(mut reference) => {
            if reference.message_id.is_empty() {
                reference.message_id = message.message_id.clone();
            }
            reference.receipt_handle = message.receipt_handle.clone();
            Decoded::Reference(reference)
        }
        Decoded::Validation { message_id } if message_id.is_empty() => Decoded::Validation {
            message_id: message.message_id.clone(),
        },
        validation => validation,
    };
    Ok(decoded)
}

/// Wrap a reference in an otherwise empty envelope, as backfill enqueues it
pub fn encode_envelope(reference: &ObjectReference) -> Result<String> {
    let envelope = TransportEnvelope {
        payload: serde_json::to_string(reference)?,
        ..Default::default()
    };
    Ok(serde_json::to_string(&envelope)?)
}
