//! Notification Wire Format
//!
//! Decoding of server-pushed frames into [`NotificationRecord`]s.
//!
//! # Frame Format
//!
//! A frame carries one UTF-8 JSON document in either of two shapes:
//!
//! ```text
//! ["Profile updated", {"level": "success", "icon": "check", "title": "Saved", "sticky": false}]
//! ["Profile updated"]
//! ["Profile updated", null]
//! {"message": "Profile updated", "level": "success"}
//! ```
//!
//! The array form is what the server emits; the object form is accepted for
//! producers that prefer named fields. Unknown option keys are ignored.
//! Anything else (non-JSON, scalars, a missing or non-string message,
//! wrongly typed options) is rejected and the caller drops the frame.

use serde_json::Value;
use thiserror::Error;

use super::traits::Frame;
use crate::messages::{NotificationRecord, NotifyOptions};

/// Maximum accepted frame size (64 KB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Reasons a frame could not be turned into a notification
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame exceeds [`MAX_FRAME_SIZE`]
    #[error("Frame too large: {size} bytes (max: {max})")]
    TooLarge {
        /// Payload size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Binary frame is not UTF-8
    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Payload is not JSON
    #[error("Malformed JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// Payload is JSON of the wrong shape
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(&'static str),

    /// No string `message` present
    #[error("Notification has no message")]
    MissingMessage,

    /// Options object has wrongly typed fields
    #[error("Invalid notification options: {0}")]
    InvalidOptions(#[source] serde_json::Error),
}

/// Decode a raw frame
///
/// # Errors
///
/// Returns a [`DecodeError`] describing why the frame cannot be rendered.
pub fn decode(frame: &Frame) -> Result<NotificationRecord, DecodeError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(DecodeError::TooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    match frame {
        Frame::Text(text) => decode_str(text),
        Frame::Binary(data) => decode_str(std::str::from_utf8(data)?),
    }
}

/// Decode a JSON payload
///
/// # Errors
///
/// Returns a [`DecodeError`] describing why the payload cannot be rendered.
pub fn decode_str(payload: &str) -> Result<NotificationRecord, DecodeError> {
    let value: Value = serde_json::from_str(payload).map_err(DecodeError::Json)?;

    match value {
        Value::Array(items) => decode_tuple(items),
        Value::Object(mut fields) => {
            let message = match fields.remove("message") {
                Some(Value::String(message)) => message,
                _ => return Err(DecodeError::MissingMessage),
            };
            let options = serde_json::from_value(Value::Object(fields))
                .map_err(DecodeError::InvalidOptions)?;
            Ok(NotificationRecord::with_options(message, options))
        }
        Value::Null => Err(DecodeError::UnexpectedShape("null")),
        Value::Bool(_) => Err(DecodeError::UnexpectedShape("boolean")),
        Value::Number(_) => Err(DecodeError::UnexpectedShape("number")),
        Value::String(_) => Err(DecodeError::UnexpectedShape("string")),
    }
}

fn decode_tuple(items: Vec<Value>) -> Result<NotificationRecord, DecodeError> {
    let mut items = items.into_iter();

    let message = match items.next() {
        Some(Value::String(message)) => message,
        _ => return Err(DecodeError::MissingMessage),
    };

    let options = match items.next() {
        None | Some(Value::Null) => NotifyOptions::default(),
        Some(options @ Value::Object(_)) => {
            serde_json::from_value(options).map_err(DecodeError::InvalidOptions)?
        }
        Some(_) => return Err(DecodeError::UnexpectedShape("options must be an object")),
    };

    Ok(NotificationRecord::with_options(message, options))
}

/// Encode a record in the array form servers emit
///
/// # Errors
///
/// Returns the serialization error if the options cannot be encoded.
pub fn encode(record: &NotificationRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(&(&record.message, &record.options))
}
