//! JSON text codec for both directions of the channel.
//!
//! The client encodes [`Request`]s and decodes [`Frame`]s. The inverse pair
//! ([`decode_request`], [`encode_frame`]) serves mock backends and keeps the
//! schema symmetric.

use serde_json::Value;

use crate::error::{DecodeError, EncodeError};
use crate::frame::Frame;
use crate::request::Request;

/// Serializes an outbound request into one wire frame.
pub fn encode_request(request: &Request) -> Result<String, EncodeError> {
    serde_json::to_string(request).map_err(|source| EncodeError::new(request.request_type(), source))
}

/// Parses one inbound wire frame.
///
/// Unknown `type` tags decode to [`Frame::Unknown`]; only malformed payloads
/// are errors.
pub fn decode_frame(text: &str) -> Result<Frame, DecodeError> {
    let (frame_type, value) = tagged_value(text)?;
    if !Frame::is_known_type(&frame_type) {
        return Ok(Frame::Unknown { frame_type });
    }

    serde_json::from_value(value).map_err(|source| DecodeError::Shape { frame_type, source })
}

/// Parses one outbound wire frame (backend side of the channel).
pub fn decode_request(text: &str) -> Result<Request, DecodeError> {
    let (request_type, value) = tagged_value(text)?;
    if !Request::KNOWN_TYPES.contains(&request_type.as_str()) {
        return Err(DecodeError::UnsupportedRequest(request_type));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::Shape {
        frame_type: request_type,
        source,
    })
}

/// Serializes an inbound frame (backend side of the channel).
pub fn encode_frame(frame: &Frame) -> Result<String, EncodeError> {
    match frame {
        Frame::Unknown { frame_type } => {
            let mut object = serde_json::Map::new();
            object.insert("type".to_owned(), Value::String(frame_type.clone()));
            serde_json::to_string(&Value::Object(object))
                .map_err(|source| EncodeError::new(frame_type.as_str(), source))
        }
        known => serde_json::to_string(known)
            .map_err(|source| EncodeError::new(known.frame_type(), source)),
    }
}

fn tagged_value(text: &str) -> Result<(String, Value), DecodeError> {
    let value = serde_json::from_str::<Value>(text).map_err(DecodeError::Json)?;
    let frame_type = value
        .get("type")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or(DecodeError::MissingType)?;
    Ok((frame_type, value))
}
