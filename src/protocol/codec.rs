use serde_json::Value;

use super::request::Request;
use super::response::RawResponse;
use crate::error::DriverError;

/// Upper bound for a single frame in either direction.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Encode a request as one JSON text frame.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, DriverError> {
    let payload = serde_json::to_vec(request)
        .map_err(|e| DriverError::Protocol(format!("Serialization failed: {}", e)))?;

    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(DriverError::MessageTooLarge(payload.len()));
    }

    Ok(payload)
}

/// Decode one response frame. The frame must be a JSON object.
pub fn decode_response(data: &[u8]) -> Result<RawResponse, DriverError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(DriverError::MessageTooLarge(data.len()));
    }

    let value: Value = serde_json::from_slice(data)
        .map_err(|e| DriverError::Protocol(format!("Deserialization failed: {}", e)))?;

    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| DriverError::Protocol(format!("Deserialization failed: {}", e))),
        _ => Err(DriverError::Protocol(
            "Deserialization failed: frame is not a JSON object".to_string(),
        )),
    }
}
