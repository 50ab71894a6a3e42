use serde::de::DeserializeOwned;

use crate::ProtocolError;

/// Parse an internally tagged frame, rejecting tags outside `known` before
/// attempting the typed decode.
pub(crate) fn parse_tagged<T: DeserializeOwned>(
    text: &str,
    known: &[&str],
) -> Result<T, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let tag = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !known.contains(&tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}

/// Serialize an outbound frame to its JSON text form.
pub(crate) fn encode<T: serde::Serialize>(frame: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(|e| ProtocolError::Encode(e.to_string()))
}
