//! Shape of the request a delivered message is redispatched as.

use crate::control_plane::ControlRequest;
use crate::transport::StreamMessage;
use serde_json::{json, Map, Value};

/// JSON payloads are decoded; anything else is carried as a lossy UTF-8
/// string.
pub(crate) fn decode_payload(data: &[u8]) -> Value {
    serde_json::from_slice(data)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(data).into_owned()))
}

/// Builds `{...pattern, data: {message, sequence}}` addressed to `topic`.
///
/// A `cmd` in the pattern becomes the request command. A `topic` in the
/// pattern is ignored, and `data` always carries the delivery.
pub(crate) fn build_redispatch_request(
    topic: &str,
    pattern: Option<&Map<String, Value>>,
    message: &StreamMessage,
) -> ControlRequest {
    let mut request = ControlRequest::new(topic);
    for (key, value) in pattern.into_iter().flatten() {
        match (key.as_str(), value) {
            ("topic", _) => {}
            ("cmd", Value::String(cmd)) => request.cmd = Some(cmd.clone()),
            _ => {
                request.body.insert(key.clone(), value.clone());
            }
        }
    }
    request.body.insert(
        "data".to_string(),
        json!({
            "message": decode_payload(&message.data),
            "sequence": message.sequence,
        }),
    );
    request
}
