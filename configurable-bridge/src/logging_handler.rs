use async_trait::async_trait;
use serde_json::Value;
use stream_bridge::control_plane::{ControlRequest, RequestHandler};
use stream_bridge::BridgeResult;
use tracing::info;

/// Serves a redispatch topic by logging each delivery.
pub(crate) struct LoggingHandler;

#[async_trait]
impl RequestHandler for LoggingHandler {
    async fn handle(&self, request: ControlRequest) -> BridgeResult<Value> {
        let data = request.body.get("data").cloned().unwrap_or(Value::Null);
        info!(
            topic = %request.topic,
            sequence = %data["sequence"],
            message = %data["message"],
            "RECEIVED"
        );
        Ok(Value::Bool(true))
    }
}
