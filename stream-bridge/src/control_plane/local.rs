//! In-process control plane routing requests to handlers by topic.

use crate::control_plane::{ControlPlane, ControlRequest, RequestHandler};
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace};

const COMPONENT: &str = "local_control_plane";

#[derive(Default)]
pub struct LocalControlPlane {
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
    act_timeout: Option<Duration>,
}

impl LocalControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every `act` whose handler does not reply within `timeout`.
    pub fn with_act_timeout(timeout: Duration) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            act_timeout: Some(timeout),
        }
    }

    /// Drops the handler of `topic`. Returns whether one was registered.
    pub async fn remove(&self, topic: &str) -> bool {
        self.handlers.write().await.remove(topic).is_some()
    }

    pub async fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        topics.sort();
        topics
    }
}

#[async_trait]
impl ControlPlane for LocalControlPlane {
    async fn add(&self, topic: &str, handler: Arc<dyn RequestHandler>) -> BridgeResult<bool> {
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(topic) {
            debug!(component = COMPONENT, topic, "topic already has a handler");
            return Ok(false);
        }
        handlers.insert(topic.to_string(), handler);
        debug!(component = COMPONENT, topic, "handler added");
        Ok(true)
    }

    async fn has_topic(&self, topic: &str) -> bool {
        self.handlers.read().await.contains_key(topic)
    }

    async fn act(&self, request: ControlRequest) -> BridgeResult<Value> {
        let handler = self
            .handlers
            .read()
            .await
            .get(&request.topic)
            .cloned()
            .ok_or_else(|| {
                BridgeError::fail_with_kind(
                    ErrorKind::NoHandler,
                    format!("no handler registered for topic {:?}", request.topic),
                )
            })?;

        trace!(
            component = COMPONENT,
            topic = %request.topic,
            cmd = request.cmd.as_deref().unwrap_or(""),
            "dispatching request"
        );

        match self.act_timeout {
            Some(timeout) => {
                let topic = request.topic.clone();
                tokio::time::timeout(timeout, handler.handle(request))
                    .await
                    .map_err(|_| {
                        BridgeError::fail_with_kind(
                            ErrorKind::Timeout,
                            format!("handler for {topic:?} did not reply in time"),
                        )
                    })?
            }
            None => handler.handle(request).await,
        }
    }
}
