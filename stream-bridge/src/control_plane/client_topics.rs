//! Lazily registered per-client control topics.

use crate::control_plane::{ControlPlane, RequestHandler};
use crate::error::BridgeResult;
use crate::observability::events;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const COMPONENT: &str = "client_topics";

/// `{base_topic}.clients.{client_id}`
pub(crate) fn client_topic(base_topic: &str, client_id: &str) -> String {
    format!("{base_topic}.clients.{client_id}")
}

/// Topics this bridge has registered on the control plane. Registrations are
/// kept for the lifetime of the bridge.
#[derive(Default)]
pub(crate) struct ClientTopics {
    registered: Mutex<HashSet<String>>,
}

impl ClientTopics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the handler built by `make_handler` on `topic` unless this
    /// bridge already did. Returns `true` when a registration happened.
    pub(crate) async fn ensure<F>(
        &self,
        control_plane: &dyn ControlPlane,
        topic: &str,
        make_handler: F,
    ) -> BridgeResult<bool>
    where
        F: FnOnce() -> Arc<dyn RequestHandler>,
    {
        let mut registered = self.registered.lock().await;
        if registered.contains(topic) {
            debug!(
                event = events::CLIENT_TOPIC_REUSED,
                component = COMPONENT,
                topic,
                "client topic already registered"
            );
            return Ok(false);
        }

        let added = control_plane.add(topic, make_handler()).await?;
        registered.insert(topic.to_string());
        info!(
            event = events::CLIENT_TOPIC_REGISTERED,
            component = COMPONENT,
            topic,
            added,
            "client topic registered"
        );
        Ok(added)
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, topic: &str) -> bool {
        self.registered.lock().await.contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::{client_topic, ClientTopics};
    use crate::control_plane::local::LocalControlPlane;
    use crate::control_plane::{ControlPlane, ControlRequest, RequestHandler};
    use crate::error::BridgeResult;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl RequestHandler for Noop {
        async fn handle(&self, _request: ControlRequest) -> BridgeResult<Value> {
            Ok(Value::Bool(true))
        }
    }

    #[test]
    fn client_topic_is_derived_from_base_and_client() {
        assert_eq!(client_topic("natss", "test-client"), "natss.clients.test-client");
    }

    #[tokio::test]
    async fn ensure_registers_once() {
        let control_plane = LocalControlPlane::new();
        let topics = ClientTopics::new();
        let built = AtomicUsize::new(0);
        let make = || {
            built.fetch_add(1, Ordering::SeqCst);
            Arc::new(Noop) as Arc<dyn RequestHandler>
        };

        assert!(topics
            .ensure(&control_plane, "natss.clients.a", make)
            .await
            .expect("first"));
        assert!(!topics
            .ensure(&control_plane, "natss.clients.a", make)
            .await
            .expect("second"));

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(topics.contains("natss.clients.a").await);
        assert!(control_plane.has_topic("natss.clients.a").await);
    }
}
