use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use stream_bridge::control_plane::{ControlRequest, RequestHandler};
use stream_bridge::{BridgeError, BridgeResult};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Control-plane handler that records every request it receives.
///
/// The first `failures` requests are answered with a handler error, which
/// withholds the acknowledgment of a redispatched delivery.
pub struct RecordingHandler {
    received: Mutex<Vec<ControlRequest>>,
    failures: Mutex<usize>,
    delay: Duration,
    notify: Notify,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            failures: Mutex::new(failures),
            delay: Duration::ZERO,
            notify: Notify::new(),
        }
    }

    /// Replies only after `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub async fn received(&self) -> Vec<ControlRequest> {
        self.received.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.received.lock().await.len()
    }

    /// Waits until at least `count` requests arrived, or `timeout`
    /// elapses, and returns what was recorded.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ControlRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            let received = self.received().await;
            if received.len() >= count {
                return received;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.received().await;
            }
        }
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    async fn handle(&self, request: ControlRequest) -> BridgeResult<Value> {
        debug!(topic = %request.topic, "recording handler received request");
        self.received.lock().await.push(request);
        self.notify.notify_waiters();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut failures = self.failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(BridgeError::handler("recording handler asked to fail"));
        }
        Ok(Value::Bool(true))
    }
}
