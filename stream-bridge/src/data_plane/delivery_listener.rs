//! Transport listener that redispatches deliveries through the control plane.

use crate::control_plane::ControlPlane;
use crate::data_plane::redispatch::build_redispatch_request;
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::observability::{events, fields};
use crate::transport::{MessageListener, StreamMessage};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

const COMPONENT: &str = "delivery_listener";

/// What happens to a delivered message once its handler has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Acknowledgement {
    Ack,
    /// Withhold the ack so the transport redelivers after its ack-wait.
    Defer,
}

pub(crate) struct DeliveryListener {
    control_plane: Arc<dyn ControlPlane>,
    topic: String,
    request_pattern: Option<Map<String, Value>>,
    manual_acks: bool,
    dispatch_timeout: Option<Duration>,
}

impl DeliveryListener {
    pub(crate) fn new(
        control_plane: Arc<dyn ControlPlane>,
        topic: String,
        request_pattern: Option<Map<String, Value>>,
        manual_acks: bool,
        dispatch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            control_plane,
            topic,
            request_pattern,
            manual_acks,
            dispatch_timeout,
        }
    }

    async fn dispatch(&self, message: &StreamMessage) -> BridgeResult<Value> {
        let request =
            build_redispatch_request(&self.topic, self.request_pattern.as_ref(), message);
        let Some(timeout) = self.dispatch_timeout else {
            return self.control_plane.act(request).await;
        };
        tokio::time::timeout(timeout, self.control_plane.act(request))
            .await
            .unwrap_or_else(|_| {
                Err(BridgeError::fail_with_kind(
                    ErrorKind::Timeout,
                    format!(
                        "handler on {:?} did not reply within {}ms",
                        self.topic,
                        fields::format_duration_ms(timeout)
                    ),
                ))
            })
    }

    pub(crate) async fn decide(&self, message: &StreamMessage) -> Acknowledgement {
        match self.dispatch(message).await {
            Ok(_) => Acknowledgement::Ack,
            Err(err) => {
                warn!(
                    event = events::DELIVERY_DEFERRED,
                    component = COMPONENT,
                    topic = %self.topic,
                    subject = %message.subject,
                    sequence = message.sequence,
                    kind = %err.kind(),
                    err = %err,
                    "handler failed, message left for redelivery"
                );
                Acknowledgement::Defer
            }
        }
    }
}

#[async_trait]
impl MessageListener for DeliveryListener {
    async fn on_message(&self, message: StreamMessage) {
        debug!(
            event = events::DELIVERY_RECEIVED,
            component = COMPONENT,
            topic = %self.topic,
            subject = %message.subject,
            sequence = message.sequence,
            redelivered = message.redelivered,
            "message delivered"
        );

        if self.decide(&message).await == Acknowledgement::Defer {
            return;
        }
        if !self.manual_acks {
            trace!(
                component = COMPONENT,
                sequence = message.sequence,
                "transport acknowledges on its own"
            );
            return;
        }

        match message.ack().await {
            Ok(()) => debug!(
                event = events::DELIVERY_ACKED,
                component = COMPONENT,
                subject = %message.subject,
                sequence = message.sequence,
                "message acknowledged"
            ),
            Err(err) => warn!(
                event = events::DELIVERY_ACK_FAILED,
                component = COMPONENT,
                subject = %message.subject,
                sequence = message.sequence,
                err = %err,
                "unable to acknowledge message"
            ),
        }
    }
}
