//! Router shim between control-plane requests and the lifecycle manager.

use crate::api::request::{
    parse_body, Command, PublishRequest, SubscribeRequest, SubscriptionRef,
};
use crate::api::response::SubscriptionReply;
use crate::bridge::BridgeInner;
use crate::control_plane::{ControlRequest, RequestHandler};
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::observability::events;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const COMPONENT: &str = "command_router";

/// Which topic a router serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RouterScope {
    /// `{base_topic}`: every command, on behalf of the bridge's own client.
    Base,
    /// `{base_topic}.clients.{client_id}`: suspend, unsubscribe and list for
    /// that client.
    Client(String),
}

impl RouterScope {
    fn accepts(&self, command: Command) -> bool {
        match self {
            RouterScope::Base => true,
            RouterScope::Client(_) => matches!(
                command,
                Command::Suspend | Command::Unsubscribe | Command::List
            ),
        }
    }
}

pub(crate) struct CommandRouter {
    bridge: Weak<BridgeInner>,
    scope: RouterScope,
}

impl CommandRouter {
    pub(crate) fn new(bridge: Weak<BridgeInner>, scope: RouterScope) -> Self {
        Self { bridge, scope }
    }

    fn bridge(&self) -> BridgeResult<Arc<BridgeInner>> {
        self.bridge.upgrade().ok_or_else(|| {
            BridgeError::fail_with_kind(ErrorKind::Connection, "bridge is no longer running")
        })
    }

    fn client_id<'a>(&'a self, bridge: &'a BridgeInner) -> &'a str {
        match &self.scope {
            RouterScope::Base => bridge.client_id(),
            RouterScope::Client(client_id) => client_id,
        }
    }

    fn rejected(&self, request: &ControlRequest, err: BridgeError) -> BridgeError {
        warn!(
            event = events::COMMAND_REJECTED,
            component = COMPONENT,
            topic = %request.topic,
            cmd = request.cmd.as_deref().unwrap_or(""),
            kind = %err.kind(),
            "command rejected"
        );
        err
    }

    async fn dispatch(&self, command: Command, request: &ControlRequest) -> BridgeResult<Value> {
        let bridge = self.bridge()?;
        let client_id = self.client_id(&bridge);

        match command {
            Command::Subscribe => {
                let subscribe: SubscribeRequest = parse_body(&request.body)?;
                subscribe.validate()?;
                let subscription = bridge.subscribe(subscribe).await?;
                Ok(serde_json::to_value(SubscriptionReply::from(&subscription))?)
            }
            Command::Unsubscribe => {
                let target: SubscriptionRef = parse_body(&request.body)?;
                target.validate()?;
                bridge.unsubscribe(&target.key(client_id)).await?;
                Ok(Value::Bool(true))
            }
            Command::Suspend => {
                let target: SubscriptionRef = parse_body(&request.body)?;
                target.validate()?;
                bridge.suspend(&target.key(client_id)).await?;
                Ok(Value::Bool(true))
            }
            Command::Publish => {
                let publish: PublishRequest = parse_body(&request.body)?;
                publish.validate()?;
                let ack = bridge.publish(&publish.subject, &publish.data).await?;
                Ok(serde_json::to_value(ack)?)
            }
            Command::List => {
                let replies: Vec<SubscriptionReply> = bridge
                    .list(client_id)
                    .await
                    .iter()
                    .map(SubscriptionReply::from)
                    .collect();
                Ok(serde_json::to_value(replies)?)
            }
        }
    }
}

#[async_trait]
impl RequestHandler for CommandRouter {
    async fn handle(&self, request: ControlRequest) -> BridgeResult<Value> {
        let command = match Command::parse(request.cmd.as_deref()) {
            Ok(command) if self.scope.accepts(command) => command,
            Ok(command) => {
                return Err(self.rejected(
                    &request,
                    BridgeError::fail_with_kind(
                        ErrorKind::UnsupportedCommand,
                        format!("{command} is not served on topic {:?}", request.topic),
                    ),
                ))
            }
            Err(err) => return Err(self.rejected(&request, err)),
        };

        debug!(
            event = events::COMMAND_RECEIVED,
            component = COMPONENT,
            topic = %request.topic,
            cmd = %command,
            "command received"
        );

        self.dispatch(command, &request).await.map_err(|err| {
            warn!(
                event = events::COMMAND_FAILED,
                component = COMPONENT,
                topic = %request.topic,
                cmd = %command,
                kind = %err.kind(),
                err = %err,
                "command failed"
            );
            err
        })
    }
}
