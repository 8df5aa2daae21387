/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Control-plane layer.
//!
//! Declares the request/reply surface the bridge plugs into ([`ControlPlane`],
//! [`RequestHandler`], [`ControlRequest`]), the command router registered on
//! the base and per-client topics, and the idempotent bookkeeping of lazily
//! registered client topics. [`local::LocalControlPlane`] is an in-process
//! implementation.
//!
//! ```
//! use std::sync::Arc;
//! use stream_bridge::control_plane::local::LocalControlPlane;
//! use stream_bridge::control_plane::{ControlPlane, ControlRequest};
//! use stream_bridge::transport::memory::InMemoryConnector;
//! use stream_bridge::{BridgeConfig, StreamBridge};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let control_plane = Arc::new(LocalControlPlane::new());
//! let bridge = StreamBridge::start(
//!     BridgeConfig::new("test-cluster", "test-client"),
//!     &InMemoryConnector::default(),
//!     control_plane.clone(),
//! )
//! .await
//! .unwrap();
//!
//! let reply = control_plane
//!     .act(ControlRequest::command("natss", "subscribe").with_field("subject", "orderCreated"))
//!     .await
//!     .unwrap();
//! assert_eq!(reply["options"]["manualAcks"], true);
//!
//! // The first subscription registers the client's control topic.
//! assert!(control_plane.has_topic("natss.clients.test-client").await);
//! let listed = control_plane
//!     .act(ControlRequest::command("natss.clients.test-client", "list"))
//!     .await
//!     .unwrap();
//! assert_eq!(listed.as_array().unwrap().len(), 1);
//! # bridge.shutdown().await.unwrap();
//! # });
//! ```

pub(crate) mod client_topics;
pub(crate) mod command_router;
pub mod local;

use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A request travelling through the control plane: the target topic, an
/// optional command name, and every other field of the payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlRequest {
    pub topic: String,
    pub cmd: Option<String>,
    pub body: Map<String, Value>,
}

impl ControlRequest {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            ..Default::default()
        }
    }

    pub fn command(topic: &str, cmd: &str) -> Self {
        Self {
            topic: topic.to_string(),
            cmd: Some(cmd.to_string()),
            body: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Splits a flat `{topic, cmd, ...}` payload into a request.
    pub fn from_value(value: Value) -> BridgeResult<Self> {
        let Value::Object(mut body) = value else {
            return Err(BridgeError::validation("request must be a JSON object"));
        };
        let topic = match body.remove("topic") {
            Some(Value::String(topic)) => topic,
            _ => return Err(BridgeError::validation("request carries no topic")),
        };
        let cmd = match body.remove("cmd") {
            None | Some(Value::Null) => None,
            Some(Value::String(cmd)) => Some(cmd),
            Some(other) => {
                return Err(BridgeError::validation(format!(
                    "cmd must be a string, got {other}"
                )))
            }
        };
        Ok(Self { topic, cmd, body })
    }

    /// Flat `{topic, cmd, ...}` form of the request.
    pub fn to_value(&self) -> Value {
        let mut flat = self.body.clone();
        flat.insert("topic".to_string(), Value::String(self.topic.clone()));
        if let Some(cmd) = &self.cmd {
            flat.insert("cmd".to_string(), Value::String(cmd.clone()));
        }
        Value::Object(flat)
    }
}

/// Handles requests addressed to one topic.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: ControlRequest) -> BridgeResult<Value>;
}

/// The request/reply framework the bridge is plugged into.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Registers `handler` for `topic`. Returns `false`, leaving the existing
    /// handler in place, when the topic is already served.
    async fn add(&self, topic: &str, handler: Arc<dyn RequestHandler>) -> BridgeResult<bool>;

    async fn has_topic(&self, topic: &str) -> bool;

    /// Dispatches `request` to the handler of its topic and awaits the reply.
    async fn act(&self, request: ControlRequest) -> BridgeResult<Value>;

    /// Wire form of [`act`](Self::act): takes a flat `{topic, cmd, ...}`
    /// payload and answers with the success payload or a structured
    /// `{kind, message}` error.
    async fn reply(&self, payload: Value) -> Result<Value, Value> {
        let request = ControlRequest::from_value(payload).map_err(|err| err.to_reply_value())?;
        self.act(request).await.map_err(|err| err.to_reply_value())
    }
}
