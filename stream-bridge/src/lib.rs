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

//! # stream-bridge
//!
//! `stream-bridge` plugs a durable streaming transport into a request/reply
//! control plane. Commands sent to the base topic (`natss` by default)
//! subscribe, suspend, unsubscribe, list and publish; every message the
//! transport delivers on a subscription is redispatched as a request to
//! `{base_topic}.{subject}` and acknowledged once that request succeeds.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
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
//! control_plane
//!     .act(ControlRequest::command("natss", "subscribe").with_field("subject", "news"))
//!     .await
//!     .unwrap();
//! let ack = control_plane
//!     .act(
//!         ControlRequest::command("natss", "publish")
//!             .with_field("subject", "news")
//!             .with_field("data", json!({ "a": 1 })),
//!     )
//!     .await
//!     .unwrap();
//! assert!(ack["guid"].is_string());
//!
//! bridge.shutdown().await.unwrap();
//! # });
//! ```
//!
//! ## Lifecycle contract
//!
//! Subscribing an identity twice is an error until it is suspended or
//! unsubscribed. Suspending keeps the durable position; subscribing again
//! resumes it with the options given the first time.
//!
//! ```
//! use std::sync::Arc;
//! use stream_bridge::api::request::SubscribeRequest;
//! use stream_bridge::control_plane::local::LocalControlPlane;
//! use stream_bridge::transport::memory::InMemoryConnector;
//! use stream_bridge::{BridgeConfig, ErrorKind, StreamBridge, SubscriptionOptions};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let bridge = StreamBridge::start(
//!     BridgeConfig::new("test-cluster", "test-client"),
//!     &InMemoryConnector::default(),
//!     Arc::new(LocalControlPlane::new()),
//! )
//! .await
//! .unwrap();
//!
//! let request = SubscribeRequest::new("orderCreated")
//!     .with_options(SubscriptionOptions::durable("audit"));
//! bridge.subscribe(request.clone()).await.unwrap();
//!
//! let duplicate = bridge.subscribe(request.clone()).await.unwrap_err();
//! assert_eq!(duplicate.kind(), ErrorKind::DuplicateSubscription);
//!
//! let key = bridge.key("orderCreated", Some("audit"));
//! bridge.suspend(&key).await.unwrap();
//! bridge.subscribe(request).await.unwrap();
//! bridge.unsubscribe(&key).await.unwrap();
//!
//! let missing = bridge.unsubscribe(&key).await.unwrap_err();
//! assert_eq!(missing.kind(), ErrorKind::NotFound);
//! # bridge.shutdown().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: typed command requests and replies
//! - Control plane: control-plane traits, command router and client topics
//! - Registry: subscription model and identity-keyed registry
//! - Data plane: delivery listener and redispatch shape
//! - Transport: streaming capability traits, adapter and in-memory transport
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries/tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

pub mod api;
mod bridge;
pub use bridge::StreamBridge;

pub mod config;
pub use config::BridgeConfig;

pub mod control_plane;
mod data_plane;

mod error;
pub use error::{BridgeError, BridgeResult, ErrorKind};

#[doc(hidden)]
pub mod observability;

pub mod registry;
pub use registry::{
    Subscription, SubscriptionKey, SubscriptionOptions, SubscriptionRegistry, SubscriptionStatus,
};

pub mod transport;
