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

//! Streaming-transport layer.
//!
//! Declares the capability surface the bridge needs from a durable streaming
//! client: connect, publish, subscribe with manual acknowledgment, close a
//! subscription handle while keeping its durable position, and unsubscribe.
//! [`adapter::TransportAdapter`] wraps a connection with timeouts and maps
//! failures into [`crate::ErrorKind`]. [`memory`] provides an in-process
//! reference implementation.

pub mod adapter;
pub mod memory;

use crate::config::ConnectionConfig;
use crate::registry::SubscriptionOptions;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Failure reported by a streaming client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Rejected(String),
}

/// Acknowledgment metadata returned by a successful publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishAck {
    pub guid: String,
}

#[async_trait]
pub trait StreamingConnector: Send + Sync {
    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn StreamingConnection>, TransportError>;
}

/// One shared connection to the streaming transport.
#[async_trait]
pub trait StreamingConnection: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<PublishAck, TransportError>;

    /// Starts delivery for `subject` to `listener`. With a durable name, the
    /// position is resumed from the transport's durable state.
    async fn subscribe(
        &self,
        subject: &str,
        options: &SubscriptionOptions,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Arc<dyn SubscriptionHandle>, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// A live subscription on the transport.
#[async_trait]
pub trait SubscriptionHandle: Send + Sync {
    fn subject(&self) -> &str;

    fn is_closed(&self) -> bool;

    /// Stops delivery and discards durable state.
    async fn unsubscribe(&self) -> Result<(), TransportError>;

    /// Stops delivery and keeps durable state.
    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, message: StreamMessage);
}

#[async_trait]
pub trait MessageAcker: Send + Sync {
    async fn ack(&self, sequence: u64) -> Result<(), TransportError>;
}

/// A message delivered by the transport.
///
/// Under manual acknowledgment the transport redelivers the message after its
/// ack-wait unless [`StreamMessage::ack`] is called.
#[derive(Clone)]
pub struct StreamMessage {
    pub subject: String,
    pub sequence: u64,
    pub data: Arc<Vec<u8>>,
    pub redelivered: bool,
    pub timestamp: SystemTime,
    acker: Arc<dyn MessageAcker>,
}

impl StreamMessage {
    pub fn new(
        subject: &str,
        sequence: u64,
        data: Arc<Vec<u8>>,
        redelivered: bool,
        timestamp: SystemTime,
        acker: Arc<dyn MessageAcker>,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            sequence,
            data,
            redelivered,
            timestamp,
            acker,
        }
    }

    pub async fn ack(&self) -> Result<(), TransportError> {
        self.acker.ack(self.sequence).await
    }
}

impl Debug for StreamMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMessage")
            .field("subject", &self.subject)
            .field("sequence", &self.sequence)
            .field("len", &self.data.len())
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}
