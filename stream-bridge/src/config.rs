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

//! Bridge configuration.

use crate::api::request::SubscribeRequest;
use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_TOPIC: &str = "natss";
pub const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 5_000;

fn default_base_topic() -> String {
    DEFAULT_BASE_TOPIC.to_string()
}

fn default_transport_timeout_ms() -> u64 {
    DEFAULT_TRANSPORT_TIMEOUT_MS
}

/// Settings handed to a [`crate::transport::StreamingConnector`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub cluster_id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    pub cluster_id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,
    /// Bound for redispatching a delivered message; unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout_ms: Option<u64>,
    /// Subscriptions established when the bridge starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<SubscribeRequest>,
}

impl BridgeConfig {
    pub fn new(cluster_id: &str, client_id: &str) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            client_id: client_id.to_string(),
            url: None,
            base_topic: default_base_topic(),
            transport_timeout_ms: default_transport_timeout_ms(),
            dispatch_timeout_ms: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_base_topic(mut self, base_topic: &str) -> Self {
        self.base_topic = base_topic.to_string();
        self
    }

    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            cluster_id: self.cluster_id.clone(),
            client_id: self.client_id.clone(),
            url: self.url.clone(),
        }
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.cluster_id.trim().is_empty() {
            return Err(BridgeError::validation("clusterId must not be empty"));
        }
        if !is_valid_token(&self.client_id) {
            return Err(BridgeError::validation(format!(
                "clientId {:?} must be a non-empty token without whitespace or dots",
                self.client_id
            )));
        }
        if self.base_topic.trim().is_empty() || self.base_topic.contains(char::is_whitespace) {
            return Err(BridgeError::validation(format!(
                "baseTopic {:?} must be non-empty and contain no whitespace",
                self.base_topic
            )));
        }
        if self.transport_timeout_ms == 0 {
            return Err(BridgeError::validation("transportTimeoutMs must be positive"));
        }
        Ok(())
    }

    /// Parses a JSON5 document into a validated configuration.
    pub fn from_json5(document: &str) -> BridgeResult<Self> {
        let config: Self = json5::from_str(document)
            .map_err(|err| BridgeError::validation(format!("Unable to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn is_valid_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::{BridgeConfig, DEFAULT_BASE_TOPIC};
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn json5_config_fills_defaults() {
        let config = BridgeConfig::from_json5(
            r#"{
                // comments are allowed
                clusterId: "test-cluster",
                clientId: "test-client",
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.base_topic, DEFAULT_BASE_TOPIC);
        assert_eq!(config.transport_timeout(), Duration::from_secs(5));
        assert_eq!(config.dispatch_timeout(), None);
        assert!(config.subscriptions.is_empty());
    }

    #[test]
    fn json5_config_reads_static_subscriptions() {
        let config = BridgeConfig::from_json5(
            r#"{
                clusterId: "test-cluster",
                clientId: "test-client",
                baseTopic: "orders",
                subscriptions: [
                    { subject: "orderCreated", options: { durableName: "audit" } },
                ],
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.base_topic, "orders");
        assert_eq!(config.subscriptions.len(), 1);
        assert_eq!(
            config.subscriptions[0].options.durable_name.as_deref(),
            Some("audit")
        );
    }

    #[test]
    fn dotted_client_id_is_rejected() {
        let err = BridgeConfig::new("cluster", "bad.client")
            .validate()
            .expect_err("dotted client id");

        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn oversized_transport_timeout_saturates() {
        let config =
            BridgeConfig::new("cluster", "client").with_transport_timeout(Duration::MAX);

        assert_eq!(config.transport_timeout_ms, u64::MAX);
        assert_eq!(
            config.transport_timeout(),
            Duration::from_millis(u64::MAX)
        );
    }
}
