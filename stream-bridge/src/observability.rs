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

//! Stable `event=` names and field formatters used by the `tracing` calls
//! across the crate. Log-scraping tooling matches on these names.

pub mod events {
    pub const BRIDGE_STARTED: &str = "bridge_started";
    pub const BRIDGE_SHUTDOWN: &str = "bridge_shutdown";

    pub const COMMAND_RECEIVED: &str = "command_received";
    pub const COMMAND_REJECTED: &str = "command_rejected";
    pub const COMMAND_FAILED: &str = "command_failed";

    pub const CLIENT_TOPIC_REGISTERED: &str = "client_topic_registered";
    pub const CLIENT_TOPIC_REUSED: &str = "client_topic_reused";

    pub const SUBSCRIPTION_ACTIVATED: &str = "subscription_activated";
    pub const SUBSCRIPTION_RESUMED: &str = "subscription_resumed";
    pub const SUBSCRIPTION_DUPLICATE: &str = "subscription_duplicate";
    pub const SUBSCRIPTION_SUSPENDED: &str = "subscription_suspended";
    pub const SUBSCRIPTION_CLOSED: &str = "subscription_closed";
    pub const SUBSCRIPTION_OPEN_FAILED: &str = "subscription_open_failed";

    pub const PUBLISH_OK: &str = "publish_ok";
    pub const PUBLISH_FAILED: &str = "publish_failed";

    pub const TRANSPORT_TIMEOUT: &str = "transport_timeout";

    pub const DELIVERY_RECEIVED: &str = "delivery_received";
    pub const DELIVERY_ACKED: &str = "delivery_acked";
    pub const DELIVERY_DEFERRED: &str = "delivery_deferred";
    pub const DELIVERY_ACK_FAILED: &str = "delivery_ack_failed";
}

pub mod fields {
    use crate::registry::SubscriptionKey;

    /// Renders an identity as `subject[durable]@client`.
    pub fn format_key(key: &SubscriptionKey) -> String {
        match key.durable_name.as_deref() {
            Some(durable) => format!("{}[{}]@{}", key.subject, durable, key.client_id),
            None => format!("{}@{}", key.subject, key.client_id),
        }
    }

    pub fn format_duration_ms(duration: std::time::Duration) -> u128 {
        duration.as_millis()
    }
}
