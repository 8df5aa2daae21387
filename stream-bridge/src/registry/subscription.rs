//! Subscription model and identity key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

fn default_manual_acks() -> bool {
    true
}

/// Options of one subscription.
///
/// Keys the bridge does not interpret are kept in `passthrough` and handed to
/// the transport untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOptions {
    #[serde(default = "default_manual_acks")]
    pub manual_acks: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durable_name: Option<String>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            manual_acks: default_manual_acks(),
            durable_name: None,
            passthrough: Map::new(),
        }
    }
}

impl SubscriptionOptions {
    pub fn durable(durable_name: &str) -> Self {
        Self {
            durable_name: Some(durable_name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_passthrough(mut self, key: &str, value: Value) -> Self {
        self.passthrough.insert(key.to_string(), value);
        self
    }

    pub fn passthrough_u64(&self, key: &str) -> Option<u64> {
        self.passthrough.get(key).and_then(Value::as_u64)
    }

    pub fn passthrough_bool(&self, key: &str) -> Option<bool> {
        self.passthrough.get(key).and_then(Value::as_bool)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Suspended,
    Closed,
}

/// Identity of a subscription: `(subject, durable name, client id)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub subject: String,
    pub durable_name: Option<String>,
    pub client_id: String,
}

impl SubscriptionKey {
    pub fn new(subject: &str, durable_name: Option<&str>, client_id: &str) -> Self {
        Self {
            subject: subject.to_string(),
            durable_name: durable_name.map(str::to_string),
            client_id: client_id.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    pub subject: String,
    pub client_id: String,
    pub options: SubscriptionOptions,
    pub request_pattern: Option<Map<String, Value>>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(
            &self.subject,
            self.options.durable_name.as_deref(),
            &self.client_id,
        )
    }
}
