//! Typed control-plane requests.

use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::registry::{SubscriptionKey, SubscriptionOptions};
use crate::transport::adapter::validate_durable_name;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Subscribe,
    Unsubscribe,
    Suspend,
    Publish,
    List,
}

impl Command {
    pub fn parse(cmd: Option<&str>) -> BridgeResult<Self> {
        let cmd = cmd.ok_or_else(|| BridgeError::validation("request carries no cmd"))?;
        Self::from_str(cmd).map_err(|_| {
            BridgeError::fail_with_kind(
                ErrorKind::UnsupportedCommand,
                format!("unsupported command {cmd:?}"),
            )
        })
    }
}

/// Subjects are non-empty tokens without whitespace or wildcards.
pub fn validate_subject(subject: &str) -> BridgeResult<()> {
    if subject.is_empty() || subject.chars().any(|c| c.is_whitespace() || c == '*' || c == '>') {
        return Err(BridgeError::validation(format!(
            "invalid subject {subject:?}"
        )));
    }
    if subject.split('.').any(str::is_empty) {
        return Err(BridgeError::validation(format!(
            "subject {subject:?} contains an empty token"
        )));
    }
    Ok(())
}

/// Parses a request body into `T`, reporting missing or mistyped fields as
/// validation failures.
pub fn parse_body<T: DeserializeOwned>(body: &Map<String, Value>) -> BridgeResult<T> {
    serde_json::from_value(Value::Object(body.clone()))
        .map_err(|err| BridgeError::validation(format!("malformed request: {err}")))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub subject: String,
    #[serde(default)]
    pub options: SubscriptionOptions,
    /// Merged into every request redispatched for this subscription.
    #[serde(default, alias = "pattern", skip_serializing_if = "Option::is_none")]
    pub request_pattern: Option<Map<String, Value>>,
}

impl SubscribeRequest {
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: SubscriptionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_request_pattern(mut self, pattern: Map<String, Value>) -> Self {
        self.request_pattern = Some(pattern);
        self
    }

    pub fn validate(&self) -> BridgeResult<()> {
        validate_subject(&self.subject)?;
        validate_durable(self.options.durable_name.as_deref())
    }
}

fn validate_durable(durable_name: Option<&str>) -> BridgeResult<()> {
    durable_name.map_or(Ok(()), validate_durable_name)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityOptions {
    #[serde(default)]
    pub durable_name: Option<String>,
}

/// Names one subscription of the requesting client (`unsubscribe`, `suspend`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRef {
    pub subject: String,
    #[serde(default)]
    pub options: IdentityOptions,
}

impl SubscriptionRef {
    pub fn validate(&self) -> BridgeResult<()> {
        validate_subject(&self.subject)?;
        validate_durable(self.options.durable_name.as_deref())
    }

    pub fn key(&self, client_id: &str) -> SubscriptionKey {
        SubscriptionKey::new(
            &self.subject,
            self.options.durable_name.as_deref(),
            client_id,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PublishRequest {
    pub subject: String,
    pub data: Value,
}

impl PublishRequest {
    pub fn validate(&self) -> BridgeResult<()> {
        validate_subject(&self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_body, validate_subject, Command, PublishRequest, SubscribeRequest, SubscriptionRef};
    use crate::error::ErrorKind;
    use serde_json::{json, Value};

    fn body(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn unknown_command_is_unsupported() {
        assert_eq!(Command::parse(Some("list")).expect("list"), Command::List);
        assert_eq!(
            Command::parse(Some("replay")).expect_err("unknown").kind(),
            ErrorKind::UnsupportedCommand
        );
        assert_eq!(
            Command::parse(None).expect_err("missing").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn missing_subject_is_a_validation_error() {
        let err = parse_body::<SubscribeRequest>(&body(json!({ "options": {} })))
            .expect_err("subject required");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = parse_body::<PublishRequest>(&body(json!({ "subject": "orders" })))
            .expect_err("data required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn subscribe_accepts_pattern_alias_and_extra_fields() {
        let request = parse_body::<SubscribeRequest>(&body(json!({
            "subject": "orderCreated",
            "pattern": { "a": 1 },
            "trace": "ignored"
        })))
        .expect("valid request");

        assert_eq!(request.request_pattern.expect("pattern")["a"], 1);
        assert!(request.options.manual_acks);
    }

    #[test]
    fn identity_request_builds_durable_key() {
        let request = parse_body::<SubscriptionRef>(&body(json!({
            "subject": "orders",
            "options": { "durableName": "audit" }
        })))
        .expect("valid request");

        let key = request.key("client-a");
        assert_eq!(key.durable_name.as_deref(), Some("audit"));
        assert_eq!(key.client_id, "client-a");
    }

    #[test]
    fn invalid_durable_name_fails_request_validation() {
        let subscribe = parse_body::<SubscribeRequest>(&body(json!({
            "subject": "orders",
            "options": { "durableName": "bad.name" }
        })))
        .expect("well-formed request");
        assert_eq!(
            subscribe.validate().expect_err("dotted durable").kind(),
            ErrorKind::Validation
        );

        let target = parse_body::<SubscriptionRef>(&body(json!({
            "subject": "orders",
            "options": { "durableName": "" }
        })))
        .expect("well-formed request");
        assert_eq!(
            target.validate().expect_err("empty durable").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn subject_validation() {
        assert!(validate_subject("orders.created").is_ok());
        for invalid in ["", "orders created", "orders.*", "orders.>", "orders..created"] {
            assert!(validate_subject(invalid).is_err(), "{invalid:?} accepted");
        }
    }
}
