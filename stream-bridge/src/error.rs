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

//! Error taxonomy shared by every bridge layer.

use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Stable error kinds surfaced to control-plane callers.
///
/// The rendered names are part of the reply contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
pub enum ErrorKind {
    #[strum(serialize = "ValidationError")]
    Validation,
    #[strum(serialize = "DuplicateSubscriptionError")]
    DuplicateSubscription,
    #[strum(serialize = "NotFoundError")]
    NotFound,
    #[strum(serialize = "ConnectionError")]
    Connection,
    #[strum(serialize = "TimeoutError")]
    Timeout,
    #[strum(serialize = "PublishError")]
    Publish,
    #[strum(serialize = "SubscribeError")]
    Subscribe,
    #[strum(serialize = "UnsubscribeError")]
    Unsubscribe,
    #[strum(serialize = "UnsupportedCommandError")]
    UnsupportedCommand,
    /// No handler is registered on the control plane for a topic.
    #[strum(serialize = "NoHandlerError")]
    NoHandler,
    /// A control-plane handler completed with an error.
    #[strum(serialize = "HandlerError")]
    Handler,
    /// The bridge could not build a reply or payload of its own.
    #[strum(serialize = "InternalError")]
    Internal,
}

/// Error returned by every fallible bridge operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BridgeError {
    kind: ErrorKind,
    message: String,
}

impl BridgeError {
    pub fn fail_with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::fail_with_kind(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::fail_with_kind(ErrorKind::NotFound, message)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::fail_with_kind(ErrorKind::Handler, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured `{kind, message}` reply handed back through the control plane.
    ///
    /// [`ControlPlane::reply`](crate::control_plane::ControlPlane::reply)
    /// applies it to every failed request.
    pub fn to_reply_value(&self) -> Value {
        serde_json::json!({
            "kind": self.kind.as_ref(),
            "message": self.message,
        })
    }
}

/// Only encoding goes through this conversion. Malformed input is reported
/// as a validation error where requests are parsed.
impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::fail_with_kind(ErrorKind::Internal, format!("unable to encode JSON: {err}"))
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
