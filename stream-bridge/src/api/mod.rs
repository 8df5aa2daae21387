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

//! API facade layer.
//!
//! Typed request and reply shapes of the control-plane commands. Inbound
//! payloads are parsed into these structs at the router boundary; fields the
//! bridge does not read are ignored.
//!
//! ```
//! use stream_bridge::api::request::SubscribeRequest;
//!
//! let request: SubscribeRequest = serde_json::from_value(serde_json::json!({
//!     "subject": "orderCreated",
//!     "options": { "durableName": "audit" },
//!     "pattern": { "a": 1 }
//! }))
//! .unwrap();
//!
//! assert!(request.options.manual_acks);
//! assert_eq!(request.options.durable_name.as_deref(), Some("audit"));
//! assert!(request.request_pattern.is_some());
//! ```

pub mod request;
pub mod response;
