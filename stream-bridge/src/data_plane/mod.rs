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

//! Data-plane layer.
//!
//! Owns the per-subscription delivery path: every message the transport
//! delivers is turned into a control-plane request on
//! `{base_topic}.{subject}`, and the outcome of that request decides whether
//! the message is acknowledged or left for redelivery.

pub(crate) mod delivery_listener;
pub(crate) mod redispatch;
