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

//! Shared fixtures for `stream-bridge` integration tests.

mod harness;
mod recording_handler;

pub use harness::{init_tracing, wait_until, BridgeHarness, TEST_CLIENT_ID, TEST_CLUSTER_ID};
pub use recording_handler::RecordingHandler;
