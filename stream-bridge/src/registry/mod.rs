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

//! Subscription-registry layer.
//!
//! Owns the subscription model, the identity key `(subject, durable name,
//! client id)` and the registry that enforces at most one live transport
//! handle per identity. Lifecycle transitions for one identity are serialized
//! through [`identity_locks`].

pub(crate) mod identity_locks;
mod subscription;
pub(crate) mod subscription_registry;

pub use subscription::{Subscription, SubscriptionKey, SubscriptionOptions, SubscriptionStatus};
pub use subscription_registry::SubscriptionRegistry;
