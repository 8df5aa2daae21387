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

//! Subscription lifecycle manager.

use crate::api::request::SubscribeRequest;
use crate::config::BridgeConfig;
use crate::control_plane::client_topics::{client_topic, ClientTopics};
use crate::control_plane::command_router::{CommandRouter, RouterScope};
use crate::control_plane::{ControlPlane, RequestHandler};
use crate::data_plane::delivery_listener::DeliveryListener;
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::observability::{events, fields};
use crate::registry::identity_locks::IdentityLocks;
use crate::registry::{
    Subscription, SubscriptionKey, SubscriptionRegistry, SubscriptionStatus,
};
use crate::transport::adapter::TransportAdapter;
use crate::transport::{PublishAck, StreamingConnector, SubscriptionHandle};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

const COMPONENT: &str = "stream_bridge";

/// Plugs a streaming transport into a control plane.
///
/// `start` connects the transport and registers the command router on the
/// base topic. Subscriptions opened afterwards redispatch every delivered
/// message to `{base_topic}.{subject}` on the same control plane.
#[derive(Clone)]
pub struct StreamBridge {
    inner: Arc<BridgeInner>,
}

pub(crate) struct BridgeInner {
    me: Weak<BridgeInner>,
    config: BridgeConfig,
    transport: TransportAdapter,
    registry: SubscriptionRegistry,
    locks: IdentityLocks,
    client_topics: ClientTopics,
    control_plane: Arc<dyn ControlPlane>,
    /// Held shared by lifecycle operations and exclusively by shutdown.
    lifecycle: RwLock<()>,
    shut_down: AtomicBool,
}

impl StreamBridge {
    pub async fn start(
        config: BridgeConfig,
        connector: &dyn StreamingConnector,
        control_plane: Arc<dyn ControlPlane>,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let transport =
            TransportAdapter::connect(connector, &config.connection(), config.transport_timeout())
                .await?;

        let static_subscriptions = config.subscriptions.clone();
        let inner = Arc::new_cyclic(|me| BridgeInner {
            me: me.clone(),
            config,
            transport,
            registry: SubscriptionRegistry::new(),
            locks: IdentityLocks::new(),
            client_topics: ClientTopics::new(),
            control_plane,
            lifecycle: RwLock::new(()),
            shut_down: AtomicBool::new(false),
        });
        let bridge = Self { inner };

        let router: Arc<dyn RequestHandler> = Arc::new(CommandRouter::new(
            Arc::downgrade(&bridge.inner),
            RouterScope::Base,
        ));
        let base_topic = bridge.base_topic().to_string();
        let registered = match bridge.inner.control_plane.add(&base_topic, router).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(BridgeError::validation(format!(
                "base topic {base_topic:?} is already served"
            ))),
            Err(err) => Err(err),
        };
        if let Err(err) = registered {
            bridge.abort_start().await;
            return Err(err);
        }

        for request in static_subscriptions {
            let opened = match request.validate() {
                Ok(()) => bridge.inner.subscribe(request).await,
                Err(err) => Err(err),
            };
            if let Err(err) = opened {
                bridge.abort_start().await;
                return Err(err);
            }
        }

        info!(
            event = events::BRIDGE_STARTED,
            component = COMPONENT,
            cluster_id = %bridge.inner.config.cluster_id,
            client_id = %bridge.client_id(),
            base_topic = %base_topic,
            subscriptions = bridge.inner.registry.len().await,
            "bridge started"
        );
        Ok(bridge)
    }

    async fn abort_start(&self) {
        if let Err(err) = self.shutdown().await {
            warn!(
                component = COMPONENT,
                err = %err,
                "unable to release transport after failed start"
            );
        }
    }

    pub fn client_id(&self) -> &str {
        self.inner.client_id()
    }

    pub fn base_topic(&self) -> &str {
        &self.inner.config.base_topic
    }

    /// Control topic serving this bridge's client.
    pub fn client_topic(&self) -> String {
        client_topic(self.base_topic(), self.client_id())
    }

    /// Identity of a subscription owned by this bridge's client.
    pub fn key(&self, subject: &str, durable_name: Option<&str>) -> SubscriptionKey {
        SubscriptionKey::new(subject, durable_name, self.client_id())
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.inner.registry
    }

    pub async fn subscribe(&self, request: SubscribeRequest) -> BridgeResult<Subscription> {
        request.validate()?;
        self.inner.subscribe(request).await
    }

    /// Removes a subscription for good. The returned subscription is Closed.
    pub async fn unsubscribe(&self, key: &SubscriptionKey) -> BridgeResult<Subscription> {
        self.inner.unsubscribe(key).await
    }

    pub async fn suspend(&self, key: &SubscriptionKey) -> BridgeResult<Subscription> {
        self.inner.suspend(key).await
    }

    pub async fn list(&self, client_id: &str) -> Vec<Subscription> {
        self.inner.list(client_id).await
    }

    pub async fn publish(&self, subject: &str, data: &Value) -> BridgeResult<PublishAck> {
        self.inner.publish(subject, data).await
    }

    /// Closes every live handle, keeping durable positions on the transport,
    /// forgets all subscriptions and closes the connection. Later calls are
    /// no-ops; later operations fail with a connection error.
    pub async fn shutdown(&self) -> BridgeResult<()> {
        self.inner.shutdown().await
    }
}

impl BridgeInner {
    pub(crate) fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn ensure_running(&self) -> BridgeResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(BridgeError::fail_with_kind(
                ErrorKind::Connection,
                "bridge has been shut down",
            ));
        }
        Ok(())
    }

    /// Shared lifecycle guard. Shutdown cannot drain the registry while it
    /// is held.
    async fn running(&self) -> BridgeResult<RwLockReadGuard<'_, ()>> {
        let guard = self.lifecycle.read().await;
        self.ensure_running()?;
        Ok(guard)
    }

    pub(crate) async fn subscribe(&self, request: SubscribeRequest) -> BridgeResult<Subscription> {
        let _running = self.running().await?;
        let key = SubscriptionKey::new(
            &request.subject,
            request.options.durable_name.as_deref(),
            self.client_id(),
        );
        let _guard = self.locks.lock(&key).await;

        let (subscription, resumed) = match self.registry.entry(&key).await {
            Some(entry) if entry.subscription.status == SubscriptionStatus::Active => {
                debug!(
                    event = events::SUBSCRIPTION_DUPLICATE,
                    component = COMPONENT,
                    key = %fields::format_key(&key),
                    "subscription already active"
                );
                return Err(BridgeError::fail_with_kind(
                    ErrorKind::DuplicateSubscription,
                    format!(
                        "subscription {} is already active",
                        fields::format_key(&key)
                    ),
                ));
            }
            Some(entry) => (entry.subscription, true),
            None => (
                Subscription {
                    subject: request.subject,
                    client_id: self.client_id().to_string(),
                    options: request.options,
                    request_pattern: request.request_pattern,
                    status: SubscriptionStatus::Active,
                },
                false,
            ),
        };

        let client_id = subscription.client_id.clone();
        let listener = Arc::new(DeliveryListener::new(
            self.control_plane.clone(),
            format!("{}.{}", self.config.base_topic, subscription.subject),
            subscription.request_pattern.clone(),
            subscription.options.manual_acks,
            self.config.dispatch_timeout(),
        ));
        let handle = match self
            .transport
            .subscribe(&subscription.subject, &subscription.options, listener)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                warn!(
                    event = events::SUBSCRIPTION_OPEN_FAILED,
                    component = COMPONENT,
                    key = %fields::format_key(&key),
                    kind = %err.kind(),
                    err = %err,
                    "unable to open transport subscription"
                );
                self.log_timeout("subscribe", &err);
                return Err(err);
            }
        };

        if let Err(err) = self
            .registry
            .register(&key, subscription, handle.clone())
            .await
        {
            if let Err(close_err) = self.transport.close_handle(&handle).await {
                warn!(
                    component = COMPONENT,
                    key = %fields::format_key(&key),
                    err = %close_err,
                    "unable to close handle of rejected subscription"
                );
            }
            return Err(err);
        }

        if let Err(err) = self.ensure_client_topic(&client_id).await {
            self.roll_back(&key, &handle, resumed).await;
            return Err(err);
        }

        let event_name = if resumed {
            events::SUBSCRIPTION_RESUMED
        } else {
            events::SUBSCRIPTION_ACTIVATED
        };
        info!(
            event = event_name,
            component = COMPONENT,
            key = %fields::format_key(&key),
            "subscription active"
        );
        self.registry.get(&key).await
    }

    /// Undoes a registration whose client topic could not be served.
    async fn roll_back(
        &self,
        key: &SubscriptionKey,
        handle: &Arc<dyn SubscriptionHandle>,
        resumed: bool,
    ) {
        if let Err(err) = self.transport.close_handle(handle).await {
            warn!(
                component = COMPONENT,
                key = %fields::format_key(key),
                err = %err,
                "unable to close handle of rolled back subscription"
            );
        }
        let restored = if resumed {
            self.registry
                .update_status(key, SubscriptionStatus::Suspended)
                .await
        } else {
            self.registry.remove(key).await.map(|_| ())
        };
        if let Err(err) = restored {
            warn!(
                component = COMPONENT,
                key = %fields::format_key(key),
                err = %err,
                "unable to roll back subscription"
            );
        }
    }

    async fn ensure_client_topic(&self, client_id: &str) -> BridgeResult<()> {
        let topic = client_topic(&self.config.base_topic, client_id);
        let me = self.me.clone();
        let scope = RouterScope::Client(client_id.to_string());
        self.client_topics
            .ensure(self.control_plane.as_ref(), &topic, move || {
                Arc::new(CommandRouter::new(me, scope)) as Arc<dyn RequestHandler>
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn unsubscribe(&self, key: &SubscriptionKey) -> BridgeResult<Subscription> {
        let _running = self.running().await?;
        let _guard = self.locks.lock(key).await;
        let entry = self.registry.entry(key).await.ok_or_else(|| {
            BridgeError::not_found(format!(
                "no subscription registered for {}",
                fields::format_key(key)
            ))
        })?;

        let released = match &entry.handle {
            Some(handle) => self.transport.unsubscribe(handle).await,
            None => {
                self.transport
                    .remove_durable(&entry.subscription.subject, &entry.subscription.options)
                    .await
            }
        };
        if let Err(err) = released {
            self.log_timeout("unsubscribe", &err);
            return Err(err);
        }

        let mut subscription = self.registry.remove(key).await?.subscription;
        subscription.status = SubscriptionStatus::Closed;
        info!(
            event = events::SUBSCRIPTION_CLOSED,
            component = COMPONENT,
            key = %fields::format_key(key),
            "subscription closed"
        );
        Ok(subscription)
    }

    pub(crate) async fn suspend(&self, key: &SubscriptionKey) -> BridgeResult<Subscription> {
        let _running = self.running().await?;
        let _guard = self.locks.lock(key).await;
        let handle = match self.registry.entry(key).await {
            Some(entry) => entry.handle.ok_or_else(|| {
                BridgeError::not_found(format!(
                    "subscription {} is already suspended",
                    fields::format_key(key)
                ))
            })?,
            None => {
                return Err(BridgeError::not_found(format!(
                    "no subscription registered for {}",
                    fields::format_key(key)
                )))
            }
        };

        if let Err(err) = self.transport.close_handle(&handle).await {
            self.log_timeout("suspend", &err);
            return Err(err);
        }
        self.registry
            .update_status(key, SubscriptionStatus::Suspended)
            .await?;
        info!(
            event = events::SUBSCRIPTION_SUSPENDED,
            component = COMPONENT,
            key = %fields::format_key(key),
            "subscription suspended"
        );
        self.registry.get(key).await
    }

    pub(crate) async fn list(&self, client_id: &str) -> Vec<Subscription> {
        self.registry.list_by_client(client_id).await
    }

    pub(crate) async fn publish(&self, subject: &str, data: &Value) -> BridgeResult<PublishAck> {
        self.ensure_running()?;
        let payload = serde_json::to_vec(data)?;
        match self.transport.publish(subject, payload).await {
            Ok(ack) => {
                debug!(
                    event = events::PUBLISH_OK,
                    component = COMPONENT,
                    subject,
                    guid = %ack.guid,
                    "message published"
                );
                Ok(ack)
            }
            Err(err) => {
                warn!(
                    event = events::PUBLISH_FAILED,
                    component = COMPONENT,
                    subject,
                    kind = %err.kind(),
                    err = %err,
                    "publish failed"
                );
                self.log_timeout("publish", &err);
                Err(err)
            }
        }
    }

    async fn shutdown(&self) -> BridgeResult<()> {
        let entries = {
            let _exclusive = self.lifecycle.write().await;
            if self.shut_down.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            self.registry.drain().await
        };
        let released = entries.len();
        for entry in entries {
            let Some(handle) = entry.handle else {
                continue;
            };
            if let Err(err) = self.transport.close_handle(&handle).await {
                warn!(
                    component = COMPONENT,
                    key = %fields::format_key(&entry.subscription.key()),
                    err = %err,
                    "unable to close subscription handle during shutdown"
                );
            }
        }

        self.transport.close().await?;
        info!(
            event = events::BRIDGE_SHUTDOWN,
            component = COMPONENT,
            client_id = %self.client_id(),
            released,
            "bridge shut down"
        );
        Ok(())
    }

    fn log_timeout(&self, operation: &str, err: &BridgeError) {
        if err.kind() == ErrorKind::Timeout {
            warn!(
                event = events::TRANSPORT_TIMEOUT,
                component = COMPONENT,
                operation,
                timeout_ms = fields::format_duration_ms(self.config.transport_timeout()),
                "transport call timed out"
            );
        }
    }
}
