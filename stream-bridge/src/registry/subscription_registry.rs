//! In-memory registry of active and suspended subscriptions.

use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::observability::fields;
use crate::registry::{Subscription, SubscriptionKey, SubscriptionStatus};
use crate::transport::SubscriptionHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

const COMPONENT: &str = "subscription_registry";

/// One registry slot. `handle` is present exactly when the subscription is
/// Active.
#[derive(Clone)]
pub(crate) struct RegistryEntry {
    pub(crate) subscription: Subscription,
    pub(crate) handle: Option<Arc<dyn SubscriptionHandle>>,
    order: u64,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<SubscriptionKey, RegistryEntry>,
    next_order: u64,
}

/// Source of truth for the subscriptions owned by a bridge.
#[derive(Default)]
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
}

fn not_found(key: &SubscriptionKey) -> BridgeError {
    BridgeError::not_found(format!(
        "no subscription registered for {}",
        fields::format_key(key)
    ))
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscription` as Active with its live `handle`.
    ///
    /// Fails when an Active entry exists for `key`. A Suspended entry is
    /// reactivated in place and keeps its list position.
    pub(crate) async fn register(
        &self,
        key: &SubscriptionKey,
        mut subscription: Subscription,
        handle: Arc<dyn SubscriptionHandle>,
    ) -> BridgeResult<()> {
        let mut state = self.state.lock().await;
        subscription.status = SubscriptionStatus::Active;

        if let Some(entry) = state.entries.get_mut(key) {
            if entry.subscription.status == SubscriptionStatus::Active {
                return Err(BridgeError::fail_with_kind(
                    ErrorKind::DuplicateSubscription,
                    format!(
                        "subscription {} is already active",
                        fields::format_key(key)
                    ),
                ));
            }
            trace!(component = COMPONENT, key = %fields::format_key(key), "reactivating entry");
            entry.subscription = subscription;
            entry.handle = Some(handle);
            return Ok(());
        }

        let order = state.next_order;
        state.next_order += 1;
        trace!(component = COMPONENT, key = %fields::format_key(key), order, "inserting entry");
        state.entries.insert(
            key.clone(),
            RegistryEntry {
                subscription,
                handle: Some(handle),
                order,
            },
        );
        Ok(())
    }

    pub async fn get(&self, key: &SubscriptionKey) -> BridgeResult<Subscription> {
        let state = self.state.lock().await;
        state
            .entries
            .get(key)
            .map(|entry| entry.subscription.clone())
            .ok_or_else(|| not_found(key))
    }

    pub(crate) async fn entry(&self, key: &SubscriptionKey) -> Option<RegistryEntry> {
        self.state.lock().await.entries.get(key).cloned()
    }

    /// Live transport handle of an Active entry.
    pub async fn handle(&self, key: &SubscriptionKey) -> Option<Arc<dyn SubscriptionHandle>> {
        self.state
            .lock()
            .await
            .entries
            .get(key)
            .and_then(|entry| entry.handle.clone())
    }

    /// Moving out of Active drops the stored handle.
    pub async fn update_status(
        &self,
        key: &SubscriptionKey,
        status: SubscriptionStatus,
    ) -> BridgeResult<()> {
        let mut state = self.state.lock().await;
        let entry = state.entries.get_mut(key).ok_or_else(|| not_found(key))?;
        entry.subscription.status = status;
        if status != SubscriptionStatus::Active {
            entry.handle = None;
        }
        Ok(())
    }

    pub(crate) async fn remove(&self, key: &SubscriptionKey) -> BridgeResult<RegistryEntry> {
        let mut state = self.state.lock().await;
        state.entries.remove(key).ok_or_else(|| not_found(key))
    }

    /// Subscriptions of `client_id` in insertion order.
    pub async fn list_by_client(&self, client_id: &str) -> Vec<Subscription> {
        let state = self.state.lock().await;
        let mut entries: Vec<&RegistryEntry> = state
            .entries
            .values()
            .filter(|entry| {
                entry.subscription.client_id == client_id
                    && entry.subscription.status != SubscriptionStatus::Closed
            })
            .collect();
        entries.sort_by_key(|entry| entry.order);
        entries
            .into_iter()
            .map(|entry| entry.subscription.clone())
            .collect()
    }

    /// Removes every entry, in insertion order.
    pub(crate) async fn drain(&self) -> Vec<RegistryEntry> {
        let mut state = self.state.lock().await;
        let mut entries: Vec<RegistryEntry> = state.entries.drain().map(|(_, entry)| entry).collect();
        entries.sort_by_key(|entry| entry.order);
        entries
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionRegistry;
    use crate::error::ErrorKind;
    use crate::registry::{Subscription, SubscriptionKey, SubscriptionOptions, SubscriptionStatus};
    use crate::transport::{SubscriptionHandle, TransportError};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopHandle {
        subject: String,
    }

    #[async_trait]
    impl SubscriptionHandle for NoopHandle {
        fn subject(&self) -> &str {
            &self.subject
        }

        fn is_closed(&self) -> bool {
            false
        }

        async fn unsubscribe(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn handle(subject: &str) -> Arc<dyn SubscriptionHandle> {
        Arc::new(NoopHandle {
            subject: subject.to_string(),
        })
    }

    fn subscription(subject: &str, client_id: &str) -> Subscription {
        Subscription {
            subject: subject.to_string(),
            client_id: client_id.to_string(),
            options: SubscriptionOptions::default(),
            request_pattern: None,
            status: SubscriptionStatus::Active,
        }
    }

    #[tokio::test]
    async fn register_rejects_second_active_entry() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription("orders", "client-a");
        let key = sub.key();

        registry
            .register(&key, sub.clone(), handle("orders"))
            .await
            .expect("first register");
        let err = registry
            .register(&key, sub, handle("orders"))
            .await
            .expect_err("duplicate register");

        assert_eq!(err.kind(), ErrorKind::DuplicateSubscription);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn suspended_entry_is_reactivated_in_place() {
        let registry = SubscriptionRegistry::new();
        let orders = subscription("orders", "client-a");
        let invoices = subscription("invoices", "client-a");

        registry
            .register(&orders.key(), orders.clone(), handle("orders"))
            .await
            .expect("orders");
        registry
            .register(&invoices.key(), invoices.clone(), handle("invoices"))
            .await
            .expect("invoices");

        registry
            .update_status(&orders.key(), SubscriptionStatus::Suspended)
            .await
            .expect("suspend");
        assert!(registry.handle(&orders.key()).await.is_none());

        registry
            .register(&orders.key(), orders.clone(), handle("orders"))
            .await
            .expect("reactivate");

        let listed = registry.list_by_client("client-a").await;
        let subjects: Vec<&str> = listed.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["orders", "invoices"]);
        assert!(listed
            .iter()
            .all(|s| s.status == SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn missing_identity_reports_not_found() {
        let registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("orders", Some("audit"), "client-a");

        assert_eq!(
            registry.get(&key).await.expect_err("get").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            registry
                .update_status(&key, SubscriptionStatus::Suspended)
                .await
                .expect_err("update")
                .kind(),
            ErrorKind::NotFound
        );
        assert!(registry.remove(&key).await.is_err());
    }

    #[tokio::test]
    async fn list_is_scoped_to_client() {
        let registry = SubscriptionRegistry::new();
        let a = subscription("orders", "client-a");
        let b = subscription("orders", "client-b");

        registry.register(&a.key(), a.clone(), handle("orders")).await.expect("a");
        registry.register(&b.key(), b.clone(), handle("orders")).await.expect("b");

        assert_eq!(registry.list_by_client("client-a").await.len(), 1);
        assert_eq!(registry.list_by_client("client-c").await.len(), 0);

        registry.remove(&a.key()).await.expect("remove");
        assert!(registry.list_by_client("client-a").await.is_empty());
        assert_eq!(registry.drain().await.len(), 1);
        assert!(registry.is_empty().await);
    }
}
