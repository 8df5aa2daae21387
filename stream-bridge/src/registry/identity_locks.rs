//! Per-identity serialization of lifecycle transitions.

use crate::registry::SubscriptionKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per identity. Lifecycle operations hold the guard
/// for their whole transition, so two operations on the same identity never
/// interleave while different identities proceed concurrently.
#[derive(Default)]
pub(crate) struct IdentityLocks {
    locks: Mutex<HashMap<SubscriptionKey, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self, key: &SubscriptionKey) -> OwnedMutexGuard<()> {
        let identity_lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the table are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        identity_lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::IdentityLocks;
    use crate::registry::SubscriptionKey;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn same_identity_is_serialized() {
        let locks = Arc::new(IdentityLocks::new());
        let key = SubscriptionKey::new("orders", None, "client-a");

        let guard = locks.lock(&key).await;
        let contender = {
            let locks = locks.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes");
    }

    #[tokio::test]
    async fn different_identities_do_not_block_and_idle_locks_are_pruned() {
        let locks = IdentityLocks::new();
        let orders = SubscriptionKey::new("orders", None, "client-a");
        let invoices = SubscriptionKey::new("invoices", None, "client-a");

        let orders_guard = locks.lock(&orders).await;
        let invoices_guard = locks.lock(&invoices).await;
        drop(orders_guard);
        drop(invoices_guard);

        let _third = locks.lock(&SubscriptionKey::new("refunds", None, "client-a")).await;
        assert_eq!(locks.tracked().await, 1);
    }
}
