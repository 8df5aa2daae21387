//! Reply shapes returned through the control plane.

use crate::registry::{Subscription, SubscriptionOptions, SubscriptionStatus};
use serde::{Deserialize, Serialize};

/// Public fields of a subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionReply {
    pub subject: String,
    pub options: SubscriptionOptions,
    pub status: SubscriptionStatus,
}

impl From<&Subscription> for SubscriptionReply {
    fn from(subscription: &Subscription) -> Self {
        Self {
            subject: subscription.subject.clone(),
            options: subscription.options.clone(),
            status: subscription.status,
        }
    }
}
