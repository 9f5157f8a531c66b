//! Subscription identity

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscriber, unique across all broadcasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(super) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handle returned by `subscribe`, used to cancel the subscription
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriberId,
}

impl SubscriptionHandle {
    pub(super) fn new(id: SubscriberId) -> Self {
        Self { id }
    }

    /// Identifier of the subscriber this handle cancels
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}
