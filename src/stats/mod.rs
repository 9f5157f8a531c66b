//! Broadcaster statistics

mod metrics;

pub(crate) use metrics::DeliveryCounters;
pub use metrics::BroadcastStats;
