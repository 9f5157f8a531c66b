//! Statistics for broadcasters

/// Delivery counters, updated under the broadcaster lock
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DeliveryCounters {
    pub emitted: u64,
    pub delivered: u64,
    pub replayed: u64,
    pub dropped: u64,
    pub failed: u64,
    pub evicted: u64,
}

/// Point-in-time broadcaster statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Values passed to `emit`
    pub emitted: u64,
    /// Live deliveries that succeeded
    pub delivered: u64,
    /// History values delivered to joining subscribers
    pub replayed: u64,
    /// Values dropped because a subscriber's queue was full
    pub dropped: u64,
    /// Deliveries that failed or panicked
    pub failed: u64,
    /// Subscribers removed because their sink closed or panicked
    pub evicted_subscribers: u64,
    /// Currently registered subscribers
    pub subscriber_count: usize,
    /// Values currently held for replay
    pub history_len: usize,
    /// Configured replay capacity
    pub replay_capacity: usize,
}

impl BroadcastStats {
    pub(crate) fn from_counters(
        counters: &DeliveryCounters,
        subscriber_count: usize,
        history_len: usize,
        replay_capacity: usize,
    ) -> Self {
        Self {
            emitted: counters.emitted,
            delivered: counters.delivered,
            replayed: counters.replayed,
            dropped: counters.dropped,
            failed: counters.failed,
            evicted_subscribers: counters.evicted,
            subscriber_count,
            history_len,
            replay_capacity,
        }
    }

    /// Live delivery attempts, successful or not
    pub fn attempts(&self) -> u64 {
        self.delivered + self.dropped + self.failed
    }

    /// Fraction of live delivery attempts that did not reach the subscriber
    pub fn loss_ratio(&self) -> f64 {
        let attempts = self.attempts();
        if attempts > 0 {
            (self.dropped + self.failed) as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = BroadcastStats::default();
        assert_eq!(stats.emitted, 0);
        assert_eq!(stats.attempts(), 0);
        assert_eq!(stats.loss_ratio(), 0.0);
    }

    #[test]
    fn test_stats_from_counters() {
        let counters = DeliveryCounters {
            emitted: 4,
            delivered: 6,
            replayed: 3,
            dropped: 1,
            failed: 1,
            evicted: 2,
        };

        let stats = BroadcastStats::from_counters(&counters, 2, 3, 5);

        assert_eq!(stats.emitted, 4);
        assert_eq!(stats.delivered, 6);
        assert_eq!(stats.replayed, 3);
        assert_eq!(stats.evicted_subscribers, 2);
        assert_eq!(stats.subscriber_count, 2);
        assert_eq!(stats.history_len, 3);
        assert_eq!(stats.replay_capacity, 5);
    }

    #[test]
    fn test_stats_loss_ratio() {
        let stats = BroadcastStats {
            delivered: 6,
            dropped: 1,
            failed: 1,
            ..Default::default()
        };

        assert_eq!(stats.attempts(), 8);
        assert!((stats.loss_ratio() - 0.25).abs() < f64::EPSILON);
    }
}
