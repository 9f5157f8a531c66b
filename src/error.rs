//! Error types
//!
//! Construction is the only fallible broadcaster operation. Sink errors are
//! reported by subscribers during delivery and are handled per subscriber.

use thiserror::Error;

/// Result alias for broadcaster construction
pub type Result<T> = std::result::Result<T, BroadcastError>;

/// Error type for broadcaster operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// Replay capacity was rejected at construction time
    #[error("invalid configuration: replay capacity {capacity} ({reason})")]
    InvalidConfiguration {
        /// The rejected capacity as requested by the caller
        capacity: i64,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Error reported by a [`Sink`](crate::broadcast::Sink) for a single delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The consumer is gone; the subscriber is removed
    #[error("sink closed")]
    Closed,

    /// The consumer's queue is full; this value is dropped for this subscriber
    #[error("sink queue full")]
    Full,

    /// Delivery failed; the subscriber stays registered
    #[error("sink failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display() {
        let err = BroadcastError::InvalidConfiguration {
            capacity: -1,
            reason: "must not be negative",
        };

        assert_eq!(
            err.to_string(),
            "invalid configuration: replay capacity -1 (must not be negative)"
        );
    }

    #[test]
    fn test_sink_error_display() {
        assert_eq!(SinkError::Closed.to_string(), "sink closed");
        assert_eq!(SinkError::Full.to_string(), "sink queue full");
        assert_eq!(
            SinkError::Failed("disk full".into()).to_string(),
            "sink failed: disk full"
        );
    }
}
