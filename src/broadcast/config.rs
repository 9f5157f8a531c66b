//! Broadcaster configuration

use crate::error::{BroadcastError, Result};

/// Broadcaster configuration options
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Name used in log output
    pub name: String,

    /// Number of most recent values replayed to new subscribers (0 = none)
    pub replay_capacity: usize,

    /// Largest replay capacity accepted by `validate` (unbounded by default)
    pub max_replay_capacity: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            name: "broadcaster".to_string(),
            replay_capacity: 0,
            max_replay_capacity: usize::MAX,
        }
    }
}

impl BroadcasterConfig {
    /// Create a config with the given replay capacity
    pub fn with_replay(capacity: usize) -> Self {
        Self {
            replay_capacity: capacity,
            ..Default::default()
        }
    }

    /// Set the name used in log output
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the replay capacity
    pub fn replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    /// Set the largest accepted replay capacity
    pub fn max_replay_capacity(mut self, max: usize) -> Self {
        self.max_replay_capacity = max;
        self
    }

    /// Check the configuration before a broadcaster is built from it
    pub fn validate(&self) -> Result<()> {
        if self.replay_capacity > self.max_replay_capacity {
            return Err(BroadcastError::InvalidConfiguration {
                capacity: i64::try_from(self.replay_capacity).unwrap_or(i64::MAX),
                reason: "exceeds max_replay_capacity",
            });
        }
        Ok(())
    }
}

/// Convert a signed capacity into a config, rejecting negative values
impl TryFrom<i64> for BroadcasterConfig {
    type Error = BroadcastError;

    fn try_from(capacity: i64) -> Result<Self> {
        let capacity = usize::try_from(capacity).map_err(|_| {
            BroadcastError::InvalidConfiguration {
                capacity,
                reason: "must not be negative",
            }
        })?;
        Ok(Self::with_replay(capacity))
    }
}
