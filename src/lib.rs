//! Multicast broadcaster with a bounded replay buffer
//!
//! `replaycast` delivers every emitted value to all current subscribers and
//! replays the most recent values to subscribers that join late.
//!
//! - [`ReplayBroadcaster`] keeps the last N values (N = replay capacity).
//!   With N = 0 late subscribers see only future values.
//! - [`StateBroadcaster`] is the capacity-1 case seeded with an initial
//!   value: a single current state every subscriber observes on join.
//!
//! The broadcaster assumes no runtime. Share it with `Arc` and drive it
//! from threads or tasks; subscribe a tokio channel sender when the
//! consumer should not slow down the emitter.
//!
//! # Example
//! ```
//! use replaycast::ReplayBroadcaster;
//! use tokio::sync::mpsc;
//!
//! let broadcaster = ReplayBroadcaster::new(3);
//! for v in 1..=5 {
//!     broadcaster.emit(v);
//! }
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! broadcaster.subscribe(tx);
//! broadcaster.emit(6);
//!
//! let received: Vec<i32> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
//! assert_eq!(received, vec![3, 4, 5, 6]);
//! ```

pub mod broadcast;
pub mod error;
pub mod stats;

pub use broadcast::{
    sink, BroadcasterConfig, ReplayBroadcaster, Sink, StateBroadcaster, SubscriberId,
    SubscriptionHandle,
};
pub use error::{BroadcastError, Result, SinkError};
pub use stats::BroadcastStats;
