//! Replay broadcasting
//!
//! A broadcaster fans every emitted value out to its registered sinks and
//! keeps the most recent values so that late subscribers can catch up.
//!
//! # Architecture
//!
//! ```text
//!                      ReplayBroadcaster<T>
//!              ┌──────────────────────────────────┐
//!              │ Mutex<Inner {                    │
//!              │   history: HistoryBuffer<T>,     │
//!              │   subscribers: Vec<Subscriber>,  │
//!              │ }>                               │
//!              └────────────────┬─────────────────┘
//!                               │
//!      emit(v) ─────────────────┼──────────────────────┐
//!                               │                      │
//!                               ▼                      ▼
//!                        [Sink: closure]      [Sink: mpsc::Sender]
//!                        deliver(&v)          try_send(v.clone())
//!
//!      subscribe(sink): replay history oldest → newest, then register
//! ```
//!
//! # Delivery
//!
//! Delivery is synchronous and happens under the broadcaster lock, which
//! makes replay-then-live hand-off gapless: a value is either part of the
//! replay a new subscriber receives or delivered to it live, never both and
//! never neither. A slow sink applies backpressure to the emitter; channel
//! senders turn that into a per-subscriber queue instead.
//!
//! Each delivery is isolated. A sink reporting `Closed` or panicking is
//! removed, a `Full` sink loses only that value, and a `Failed` sink is
//! logged and kept.
//!
//! # Calls from inside a sink
//!
//! The thread delivering for a broadcaster is marked as such. When a sink
//! emits, subscribes, unsubscribes or resets history on that broadcaster,
//! the call is queued and applied once the running delivery completes,
//! still under the lock and before the outer call returns. Read accessors
//! cannot be served mid-delivery and panic instead of deadlocking.

pub mod broadcaster;
pub mod config;
pub mod handle;
pub mod history;
pub mod sink;
pub mod state;

pub use broadcaster::ReplayBroadcaster;
pub use config::BroadcasterConfig;
pub use handle::{SubscriberId, SubscriptionHandle};
pub use history::HistoryBuffer;
pub use sink::{FnSink, Sink};
pub use state::StateBroadcaster;
