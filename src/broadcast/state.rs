//! Current-state broadcaster
//!
//! A capacity-1 [`ReplayBroadcaster`] that always holds a value. Every new
//! subscriber immediately observes the current value, and setting a value
//! equal to the current one is not emitted.

use std::fmt;

use crate::stats::BroadcastStats;

use super::broadcaster::ReplayBroadcaster;
use super::config::BroadcasterConfig;
use super::handle::SubscriptionHandle;
use super::sink::Sink;

/// Broadcaster holding a single current value
///
/// The wrapped broadcaster has replay capacity 1, is seeded with the initial
/// value at construction, and its history is never reset: nothing here
/// exposes `reset_history`, and the broadcaster is private, so no sink can
/// reach it either. The buffered latest value is therefore always present.
///
/// # Example
/// ```
/// use replaycast::broadcast::{sink, StateBroadcaster};
///
/// let logged_in = StateBroadcaster::new(false);
/// logged_in.set(true);
///
/// logged_in.subscribe(sink::from_fn(|v: &bool| assert!(*v)));
/// assert!(logged_in.value());
/// ```
pub struct StateBroadcaster<T> {
    inner: ReplayBroadcaster<T>,
}

impl<T> StateBroadcaster<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a state broadcaster holding `initial`
    pub fn new(initial: T) -> Self {
        Self::named("state", initial)
    }

    /// Create a state broadcaster with a name used in log output
    pub fn named(name: impl Into<String>, initial: T) -> Self {
        let inner = ReplayBroadcaster::from_config(BroadcasterConfig::with_replay(1).name(name));
        inner.emit(initial);
        Self { inner }
    }

    /// Current value
    pub fn value(&self) -> T {
        // Capacity 1, seeded in `named`, never reset: see the type docs
        self.inner
            .latest()
            .expect("state broadcaster always holds a value")
    }

    /// Replace the current value
    ///
    /// Returns false, without emitting, if `value` equals the current value.
    pub fn set(&self, value: T) -> bool {
        self.inner.emit_if_changed(value)
    }

    /// Replace the current value with one computed from it, atomically
    ///
    /// Returns false, without emitting, if the result equals the current value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.inner.emit_with(move |current| {
            let current = current?;
            let next = f(current);
            (next != *current).then_some(next)
        })
    }

    /// Register a sink; it receives the current value before this returns
    pub fn subscribe<S>(&self, sink: S) -> SubscriptionHandle
    where
        S: Sink<T> + 'static,
    {
        self.inner.subscribe(sink)
    }

    /// Remove a subscriber; no-op if already removed
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.inner.unsubscribe(handle)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    pub fn stats(&self) -> BroadcastStats {
        self.inner.stats()
    }
}

impl<T> fmt::Debug for StateBroadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBroadcaster")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio_test::task;
    use tokio_test::{assert_err, assert_ok, assert_pending, assert_ready_eq};

    use super::*;
    use crate::broadcast::sink;

    #[test]
    fn test_late_subscriber_sees_current_value() {
        let state = StateBroadcaster::new(5);
        state.set(1);
        state.set(2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&seen);
        state.subscribe(sink::from_fn(move |v: &i32| out.lock().push(*v)));

        state.set(8);

        assert_eq!(*seen.lock(), vec![2, 8]);
        assert_eq!(state.value(), 8);
    }

    #[test]
    fn test_set_skips_equal_value() {
        let state = StateBroadcaster::new("idle".to_string());
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribe(tx);

        assert!(!state.set("idle".to_string()));
        assert!(state.set("busy".to_string()));
        assert!(!state.set("busy".to_string()));

        assert_eq!(assert_ok!(rx.try_recv()), "idle");
        assert_eq!(assert_ok!(rx.try_recv()), "busy");
        assert_err!(rx.try_recv());

        // Initial value plus one change
        assert_eq!(state.stats().emitted, 2);
    }

    #[test]
    fn test_update() {
        let state = StateBroadcaster::new(0u32);

        assert!(state.update(|v| v + 1));
        assert!(state.update(|v| v + 1));
        assert!(!state.update(|v| *v));

        assert_eq!(state.value(), 2);
    }

    #[test]
    fn test_concurrent_update() {
        let state = Arc::new(StateBroadcaster::new(0u64));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        state.update(|v| v + 1);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(state.value(), 2000);
    }

    #[test]
    fn test_unsubscribe() {
        let state = StateBroadcaster::named("login", false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = state.subscribe(tx);

        assert_eq!(state.subscriber_count(), 1);
        assert!(state.unsubscribe(&handle));
        assert!(!state.unsubscribe(&handle));

        state.set(true);

        // Only the replayed value; the dropped sender then closes the channel
        assert_ready_eq!(task::spawn(rx.recv()).poll(), Some(false));
        assert_ready_eq!(task::spawn(rx.recv()).poll(), None);
    }

    #[test]
    fn test_sink_sets_state_from_delivery() {
        let state = Arc::new(StateBroadcaster::named("clamped", 0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&state);
        let out = Arc::clone(&seen);
        state.subscribe(sink::from_fn(move |v: &i32| {
            out.lock().push(*v);
            if *v > 10 {
                if let Some(state) = weak.upgrade() {
                    state.set(10);
                }
            }
        }));

        assert!(state.set(15));

        assert_eq!(*seen.lock(), vec![0, 15, 10]);
        assert_eq!(state.value(), 10);
    }

    #[tokio::test]
    async fn test_subscriber_receives_over_channel() {
        let state = StateBroadcaster::new(3);
        let (tx, mut rx) = mpsc::channel(4);
        state.subscribe(tx);

        state.set(4);

        assert_eq!(rx.recv().await, Some(3));
        assert_eq!(rx.recv().await, Some(4));

        // Nothing more until the next change
        let mut next = task::spawn(rx.recv());
        assert_pending!(next.poll());

        state.set(5);
        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), Some(5));
    }
}
