//! Replay broadcaster implementation
//!
//! Multicasts values to every registered sink and replays the most recent
//! values to sinks that join late.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::error::{Result, SinkError};
use crate::stats::{BroadcastStats, DeliveryCounters};

use super::config::BroadcasterConfig;
use super::handle::{SubscriberId, SubscriptionHandle};
use super::history::HistoryBuffer;
use super::sink::Sink;

static NEXT_BROADCASTER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Broadcasters currently delivering on this thread, innermost last
    static DELIVERING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks a broadcaster as delivering on the current thread until dropped
struct DeliveryGuard(u64);

impl DeliveryGuard {
    fn enter(broadcaster: u64) -> Self {
        DELIVERING.with(|d| d.borrow_mut().push(broadcaster));
        Self(broadcaster)
    }

    fn is_active(broadcaster: u64) -> bool {
        DELIVERING.with(|d| d.borrow().contains(&broadcaster))
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        DELIVERING.with(|d| {
            let mut active = d.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// A registered sink
struct Subscriber<T> {
    id: SubscriberId,
    sink: Box<dyn Sink<T>>,
}

type EmitFn<T> = Box<dyn FnOnce(Option<&T>) -> Option<T> + Send>;

/// Mutation requested by a sink while its broadcaster was delivering
enum PendingOp<T> {
    Emit(T),
    EmitWith(EmitFn<T>),
    Subscribe(Subscriber<T>),
    Unsubscribe(SubscriberId),
    ResetHistory,
}

/// State guarded by the broadcaster lock
struct Inner<T> {
    history: HistoryBuffer<T>,
    /// Registration order is delivery order
    subscribers: Vec<Subscriber<T>>,
    counters: DeliveryCounters,
}

/// Whether delivery happens as part of replay or live emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Replay,
    Live,
}

/// Multicast broadcaster with a bounded replay history
///
/// History and subscriber set sit behind one lock, so `emit`, `subscribe`
/// and `unsubscribe` are mutually atomic. Delivery is synchronous and runs
/// under that lock: a slow sink slows the emitter. Use a tokio channel
/// sender as the sink to decouple a slow consumer.
///
/// A sink may call `emit`, `emit_with`, `emit_if_changed`, `subscribe`,
/// `unsubscribe` or `reset_history` on the broadcaster that is delivering
/// to it. Those calls are queued and applied in call order once the
/// current delivery finishes, before the outer call returns. Read accessors
/// (`history`, `latest`, `stats`, `subscriber_count`, `is_subscribed`)
/// panic when called from such a sink; the panic is contained like any
/// other sink panic and the sink is removed.
///
/// Share across threads with `Arc`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use replaycast::broadcast::{sink, ReplayBroadcaster};
///
/// let broadcaster = ReplayBroadcaster::new(3);
/// for v in 1..=5 {
///     broadcaster.emit(v);
/// }
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let out = Arc::clone(&seen);
/// broadcaster.subscribe(sink::from_fn(move |v: &i32| out.lock().push(*v)));
/// broadcaster.emit(6);
///
/// assert_eq!(*seen.lock(), vec![3, 4, 5, 6]);
/// ```
pub struct ReplayBroadcaster<T> {
    id: u64,
    name: String,
    capacity: usize,
    inner: Mutex<Inner<T>>,
    pending: Mutex<Vec<PendingOp<T>>>,
}

impl<T: Send + 'static> ReplayBroadcaster<T> {
    /// Create a broadcaster replaying the last `capacity` values
    pub fn new(capacity: usize) -> Self {
        Self::from_config(BroadcasterConfig::with_replay(capacity))
    }

    /// Create a broadcaster from a signed capacity
    ///
    /// Fails with `InvalidConfiguration` if `capacity` is negative. Any
    /// non-negative capacity is accepted.
    pub fn create(capacity: i64) -> Result<Self> {
        Ok(Self::from_config(BroadcasterConfig::try_from(capacity)?))
    }

    /// Create a broadcaster from a validated configuration
    pub fn with_config(config: BroadcasterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    pub(crate) fn from_config(config: BroadcasterConfig) -> Self {
        tracing::debug!(
            broadcaster = %config.name,
            replay_capacity = config.replay_capacity,
            "Broadcaster created"
        );

        Self {
            id: NEXT_BROADCASTER_ID.fetch_add(1, Ordering::Relaxed),
            name: config.name,
            capacity: config.replay_capacity,
            inner: Mutex::new(Inner {
                history: HistoryBuffer::with_capacity(config.replay_capacity),
                subscribers: Vec::new(),
                counters: DeliveryCounters::default(),
            }),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Emit a value to every current subscriber and record it for replay
    ///
    /// Subscribers receive the value in registration order before this
    /// returns. Never fails; a failing sink only affects itself.
    pub fn emit(&self, value: T) {
        if self.is_delivering() {
            self.defer(PendingOp::Emit(value));
            return;
        }

        self.with_delivery(|inner| self.emit_locked(inner, value));
    }

    /// Emit a value computed from the latest buffered value
    ///
    /// `f` runs under the broadcaster lock and returns `None` to skip the
    /// emission. Returns whether a value was emitted. Called from inside
    /// one of this broadcaster's sinks, `f` runs once the current delivery
    /// finishes and this returns true.
    pub fn emit_with<F>(&self, f: F) -> bool
    where
        F: FnOnce(Option<&T>) -> Option<T> + Send + 'static,
    {
        if self.is_delivering() {
            self.defer(PendingOp::EmitWith(Box::new(f)));
            return true;
        }

        self.with_delivery(|inner| self.emit_with_locked(inner, f))
    }

    fn emit_with_locked<F>(&self, inner: &mut Inner<T>, f: F) -> bool
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let next = f(inner.history.latest());

        match next {
            Some(value) => {
                self.emit_locked(inner, value);
                true
            }
            None => false,
        }
    }

    fn emit_locked(&self, inner: &mut Inner<T>, value: T) {
        let Inner {
            history,
            subscribers,
            counters,
        } = inner;

        counters.emitted += 1;
        subscribers.retain_mut(|sub| deliver(&self.name, sub, &value, counters, Phase::Live));
        history.push(value);

        tracing::trace!(
            broadcaster = %self.name,
            subscribers = subscribers.len(),
            history = history.len(),
            "Value emitted"
        );
    }

    /// Register a sink
    ///
    /// The buffered history is delivered to the sink, oldest first, before
    /// this returns; after that the sink receives every later emission. A
    /// sink that closes during replay is never registered, and the returned
    /// handle is then already inactive.
    pub fn subscribe<S>(&self, sink: S) -> SubscriptionHandle
    where
        S: Sink<T> + 'static,
    {
        let id = SubscriberId::next();
        let subscriber = Subscriber {
            id,
            sink: Box::new(sink),
        };

        if self.is_delivering() {
            self.defer(PendingOp::Subscribe(subscriber));
        } else {
            self.with_delivery(|inner| self.subscribe_locked(inner, subscriber));
        }

        SubscriptionHandle::new(id)
    }

    fn subscribe_locked(&self, inner: &mut Inner<T>, mut subscriber: Subscriber<T>) {
        let Inner {
            history,
            subscribers,
            counters,
        } = inner;
        let id = subscriber.id;

        let alive = history
            .iter()
            .all(|value| deliver(&self.name, &mut subscriber, value, counters, Phase::Replay));

        if alive {
            subscribers.push(subscriber);
            tracing::debug!(
                broadcaster = %self.name,
                subscriber = %id,
                subscribers = subscribers.len(),
                catchup_values = history.len(),
                "Subscriber added"
            );
        } else {
            tracing::debug!(
                broadcaster = %self.name,
                subscriber = %id,
                "Subscriber closed during replay, not registered"
            );
        }
    }

    /// Remove the subscriber behind `handle`
    ///
    /// Returns whether a subscriber was removed; calling it again for the
    /// same handle is a no-op. Called from inside one of this broadcaster's
    /// sinks, the removal happens once the current delivery finishes and
    /// the result only reports whether it was newly queued.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let id = handle.id();

        if self.is_delivering() {
            let mut pending = self.pending.lock();
            let queued = pending
                .iter()
                .any(|op| matches!(op, PendingOp::Unsubscribe(other) if *other == id));
            if !queued {
                pending.push(PendingOp::Unsubscribe(id));
            }
            return !queued;
        }

        let mut inner = self.inner.lock();
        self.unsubscribe_locked(&mut inner, id)
    }

    fn unsubscribe_locked(&self, inner: &mut Inner<T>, id: SubscriberId) -> bool {
        let Some(pos) = inner.subscribers.iter().position(|s| s.id == id) else {
            return false;
        };
        inner.subscribers.remove(pos);

        tracing::debug!(
            broadcaster = %self.name,
            subscriber = %id,
            subscribers = inner.subscribers.len(),
            "Subscriber removed"
        );
        true
    }

    /// Forget the buffered history; subscribers are kept
    pub fn reset_history(&self) {
        if self.is_delivering() {
            self.defer(PendingOp::ResetHistory);
            return;
        }

        let mut inner = self.inner.lock();
        self.reset_locked(&mut inner);
    }

    fn reset_locked(&self, inner: &mut Inner<T>) {
        let dropped = inner.history.len();
        inner.history.clear();

        tracing::debug!(broadcaster = %self.name, dropped = dropped, "History reset");
    }

    /// Check whether a handle still refers to a registered subscriber
    pub fn is_subscribed(&self, handle: &SubscriptionHandle) -> bool {
        self.read()
            .subscribers
            .iter()
            .any(|s| s.id == handle.id())
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.read().subscribers.len()
    }

    /// Configured replay capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Name used in log output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of broadcaster statistics
    pub fn stats(&self) -> BroadcastStats {
        let inner = self.read();
        BroadcastStats::from_counters(
            &inner.counters,
            inner.subscribers.len(),
            inner.history.len(),
            inner.history.capacity(),
        )
    }

    fn is_delivering(&self) -> bool {
        DeliveryGuard::is_active(self.id)
    }

    fn defer(&self, op: PendingOp<T>) {
        tracing::trace!(broadcaster = %self.name, "Call from sink deferred until delivery ends");
        self.pending.lock().push(op);
    }

    /// Lock for a read accessor
    ///
    /// The lock is held by this thread while delivering, so reading from a
    /// sink would deadlock.
    fn read(&self) -> MutexGuard<'_, Inner<T>> {
        assert!(
            !self.is_delivering(),
            "broadcaster `{}` read from inside one of its own sinks",
            self.name
        );
        self.inner.lock()
    }

    /// Run a delivering operation, then apply calls its sinks deferred
    fn with_delivery<R>(&self, op: impl FnOnce(&mut Inner<T>) -> R) -> R {
        let mut inner = self.inner.lock();
        let _guard = DeliveryGuard::enter(self.id);

        let result = op(&mut *inner);

        loop {
            let ops = mem::take(&mut *self.pending.lock());
            if ops.is_empty() {
                break;
            }
            for op in ops {
                self.apply(&mut inner, op);
            }
        }

        result
    }

    fn apply(&self, inner: &mut Inner<T>, op: PendingOp<T>) {
        match op {
            PendingOp::Emit(value) => self.emit_locked(inner, value),
            PendingOp::EmitWith(f) => {
                self.emit_with_locked(inner, f);
            }
            PendingOp::Subscribe(subscriber) => self.subscribe_locked(inner, subscriber),
            PendingOp::Unsubscribe(id) => {
                self.unsubscribe_locked(inner, id);
            }
            PendingOp::ResetHistory => self.reset_locked(inner),
        }
    }
}

impl<T: Clone + Send + 'static> ReplayBroadcaster<T> {
    /// Snapshot of the values a new subscriber would receive, oldest first
    pub fn history(&self) -> Vec<T> {
        self.read().history.to_vec()
    }

    /// Most recent buffered value
    pub fn latest(&self) -> Option<T> {
        self.read().history.latest().cloned()
    }
}

impl<T: PartialEq + Send + 'static> ReplayBroadcaster<T> {
    /// Emit only if `value` differs from the latest buffered value
    ///
    /// With capacity 0 nothing is buffered, so every value is emitted.
    pub fn emit_if_changed(&self, value: T) -> bool {
        self.emit_with(move |latest| match latest {
            Some(current) if *current == value => None,
            _ => Some(value),
        })
    }
}

impl<T> fmt::Debug for ReplayBroadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ReplayBroadcaster");
        out.field("name", &self.name).field("capacity", &self.capacity);

        if DeliveryGuard::is_active(self.id) {
            return out.finish_non_exhaustive();
        }

        let inner = self.inner.lock();
        out.field("history_len", &inner.history.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Deliver one value to one subscriber
///
/// Returns false when the subscriber must be removed.
fn deliver<T>(
    name: &str,
    subscriber: &mut Subscriber<T>,
    value: &T,
    counters: &mut DeliveryCounters,
    phase: Phase,
) -> bool {
    let result = catch_unwind(AssertUnwindSafe(|| subscriber.sink.deliver(value)));

    match result {
        Ok(Ok(())) => {
            match phase {
                Phase::Replay => counters.replayed += 1,
                Phase::Live => counters.delivered += 1,
            }
            true
        }
        Ok(Err(SinkError::Full)) => {
            counters.dropped += 1;
            tracing::debug!(
                broadcaster = %name,
                subscriber = %subscriber.id,
                phase = ?phase,
                "Subscriber queue full, value dropped"
            );
            true
        }
        Ok(Err(SinkError::Failed(reason))) => {
            counters.failed += 1;
            tracing::warn!(
                broadcaster = %name,
                subscriber = %subscriber.id,
                phase = ?phase,
                error = %reason,
                "Delivery failed"
            );
            true
        }
        Ok(Err(SinkError::Closed)) => {
            counters.evicted += 1;
            tracing::debug!(
                broadcaster = %name,
                subscriber = %subscriber.id,
                "Subscriber sink closed, removing"
            );
            false
        }
        Err(_) => {
            counters.failed += 1;
            counters.evicted += 1;
            tracing::warn!(
                broadcaster = %name,
                subscriber = %subscriber.id,
                phase = ?phase,
                "Subscriber sink panicked, removing"
            );
            false
        }
    }
}
