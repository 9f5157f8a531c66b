//! Subscriber sinks
//!
//! A [`Sink`] receives every value a broadcaster delivers to it, in emission
//! order. Delivery is synchronous: the broadcaster calls `deliver` while it
//! holds its lock. Mutating calls a sink makes on that same broadcaster are
//! deferred until the delivery finishes.
//!
//! For consumers that should not apply backpressure to the emitter, tokio
//! channel senders implement `Sink` directly and act as a per-subscriber
//! queue.

use tokio::sync::mpsc;

use crate::error::SinkError;

/// Consumer of broadcast values
pub trait Sink<T>: Send {
    /// Deliver one value
    ///
    /// Returning `Err(SinkError::Closed)` removes the subscriber.
    fn deliver(&mut self, value: &T) -> Result<(), SinkError>;
}

/// Sink adapter for a closure
pub struct FnSink<F> {
    f: F,
}

/// Wrap a closure as an infallible sink
///
/// # Example
/// ```
/// use replaycast::broadcast::{sink, ReplayBroadcaster};
///
/// let broadcaster = ReplayBroadcaster::new(1);
/// broadcaster.emit(42);
/// broadcaster.subscribe(sink::from_fn(|v: &i32| println!("got {v}")));
/// ```
pub fn from_fn<T, F>(f: F) -> FnSink<F>
where
    F: FnMut(&T) + Send,
{
    FnSink { f }
}

impl<T, F> Sink<T> for FnSink<F>
where
    F: FnMut(&T) + Send,
{
    fn deliver(&mut self, value: &T) -> Result<(), SinkError> {
        (self.f)(value);
        Ok(())
    }
}

/// Unbounded queue; never blocks the emitter
impl<T: Clone + Send> Sink<T> for mpsc::UnboundedSender<T> {
    fn deliver(&mut self, value: &T) -> Result<(), SinkError> {
        self.send(value.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Bounded queue; a full queue drops the value for this subscriber only
impl<T: Clone + Send> Sink<T> for mpsc::Sender<T> {
    fn deliver(&mut self, value: &T) -> Result<(), SinkError> {
        self.try_send(value.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
