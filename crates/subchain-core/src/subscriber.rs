//! # Subscriber Contract
//!
//! The receiving half of the producer/consumer contract, plus the type-erased
//! wrapper the flattening loop passes between stages.
//!
//! Operators change item types (`map` turns a subscriber of `U` into a
//! subscriber of `T`), so a single loop cannot hold a statically typed
//! subscriber across iterations. [`AnySubscriber`] carries the boxed typed
//! subscriber and recovers it at each stage with a checked downcast.
//!
//! Adapters hold the subscriber they forward to in a [`Downstream`]. Nested
//! adapters are torn down and handed terminal signals one link at a time, so
//! wrapping depth never becomes stack depth.

use crate::{AssemblyError, StreamError};
use parking_lot::{Condvar, Mutex};
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// SUBSCRIBER TRAIT
// =============================================================================

/// Interest in receiving a stream's signals.
///
/// Signals arrive in the order `on_next* (on_error | on_complete)?`.
pub trait Subscriber<T>: Send {
    /// Receive one item.
    fn on_next(&mut self, item: T);

    /// Receive the terminal failure signal.
    fn on_error(&mut self, error: StreamError);

    /// Receive the terminal completion signal.
    fn on_complete(&mut self);

    /// Hand over the downstream subscriber this one wraps, if any.
    fn unlink(&mut self) -> Option<Detached> {
        None
    }

    /// Handle a terminal signal locally and return the downstream that should
    /// receive it next instead of calling it.
    ///
    /// The default delivers the signal through `on_complete` / `on_error` and
    /// stops the relay.
    fn relay(&mut self, signal: &Termination) -> Option<Detached> {
        match signal {
            Termination::Completed => self.on_complete(),
            Termination::Failed(error) => self.on_error(error.clone()),
        }
        None
    }

    /// Run `signal` through [`Subscriber::relay`] here and down the chain.
    fn deliver(&mut self, signal: Termination)
    where
        Self: Sized,
    {
        if let Some(next) = self.relay(&signal) {
            next.terminate(&signal);
        }
    }
}

/// Owned, dynamically dispatched subscriber.
pub type BoxSubscriber<T> = Box<dyn Subscriber<T>>;

impl<T, S: Subscriber<T> + ?Sized> Subscriber<T> for Box<S> {
    fn on_next(&mut self, item: T) {
        (**self).on_next(item);
    }

    fn on_error(&mut self, error: StreamError) {
        (**self).on_error(error);
    }

    fn on_complete(&mut self) {
        (**self).on_complete();
    }

    fn unlink(&mut self) -> Option<Detached> {
        (**self).unlink()
    }

    fn relay(&mut self, signal: &Termination) -> Option<Detached> {
        (**self).relay(signal)
    }
}

// =============================================================================
// DOWNSTREAM LINKS
// =============================================================================

/// The subscriber an adapter forwards to.
///
/// Terminal signals and drop both walk the remaining chain in a loop. After a
/// terminal signal the link is empty and later signals are ignored.
pub struct Downstream<T: 'static> {
    actual: Option<BoxSubscriber<T>>,
}

impl<T: 'static> Downstream<T> {
    #[must_use]
    pub fn new(actual: BoxSubscriber<T>) -> Self {
        Self {
            actual: Some(actual),
        }
    }

    pub fn on_next(&mut self, item: T) {
        if let Some(actual) = self.actual.as_mut() {
            actual.on_next(item);
        }
    }

    pub fn on_error(&mut self, error: StreamError) {
        self.terminate(Termination::Failed(error));
    }

    pub fn on_complete(&mut self) {
        self.terminate(Termination::Completed);
    }

    /// Give up the wrapped subscriber, erased. Used by `unlink` and `relay`.
    pub fn detach(&mut self) -> Option<Detached> {
        self.actual.take().map(Detached::new)
    }

    fn terminate(&mut self, signal: Termination) {
        if let Some(actual) = self.detach() {
            actual.terminate(&signal);
        }
    }
}

impl<T: 'static> Drop for Downstream<T> {
    fn drop(&mut self) {
        drop(self.detach());
    }
}

/// An owned subscriber chain with its item type erased.
///
/// Dropping it releases the chain link by link.
pub struct Detached {
    link: Box<dyn Link>,
}

trait Link: Send {
    fn unlink(&mut self) -> Option<Detached>;
    fn relay(&mut self, signal: &Termination) -> Option<Detached>;
}

struct Erased<T>(BoxSubscriber<T>);

impl<T> Link for Erased<T> {
    fn unlink(&mut self) -> Option<Detached> {
        self.0.unlink()
    }

    fn relay(&mut self, signal: &Termination) -> Option<Detached> {
        self.0.relay(signal)
    }
}

impl Detached {
    #[must_use]
    pub fn new<T: 'static>(subscriber: BoxSubscriber<T>) -> Self {
        Self {
            link: Box::new(Erased(subscriber)),
        }
    }

    /// Deliver `signal` down the chain until a subscriber keeps it.
    pub fn terminate(self, signal: &Termination) {
        let mut current = self;
        while let Some(next) = current.link.relay(signal) {
            current = next;
        }
    }
}

impl Drop for Detached {
    fn drop(&mut self) {
        let mut next = self.link.unlink();
        while let Some(mut link) = next {
            next = link.link.unlink();
        }
    }
}

impl fmt::Debug for Detached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detached").finish_non_exhaustive()
    }
}

// =============================================================================
// TYPE-ERASED SUBSCRIBER
// =============================================================================

/// A [`BoxSubscriber`] with its item type erased.
pub struct AnySubscriber {
    inner: Box<dyn Any + Send>,
    item_type: &'static str,
}

impl AnySubscriber {
    /// Erase a typed subscriber.
    #[must_use]
    pub fn new<T: 'static>(subscriber: BoxSubscriber<T>) -> Self {
        Self {
            inner: Box::new(subscriber),
            item_type: type_name::<T>(),
        }
    }

    /// Name of the item type this subscriber accepts.
    #[must_use]
    pub fn item_type(&self) -> &'static str {
        self.item_type
    }

    /// Recover the typed subscriber on behalf of `stage`.
    ///
    /// Returns `AssemblyError::SubscriberMismatch` when the item type differs.
    pub fn downcast<T: 'static>(self, stage: &str) -> Result<BoxSubscriber<T>, AssemblyError> {
        let found = self.item_type;
        self.inner
            .downcast::<BoxSubscriber<T>>()
            .map(|subscriber| *subscriber)
            .map_err(|_| AssemblyError::SubscriberMismatch {
                stage: stage.to_string(),
                expected: type_name::<T>(),
                found,
            })
    }
}

impl fmt::Debug for AnySubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySubscriber")
            .field("item_type", &self.item_type)
            .finish()
    }
}

// =============================================================================
// CLOSURE SUBSCRIBER
// =============================================================================

/// Subscriber that feeds every item to a closure.
///
/// Errors are logged; completion is ignored.
pub struct ForEach<F> {
    on_next: F,
}

/// Build a subscriber from an `on_next` closure.
pub fn for_each<T, F>(on_next: F) -> ForEach<F>
where
    F: FnMut(T) + Send,
{
    ForEach { on_next }
}

impl<T, F> Subscriber<T> for ForEach<F>
where
    F: FnMut(T) + Send,
{
    fn on_next(&mut self, item: T) {
        (self.on_next)(item);
    }

    fn on_error(&mut self, error: StreamError) {
        tracing::error!(%error, "stream failed without an error handler");
    }

    fn on_complete(&mut self) {}
}

// =============================================================================
// RECORDER
// =============================================================================

/// How a recorded stream terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// `on_complete` was received.
    Completed,
    /// `on_error` was received.
    Failed(StreamError),
}

#[derive(Debug)]
struct Recording<T> {
    items: Vec<T>,
    termination: Option<Termination>,
}

#[derive(Debug)]
struct Shared<T> {
    state: Mutex<Recording<T>>,
    terminated: Condvar,
}

/// Subscriber that stores every signal for later inspection.
///
/// The paired [`RecordHandle`] can be read from any thread, and can block until
/// a terminal signal arrives (for pipelines that attach asynchronously).
pub struct Recorder<T> {
    shared: Arc<Shared<T>>,
}

/// Read side of a [`Recorder`].
pub struct RecordHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Recorder<T> {
    /// Create a recorder and its read handle.
    #[must_use]
    pub fn new() -> (Self, RecordHandle<T>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(Recording {
                items: Vec::new(),
                termination: None,
            }),
            terminated: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            RecordHandle { shared },
        )
    }

    fn terminate(&mut self, termination: Termination) {
        let mut state = self.shared.state.lock();
        if state.termination.is_none() {
            state.termination = Some(termination);
            self.shared.terminated.notify_all();
        }
    }
}

impl<T: Send> Subscriber<T> for Recorder<T> {
    fn on_next(&mut self, item: T) {
        let mut state = self.shared.state.lock();
        if state.termination.is_none() {
            state.items.push(item);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        self.terminate(Termination::Failed(error));
    }

    fn on_complete(&mut self) {
        self.terminate(Termination::Completed);
    }
}

impl<T> RecordHandle<T> {
    /// Number of items received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    /// Check if no items were received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The terminal signal, if one arrived.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.shared.state.lock().termination.clone()
    }

    /// Block until a terminal signal arrives or `timeout` elapses.
    ///
    /// Returns `true` if the stream terminated.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.termination.is_none() {
            if self
                .shared
                .terminated
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.termination.is_some();
            }
        }
        true
    }
}

impl<T: Clone> RecordHandle<T> {
    /// Snapshot of the items received so far.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.shared.state.lock().items.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_matching_type() {
        let (recorder, handle) = Recorder::<u32>::new();
        let erased = AnySubscriber::new::<u32>(Box::new(recorder));
        assert_eq!(erased.item_type(), "u32");

        let mut typed = erased.downcast::<u32>("test").expect("downcast");
        typed.on_next(7);
        typed.on_complete();

        assert_eq!(handle.items(), vec![7]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn downcast_rejects_other_type() {
        let (recorder, _handle) = Recorder::<u32>::new();
        let erased = AnySubscriber::new::<u32>(Box::new(recorder));

        let result = erased.downcast::<String>("map");
        match result {
            Err(AssemblyError::SubscriberMismatch {
                stage,
                expected,
                found,
            }) => {
                assert_eq!(stage, "map");
                assert_eq!(found, "u32");
                assert!(expected.contains("String"));
            }
            _ => unreachable!("expected a subscriber mismatch"),
        }
    }

    #[test]
    fn recorder_ignores_signals_after_termination() {
        let (mut recorder, handle) = Recorder::<u8>::new();
        recorder.on_next(1);
        recorder.on_error(StreamError::new("first"));
        recorder.on_next(2);
        recorder.on_complete();

        assert_eq!(handle.items(), vec![1]);
        assert_eq!(
            handle.termination(),
            Some(Termination::Failed(StreamError::new("first")))
        );
    }

    #[test]
    fn wait_times_out_without_terminal_signal() {
        let (_recorder, handle) = Recorder::<u8>::new();
        assert!(!handle.wait(Duration::from_millis(10)));
        assert!(handle.is_empty());
    }

    #[test]
    fn wait_observes_completion_from_other_thread() {
        let (mut recorder, handle) = Recorder::<u8>::new();
        let worker = std::thread::spawn(move || {
            recorder.on_next(9);
            recorder.on_complete();
        });

        assert!(handle.wait(Duration::from_secs(5)));
        worker.join().expect("join");
        assert_eq!(handle.len(), 1);
    }

    /// Forwarding adapter used to build deep chains by hand.
    struct Relay {
        actual: Downstream<u8>,
    }

    impl Subscriber<u8> for Relay {
        fn on_next(&mut self, item: u8) {
            self.actual.on_next(item);
        }

        fn on_error(&mut self, error: StreamError) {
            self.actual.on_error(error);
        }

        fn on_complete(&mut self) {
            self.actual.on_complete();
        }

        fn unlink(&mut self) -> Option<Detached> {
            self.actual.detach()
        }

        fn relay(&mut self, _signal: &Termination) -> Option<Detached> {
            self.actual.detach()
        }
    }

    fn nested(depth: usize, recorder: Recorder<u8>) -> BoxSubscriber<u8> {
        let mut chain: BoxSubscriber<u8> = Box::new(recorder);
        for _ in 0..depth {
            chain = Box::new(Relay {
                actual: Downstream::new(chain),
            });
        }
        chain
    }

    #[test]
    fn deep_adapter_chain_drops_in_a_loop() {
        let (recorder, handle) = Recorder::<u8>::new();
        drop(nested(200_000, recorder));
        assert!(handle.termination().is_none());
    }

    #[test]
    fn completion_crosses_deep_chain_once() {
        let (recorder, handle) = Recorder::<u8>::new();
        let mut chain = nested(200_000, recorder);

        chain.on_complete();
        chain.on_next(1);

        assert!(handle.is_empty());
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn detached_chain_delivers_error() {
        let (recorder, handle) = Recorder::<u8>::new();
        let mut chain = nested(3, recorder);
        chain.on_next(4);

        Detached::new(chain).terminate(&Termination::Failed(StreamError::new("late")));

        assert_eq!(handle.items(), vec![4]);
        assert_eq!(
            handle.termination(),
            Some(Termination::Failed(StreamError::new("late")))
        );
    }

    #[test]
    fn for_each_feeds_closure() {
        let mut seen = Vec::new();
        {
            let mut subscriber = for_each(|item: i32| seen.push(item));
            Subscriber::<i32>::on_next(&mut subscriber, 1);
            Subscriber::<i32>::on_next(&mut subscriber, 2);
            Subscriber::<i32>::on_complete(&mut subscriber);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
