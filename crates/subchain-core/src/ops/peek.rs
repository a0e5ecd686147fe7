//! Side-effect operators: `do_on_next` and `log`.
//!
//! Both observe signals and forward them untouched.

use crate::{
    AssemblyError, Attach, BoxSubscriber, Detached, Downstream, Operator, StageRef, StreamError,
    Subscriber, Termination,
};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// DO ON NEXT
// =============================================================================

/// Run `callback` on every item before forwarding it.
pub struct DoOnNext<T, F> {
    callback: Arc<F>,
    _item: PhantomData<fn(T)>,
}

impl<T, F> DoOnNext<T, F>
where
    F: Fn(&T),
{
    /// Create a `do_on_next` operator.
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback: Arc::new(callback),
            _item: PhantomData,
        }
    }
}

impl<T, F> Operator for DoOnNext<T, F>
where
    T: Send + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "do_on_next"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(PeekSubscriber {
            actual: Downstream::new(actual),
            callback: Arc::clone(&self.callback),
        })))
    }
}

struct PeekSubscriber<T: 'static, F> {
    actual: Downstream<T>,
    callback: Arc<F>,
}

impl<T, F> Subscriber<T> for PeekSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(&T) + Send + Sync,
{
    fn on_next(&mut self, item: T) {
        (self.callback)(&item);
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

// =============================================================================
// LOG
// =============================================================================

/// Emit every signal as a `tracing` event tagged with `category`.
pub struct Log<T> {
    category: Arc<str>,
    _item: PhantomData<fn(T)>,
}

impl<T> Log<T> {
    /// Create a signal logger.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: Arc::from(category.into()),
            _item: PhantomData,
        }
    }
}

impl<T: Debug + Send + 'static> Operator for Log<T> {
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "log"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        tracing::info!(category = %self.category, "on_subscribe");
        Ok(Attach::Continue(Box::new(LogSubscriber {
            actual: Downstream::new(actual),
            category: Arc::clone(&self.category),
        })))
    }
}

struct LogSubscriber<T: 'static> {
    actual: Downstream<T>,
    category: Arc<str>,
}

impl<T: Debug + Send + 'static> Subscriber<T> for LogSubscriber<T> {
    fn on_next(&mut self, item: T) {
        tracing::info!(category = %self.category, ?item, "on_next");
        self.actual.on_next(item);
    }

    fn on_error(&mut self, error: StreamError) {
        self.deliver(Termination::Failed(error));
    }

    fn on_complete(&mut self) {
        self.deliver(Termination::Completed);
    }

    fn unlink(&mut self) -> Option<Detached> {
        self.actual.detach()
    }

    fn relay(&mut self, signal: &Termination) -> Option<Detached> {
        match signal {
            Termination::Completed => tracing::info!(category = %self.category, "on_complete"),
            Termination::Failed(error) => {
                tracing::error!(category = %self.category, %error, "on_error");
            }
        }
        self.actual.detach()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Flux, Recorder};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn do_on_next_sees_every_item() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let flux = Flux::range(0, 5).do_on_next(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let (recorder, handle) = Recorder::<i64>::new();

        flux.subscribe(recorder).expect("subscribe");

        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(handle.len(), 5);
    }

    #[test]
    fn log_forwards_items_untouched() {
        let flux = Flux::from_iterable(vec!["a", "b"]).log("letters");
        let (recorder, handle) = Recorder::<&'static str>::new();

        flux.subscribe(recorder).expect("subscribe");

        assert_eq!(handle.items(), vec!["a", "b"]);
    }
}
