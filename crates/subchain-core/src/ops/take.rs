//! `take`: forward at most `n` items, then complete.

use crate::{
    AssemblyError, Attach, BoxSubscriber, Detached, Downstream, Operator, Prefetch, StageRef,
    StreamError, Subscriber, Termination,
};
use std::marker::PhantomData;

/// Limit a stream to its first `limit` items.
///
/// `take(0)` never attaches upstream: it completes the subscriber during
/// assembly and reports [`Attach::SelfHandled`].
pub struct Take<T> {
    limit: u64,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> Take<T> {
    /// Create a take operator.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            _item: PhantomData,
        }
    }
}

impl<T: Send + 'static> Operator for Take<T> {
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "take"
    }

    fn prefetch(&self) -> Prefetch {
        u32::try_from(self.limit)
            .map(Prefetch::Bounded)
            .unwrap_or(Prefetch::Unbounded)
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        if self.limit == 0 {
            Detached::new(actual).terminate(&Termination::Completed);
            return Ok(Attach::SelfHandled);
        }
        Ok(Attach::Continue(Box::new(TakeSubscriber {
            actual: Downstream::new(actual),
            remaining: self.limit,
            done: false,
        })))
    }
}

struct TakeSubscriber<T: 'static> {
    actual: Downstream<T>,
    remaining: u64,
    done: bool,
}

impl<T: Send + 'static> Subscriber<T> for TakeSubscriber<T> {
    fn on_next(&mut self, item: T) {
        if self.done {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.actual.on_next(item);
        if self.remaining == 0 {
            self.done = true;
            self.actual.on_complete();
        }
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

    fn relay(&mut self, _signal: &Termination) -> Option<Detached> {
        if self.done {
            return None;
        }
        self.done = true;
        self.actual.detach()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Assembly, Flux, Recorder, Termination};

    #[test]
    fn take_truncates_and_completes_once() {
        let flux = Flux::range(0, 100).take(3);
        let (recorder, handle) = Recorder::<i64>::new();

        let assembly = flux.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::Attached { hops: 1 });
        assert_eq!(handle.items(), vec![0, 1, 2]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn take_zero_never_reaches_source() {
        let flux = Flux::range(0, 100).map(|v| v * 2).take(0);
        let (recorder, handle) = Recorder::<i64>::new();

        let assembly = flux.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::SelfHandled { position: 0 });
        assert!(handle.is_empty());
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }
}
