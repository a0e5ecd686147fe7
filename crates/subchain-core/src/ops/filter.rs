//! `filter`: forward only the items matching a predicate.

use crate::{
    AssemblyError, Attach, BoxSubscriber, Detached, Downstream, Operator, StageRef, StreamError,
    Subscriber, Termination,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Drop upstream items for which `predicate` returns `false`.
pub struct Filter<T, P> {
    predicate: Arc<P>,
    _item: PhantomData<fn(T)>,
}

impl<T, P> Filter<T, P>
where
    P: Fn(&T) -> bool,
{
    /// Create a filter operator.
    #[must_use]
    pub fn new(predicate: P) -> Self {
        Self {
            predicate: Arc::new(predicate),
            _item: PhantomData,
        }
    }
}

impl<T, P> Operator for Filter<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "filter"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(FilterSubscriber {
            actual: Downstream::new(actual),
            predicate: Arc::clone(&self.predicate),
        })))
    }
}

struct FilterSubscriber<T: 'static, P> {
    actual: Downstream<T>,
    predicate: Arc<P>,
}

impl<T, P> Subscriber<T> for FilterSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync,
{
    fn on_next(&mut self, item: T) {
        if (self.predicate)(&item) {
            self.actual.on_next(item);
        }
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

#[cfg(test)]
mod tests {
    use crate::{Flux, Recorder, Termination};

    #[test]
    fn filter_keeps_matching_items() {
        let flux = Flux::range(1, 10).filter(|v| v % 3 == 0);
        let (recorder, handle) = Recorder::<i64>::new();

        flux.subscribe(recorder).expect("subscribe");

        assert_eq!(handle.items(), vec![3, 6, 9]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }
}
