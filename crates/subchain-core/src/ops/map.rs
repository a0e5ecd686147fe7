//! `map`: transform every item with a function.

use crate::{
    AssemblyError, Attach, BoxSubscriber, Detached, Downstream, Operator, StageRef, StreamError,
    Subscriber, Termination,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Apply `mapper` to each upstream item.
pub struct Map<I, O, F> {
    mapper: Arc<F>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> Map<I, O, F>
where
    F: Fn(I) -> O,
{
    /// Create a map operator.
    #[must_use]
    pub fn new(mapper: F) -> Self {
        Self {
            mapper: Arc::new(mapper),
            _types: PhantomData,
        }
    }
}

impl<I, O, F> Operator for Map<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    type In = I;
    type Out = O;

    fn name(&self) -> &str {
        "map"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<O>,
    ) -> Result<Attach<BoxSubscriber<I>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(MapSubscriber {
            actual: Downstream::new(actual),
            mapper: Arc::clone(&self.mapper),
            _input: PhantomData,
        })))
    }
}

struct MapSubscriber<I, O: 'static, F> {
    actual: Downstream<O>,
    mapper: Arc<F>,
    _input: PhantomData<fn(I)>,
}

impl<I, O, F> Subscriber<I> for MapSubscriber<I, O, F>
where
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync,
{
    fn on_next(&mut self, item: I) {
        self.actual.on_next((self.mapper)(item));
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
