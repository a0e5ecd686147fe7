//! Flux-to-mono reducers: `count`, `collect_list`, `reduce`.
//!
//! These operators sit at the boundary between the two structural variants:
//! they consume a multi-result upstream and are hosted by single-result heads.
//! Each emits exactly once, on upstream completion.

use crate::{
    AssemblyError, Attach, BoxSubscriber, Detached, Downstream, Operator, StageRef, StreamError,
    Subscriber, Termination,
};
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// COUNT
// =============================================================================

/// Emit the number of upstream items.
pub struct Count<T> {
    _item: PhantomData<fn(T)>,
}

impl<T> Count<T> {
    /// Create a counting operator.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T: Send + 'static> Operator for Count<T> {
    type In = T;
    type Out = i64;

    fn name(&self) -> &str {
        "count"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<i64>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(CountSubscriber {
            actual: Downstream::new(actual),
            count: 0,
            _item: PhantomData,
        })))
    }
}

struct CountSubscriber<T> {
    actual: Downstream<i64>,
    count: i64,
    _item: PhantomData<fn(T)>,
}

impl<T> Subscriber<T> for CountSubscriber<T> {
    fn on_next(&mut self, _item: T) {
        self.count = self.count.saturating_add(1);
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
        if *signal == Termination::Completed {
            self.actual.on_next(self.count);
        }
        self.actual.detach()
    }
}

// =============================================================================
// COLLECT LIST
// =============================================================================

/// Emit all upstream items as one `Vec`.
pub struct CollectList<T> {
    _item: PhantomData<fn(T)>,
}

impl<T> CollectList<T> {
    /// Create a collecting operator.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T: Send + 'static> Operator for CollectList<T> {
    type In = T;
    type Out = Vec<T>;

    fn name(&self) -> &str {
        "collect_list"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<Vec<T>>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(CollectSubscriber {
            actual: Downstream::new(actual),
            items: Vec::new(),
        })))
    }
}

struct CollectSubscriber<T: 'static> {
    actual: Downstream<Vec<T>>,
    items: Vec<T>,
}

impl<T: Send + 'static> Subscriber<T> for CollectSubscriber<T> {
    fn on_next(&mut self, item: T) {
        self.items.push(item);
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
        let items = std::mem::take(&mut self.items);
        if *signal == Termination::Completed {
            self.actual.on_next(items);
        }
        self.actual.detach()
    }
}

// =============================================================================
// REDUCE
// =============================================================================

/// Fold upstream items pairwise; emit the result if there was at least one.
pub struct Reduce<T, F> {
    reducer: Arc<F>,
    _item: PhantomData<fn(T) -> T>,
}

impl<T, F> Reduce<T, F>
where
    F: Fn(T, T) -> T,
{
    /// Create a reducing operator.
    #[must_use]
    pub fn new(reducer: F) -> Self {
        Self {
            reducer: Arc::new(reducer),
            _item: PhantomData,
        }
    }
}

impl<T, F> Operator for Reduce<T, F>
where
    T: Send + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "reduce"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(Box::new(ReduceSubscriber {
            actual: Downstream::new(actual),
            reducer: Arc::clone(&self.reducer),
            acc: None,
        })))
    }
}

struct ReduceSubscriber<T: 'static, F> {
    actual: Downstream<T>,
    reducer: Arc<F>,
    acc: Option<T>,
}

impl<T, F> Subscriber<T> for ReduceSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(T, T) -> T + Send + Sync,
{
    fn on_next(&mut self, item: T) {
        self.acc = Some(match self.acc.take() {
            Some(acc) => (self.reducer)(acc, item),
            None => item,
        });
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
        let acc = self.acc.take();
        if let (Termination::Completed, Some(acc)) = (signal, acc) {
            self.actual.on_next(acc);
        }
        self.actual.detach()
    }
}
