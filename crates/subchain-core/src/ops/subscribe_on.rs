//! `subscribe_on`: attach the upstream on a scheduler instead of the caller.
//!
//! This is the escape hatch in action: the operator clones its upstream edge
//! into a scheduled task, returns [`Attach::SelfHandled`], and the flattening
//! loop stops. The task later runs a fresh assembly pass from the upstream.

use crate::{
    AnySubscriber, AssemblyError, Attach, BoxSubscriber, Operator, RunStyle, Scheduler, StageRef,
    assemble,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Defer upstream attachment to `scheduler`.
pub struct SubscribeOn<T> {
    scheduler: Arc<dyn Scheduler>,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> SubscribeOn<T> {
    /// Create a `subscribe_on` operator.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            _item: PhantomData,
        }
    }
}

impl<T: Send + 'static> Operator for SubscribeOn<T> {
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "subscribe_on"
    }

    fn run_style(&self) -> RunStyle {
        RunStyle::Async
    }

    fn subscribe_or_return(
        &self,
        source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        let source = Arc::clone(source);
        let subscriber = AnySubscriber::new(actual);
        let scheduler = self.scheduler.name().to_string();

        self.scheduler.schedule(Box::new(move || {
            // The subscriber moved into the pass; failures can only be logged.
            if let Err(error) = assemble::attach(source.as_ref(), subscriber) {
                tracing::error!(%error, scheduler = %scheduler, "deferred attachment failed");
            }
        }))?;

        Ok(Attach::SelfHandled)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Assembly, Flux, Immediate, Recorder, Termination, ThreadScheduler};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn immediate_scheduler_attaches_inline() {
        let flux = Flux::range(1, 3)
            .subscribe_on(Arc::new(Immediate))
            .map(|v| v * 2);
        let (recorder, handle) = Recorder::<i64>::new();

        let assembly = flux.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::SelfHandled { position: 1 });
        assert_eq!(handle.items(), vec![2, 4, 6]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn thread_scheduler_delivers_on_worker() {
        let flux = Flux::range(0, 4)
            .map(|v| v + 1)
            .subscribe_on(Arc::new(ThreadScheduler::new("subscribe-on-test")));
        let (recorder, handle) = Recorder::<i64>::new();

        let assembly = flux.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::SelfHandled { position: 0 });
        assert!(handle.wait(Duration::from_secs(5)));
        assert_eq!(handle.items(), vec![1, 2, 3, 4]);
    }
}
