//! # Pipeline Heads
//!
//! Typed builders over the erased stage chain.
//!
//! [`Flux`] is the multi-result head and [`Mono`] the single-result head.
//! Both wrap a [`StageRef`]; every builder method consumes `self`, so each
//! stage ends up with exactly one downstream. Share a finished head across
//! threads with `&Flux` / `Arc<Flux>` to attach concurrently.

use crate::ops::{CollectList, Count, DoOnNext, Filter, Hide, Log, Map, Reduce, SubscribeOn, Take};
use crate::publisher::{Empty, Failing, FromIterable, Just, Range};
use crate::{
    AnySubscriber, Assembly, AssemblyError, Cardinality, Operator, OperatorHead, Publisher,
    Scheduler, SourceStage, StageRef, StreamError, Subscriber, assemble,
};
use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// FLUX
// =============================================================================

/// A pipeline emitting zero or more items of type `T`.
pub struct Flux<T> {
    stage: StageRef,
    _item: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Flux<T> {
    fn from_stage(stage: StageRef) -> Self {
        Self {
            stage,
            _item: PhantomData,
        }
    }

    /// Host any publisher as the terminal stage.
    #[must_use]
    pub fn from_publisher<P: Publisher<T>>(publisher: P) -> Self {
        Self::from_stage(Arc::new(SourceStage::new(publisher)))
    }

    /// Replay a cloneable collection to every subscriber.
    #[must_use]
    pub fn from_iterable<C>(items: C) -> Self
    where
        C: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Self::from_publisher(FromIterable::new(items))
    }

    /// Emit one item.
    #[must_use]
    pub fn just(item: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_publisher(Just::new(item))
    }

    /// Complete without items.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_publisher(Empty::new())
    }

    /// Fail without items.
    #[must_use]
    pub fn error(error: StreamError) -> Self {
        Self::from_publisher(Failing::new(error))
    }

    /// The outermost stage.
    #[must_use]
    pub fn stage(&self) -> &StageRef {
        &self.stage
    }

    /// Give up the typed wrapper.
    #[must_use]
    pub fn into_stage(self) -> StageRef {
        self.stage
    }

    /// Put `operator` on top of this pipeline.
    #[must_use]
    pub fn lift<Op>(self, operator: Op) -> Flux<Op::Out>
    where
        Op: Operator<In = T>,
    {
        Flux::from_stage(Arc::new(OperatorHead::new(
            self.stage,
            operator,
            Cardinality::Many,
        )))
    }

    /// Put a reducing `operator` on top of this pipeline, producing a [`Mono`].
    #[must_use]
    pub fn lift_mono<Op>(self, operator: Op) -> Mono<Op::Out>
    where
        Op: Operator<In = T>,
    {
        Mono::from_stage(Arc::new(OperatorHead::new(
            self.stage,
            operator,
            Cardinality::One,
        )))
    }

    /// Transform every item.
    #[must_use]
    pub fn map<U, F>(self, mapper: F) -> Flux<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.lift(Map::new(mapper))
    }

    /// Keep the items matching `predicate`.
    #[must_use]
    pub fn filter<P>(self, predicate: P) -> Flux<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.lift(Filter::new(predicate))
    }

    /// Keep the first `limit` items.
    #[must_use]
    pub fn take(self, limit: u64) -> Flux<T> {
        self.lift(Take::new(limit))
    }

    /// Add an identity hop.
    #[must_use]
    pub fn hide(self) -> Flux<T> {
        self.lift(Hide::new())
    }

    /// Observe every item.
    #[must_use]
    pub fn do_on_next<F>(self, callback: F) -> Flux<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lift(DoOnNext::new(callback))
    }

    /// Log every signal under `category`.
    #[must_use]
    pub fn log(self, category: impl Into<String>) -> Flux<T>
    where
        T: Debug,
    {
        self.lift(Log::new(category))
    }

    /// Attach upstream on `scheduler`.
    #[must_use]
    pub fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Flux<T> {
        self.lift(SubscribeOn::new(scheduler))
    }

    /// Count the items.
    #[must_use]
    pub fn count(self) -> Mono<i64> {
        self.lift_mono(Count::new())
    }

    /// Gather all items into one `Vec`.
    #[must_use]
    pub fn collect_list(self) -> Mono<Vec<T>> {
        self.lift_mono(CollectList::new())
    }

    /// Fold the items pairwise.
    #[must_use]
    pub fn reduce<F>(self, reducer: F) -> Mono<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.lift_mono(Reduce::new(reducer))
    }

    /// Attach `subscriber` to this pipeline.
    pub fn subscribe<S>(&self, subscriber: S) -> Result<Assembly, AssemblyError>
    where
        S: Subscriber<T> + 'static,
    {
        assemble::attach(self.stage.as_ref(), AnySubscriber::new::<T>(Box::new(subscriber)))
    }
}

impl Flux<i64> {
    /// Emit `count` consecutive integers starting at `start`.
    #[must_use]
    pub fn range(start: i64, count: u64) -> Self {
        Self::from_publisher(Range::new(start, count))
    }
}

impl<T> fmt::Debug for Flux<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flux")
            .field("stage", &self.stage.name())
            .finish()
    }
}

// =============================================================================
// MONO
// =============================================================================

/// A pipeline emitting at most one item of type `T`.
pub struct Mono<T> {
    stage: StageRef,
    _item: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Mono<T> {
    fn from_stage(stage: StageRef) -> Self {
        Self {
            stage,
            _item: PhantomData,
        }
    }

    /// Host a publisher that emits at most one item.
    #[must_use]
    pub fn from_publisher<P: Publisher<T>>(publisher: P) -> Self {
        Self::from_stage(Arc::new(SourceStage::new(publisher)))
    }

    /// Emit one item.
    #[must_use]
    pub fn just(item: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_publisher(Just::new(item))
    }

    /// Complete without an item.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_publisher(Empty::new())
    }

    /// Fail without an item.
    #[must_use]
    pub fn error(error: StreamError) -> Self {
        Self::from_publisher(Failing::new(error))
    }

    /// The outermost stage.
    #[must_use]
    pub fn stage(&self) -> &StageRef {
        &self.stage
    }

    /// Give up the typed wrapper.
    #[must_use]
    pub fn into_stage(self) -> StageRef {
        self.stage
    }

    /// Put `operator` on top of this pipeline.
    #[must_use]
    pub fn lift<Op>(self, operator: Op) -> Mono<Op::Out>
    where
        Op: Operator<In = T>,
    {
        Mono::from_stage(Arc::new(OperatorHead::new(
            self.stage,
            operator,
            Cardinality::One,
        )))
    }

    /// Transform the item.
    #[must_use]
    pub fn map<U, F>(self, mapper: F) -> Mono<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.lift(Map::new(mapper))
    }

    /// Add an identity hop.
    #[must_use]
    pub fn hide(self) -> Mono<T> {
        self.lift(Hide::new())
    }

    /// Drop the item unless it matches `predicate`.
    #[must_use]
    pub fn filter<P>(self, predicate: P) -> Mono<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.lift(Filter::new(predicate))
    }

    /// Observe the item.
    #[must_use]
    pub fn do_on_next<F>(self, callback: F) -> Mono<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lift(DoOnNext::new(callback))
    }

    /// Log every signal under `category`.
    #[must_use]
    pub fn log(self, category: impl Into<String>) -> Mono<T>
    where
        T: Debug,
    {
        self.lift(Log::new(category))
    }

    /// Attach upstream on `scheduler`.
    #[must_use]
    pub fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Mono<T> {
        self.lift(SubscribeOn::new(scheduler))
    }

    /// Attach `subscriber` to this pipeline.
    pub fn subscribe<S>(&self, subscriber: S) -> Result<Assembly, AssemblyError>
    where
        S: Subscriber<T> + 'static,
    {
        assemble::attach(self.stage.as_ref(), AnySubscriber::new::<T>(Box::new(subscriber)))
    }
}

impl<T> fmt::Debug for Mono<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mono")
            .field("stage", &self.stage.name())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attr, Prefetch, Recorder, ScanValue, Termination};

    fn prefetch_of(stage: &StageRef) -> Option<Prefetch> {
        match stage.scan(Attr::Prefetch) {
            Some(ScanValue::Prefetch(prefetch)) => Some(prefetch),
            _ => None,
        }
    }

    #[test]
    fn flux_and_mono_differ_only_in_prefetch() {
        let flux = Flux::range(0, 3).map(|v| v + 1);
        let mono = Mono::just(1i64).map(|v| v + 1);

        assert_eq!(prefetch_of(flux.stage()), Some(Prefetch::Bounded(256)));
        assert_eq!(prefetch_of(mono.stage()), Some(Prefetch::Unbounded));
        assert_eq!(flux.stage().name(), mono.stage().name());
    }

    #[test]
    fn count_head_is_single_result() {
        let mono = Flux::range(0, 3).count();
        assert_eq!(prefetch_of(mono.stage()), Some(Prefetch::Unbounded));
    }

    #[test]
    fn mono_pipeline_emits_once() {
        let mono = Mono::just(20i64).filter(|v| *v > 10).map(|v| v / 2);
        let (recorder, handle) = Recorder::<i64>::new();

        let assembly = mono.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::Attached { hops: 2 });
        assert_eq!(handle.items(), vec![10]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn empty_and_error_heads() {
        let (recorder, handle) = Recorder::<u8>::new();
        Mono::<u8>::empty().subscribe(recorder).expect("subscribe");
        assert_eq!(handle.termination(), Some(Termination::Completed));

        let (recorder, handle) = Recorder::<u8>::new();
        Flux::<u8>::error(StreamError::new("bad"))
            .hide()
            .subscribe(recorder)
            .expect("subscribe");
        assert_eq!(
            handle.termination(),
            Some(Termination::Failed(StreamError::new("bad")))
        );
    }

    #[test]
    fn same_flux_supports_repeated_subscription() {
        let flux = Flux::just(7u8).map(|v| v + 1);
        for _ in 0..3 {
            let (recorder, handle) = Recorder::<u8>::new();
            flux.subscribe(recorder).expect("subscribe");
            assert_eq!(handle.items(), vec![8]);
        }
    }

    #[test]
    fn debug_shows_outermost_stage() {
        let flux = Flux::range(0, 1).take(1);
        assert_eq!(format!("{:?}", flux), "Flux { stage: \"take\" }");
    }
}
