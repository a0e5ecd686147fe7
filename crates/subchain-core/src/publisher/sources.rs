//! Built-in terminal producers. All deliver synchronously on subscribe.

use super::Publisher;
use crate::{AssemblyError, BoxSubscriber, StreamError};
use std::marker::PhantomData;

/// `count` consecutive integers starting at `start`.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    start: i64,
    count: u64,
}

impl Range {
    /// Create a range producer.
    #[must_use]
    pub const fn new(start: i64, count: u64) -> Self {
        Self { start, count }
    }
}

impl Publisher<i64> for Range {
    fn name(&self) -> &str {
        "range"
    }

    fn subscribe(&self, mut subscriber: BoxSubscriber<i64>) -> Result<(), AssemblyError> {
        let mut value = self.start;
        for emitted in 0..self.count {
            subscriber.on_next(value);
            if emitted + 1 < self.count {
                value = match value.checked_add(1) {
                    Some(next) => next,
                    None => {
                        subscriber.on_error(StreamError::new("range overflowed i64"));
                        return Ok(());
                    }
                };
            }
        }
        subscriber.on_complete();
        Ok(())
    }
}

/// Replays a cloneable collection to every subscriber.
#[derive(Debug, Clone)]
pub struct FromIterable<C> {
    items: C,
}

impl<C> FromIterable<C> {
    /// Create an iterable producer.
    #[must_use]
    pub fn new(items: C) -> Self {
        Self { items }
    }
}

impl<C> Publisher<C::Item> for FromIterable<C>
where
    C: IntoIterator + Clone + Send + Sync + 'static,
    C::Item: Send + 'static,
{
    fn name(&self) -> &str {
        "from_iterable"
    }

    fn subscribe(&self, mut subscriber: BoxSubscriber<C::Item>) -> Result<(), AssemblyError> {
        for item in self.items.clone() {
            subscriber.on_next(item);
        }
        subscriber.on_complete();
        Ok(())
    }
}

/// A single item followed by completion.
#[derive(Debug, Clone)]
pub struct Just<T> {
    item: T,
}

impl<T> Just<T> {
    /// Create a single-item producer.
    #[must_use]
    pub fn new(item: T) -> Self {
        Self { item }
    }
}

impl<T> Publisher<T> for Just<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "just"
    }

    fn subscribe(&self, mut subscriber: BoxSubscriber<T>) -> Result<(), AssemblyError> {
        subscriber.on_next(self.item.clone());
        subscriber.on_complete();
        Ok(())
    }
}

/// Completes immediately.
#[derive(Debug)]
pub struct Empty<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> Empty<T> {
    /// Create an empty producer.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T: 'static> Publisher<T> for Empty<T> {
    fn name(&self) -> &str {
        "empty"
    }

    fn subscribe(&self, mut subscriber: BoxSubscriber<T>) -> Result<(), AssemblyError> {
        subscriber.on_complete();
        Ok(())
    }
}

/// Fails immediately with a fixed error.
#[derive(Debug)]
pub struct Failing<T> {
    error: StreamError,
    _item: PhantomData<fn() -> T>,
}

impl<T> Failing<T> {
    /// Create a failing producer.
    #[must_use]
    pub fn new(error: StreamError) -> Self {
        Self {
            error,
            _item: PhantomData,
        }
    }
}

impl<T: 'static> Publisher<T> for Failing<T> {
    fn name(&self) -> &str {
        "error"
    }

    fn subscribe(&self, mut subscriber: BoxSubscriber<T>) -> Result<(), AssemblyError> {
        subscriber.on_error(self.error.clone());
        Ok(())
    }
}
