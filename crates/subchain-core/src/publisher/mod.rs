//! # Publishers
//!
//! Terminal producers: the non-operator stage at the bottom of every chain.
//!
//! A [`Publisher`] is typed; [`SourceStage`] erases it into a [`Stage`] whose
//! `attach` recovers the typed subscriber and hands it over. That is the
//! single terminal attach path used by the flattening loop.

mod sources;

pub use sources::{Empty, Failing, FromIterable, Just, Range};

use crate::{
    AnySubscriber, AssemblyError, Attr, BoxSubscriber, RunStyle, ScanValue, Scannable, Stage,
};
use std::marker::PhantomData;

// =============================================================================
// PUBLISHER TRAIT
// =============================================================================

/// A typed producer that delivers signals to a subscriber.
pub trait Publisher<T>: Send + Sync + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Start delivering signals to `subscriber`.
    ///
    /// Returns an error only if the subscriber is refused outright; stream
    /// failures go through `on_error`.
    fn subscribe(&self, subscriber: BoxSubscriber<T>) -> Result<(), AssemblyError>;
}

// =============================================================================
// SOURCE STAGE
// =============================================================================

/// A [`Publisher`] hosted as a terminal [`Stage`].
pub struct SourceStage<P, T> {
    publisher: P,
    _item: PhantomData<fn() -> T>,
}

impl<P, T> SourceStage<P, T>
where
    P: Publisher<T>,
    T: Send + 'static,
{
    /// Wrap a publisher.
    #[must_use]
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            _item: PhantomData,
        }
    }

    /// The wrapped publisher.
    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<P, T> Scannable for SourceStage<P, T>
where
    P: Publisher<T>,
    T: Send + 'static,
{
    fn scan(&self, attr: Attr) -> Option<ScanValue> {
        match attr {
            Attr::Name => Some(ScanValue::Name(self.publisher.name().to_string())),
            Attr::RunStyle => Some(ScanValue::RunStyle(RunStyle::Sync)),
            Attr::Parent | Attr::Prefetch => None,
        }
    }
}

impl<P, T> Stage for SourceStage<P, T>
where
    P: Publisher<T>,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        self.publisher.name()
    }

    fn attach(&self, subscriber: AnySubscriber) -> Result<(), AssemblyError> {
        let subscriber = subscriber.downcast::<T>(self.publisher.name())?;
        self.publisher.subscribe(subscriber)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Recorder, Termination};

    #[test]
    fn source_stage_is_terminal() {
        let stage = SourceStage::new(Range::new(0, 3));
        assert!(stage.as_operator().is_none());
        assert!(stage.scan(Attr::Parent).is_none());
        assert!(stage.scan(Attr::Prefetch).is_none());
        assert!(matches!(stage.scan(Attr::Name), Some(ScanValue::Name(n)) if n == "range"));
    }

    #[test]
    fn source_stage_delivers_to_erased_subscriber() {
        let stage = SourceStage::new(Range::new(5, 2));
        let (recorder, handle) = Recorder::<i64>::new();

        stage
            .attach(AnySubscriber::new::<i64>(Box::new(recorder)))
            .expect("attach");

        assert_eq!(handle.items(), vec![5, 6]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
        assert_eq!(stage.publisher().name(), "range");
    }
}
