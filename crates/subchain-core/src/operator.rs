//! # Operator Heads
//!
//! Typed operators and the stage that hosts them in a chain.
//!
//! An [`Operator`] only knows how to turn a subscriber of its output into a
//! subscriber of its input. [`OperatorHead`] owns the upstream edge, erases
//! types for the flattening loop, and answers introspection queries.
//!
//! ## Structural Variants
//!
//! | Cardinality | Head | Prefetch reported |
//! |-------------|------|-------------------|
//! | `Many` | `Flux` | the operator's hint |
//! | `One` | `Mono` | always `Unbounded` |
//!
//! Both run through [`crate::assemble::subscribe_chain`] identically.

use crate::primitives::SMALL_BUFFER_SIZE;
use crate::stage::{detached, release_chain};
use crate::{
    AnySubscriber, AssemblyError, Attach, Attr, BoxSubscriber, Cardinality, OperatorStage,
    Prefetch, RunStyle, ScanValue, Scannable, Stage, StageRef, assemble,
};
use std::sync::Arc;

// =============================================================================
// OPERATOR TRAIT
// =============================================================================

/// A typed transformation between an upstream of `In` and a downstream of `Out`.
pub trait Operator: Send + Sync + 'static {
    /// Items received from upstream.
    type In: Send + 'static;
    /// Items delivered downstream.
    type Out: Send + 'static;

    /// Operator name for diagnostics.
    fn name(&self) -> &str;

    /// Prefetch hint reported by multi-result heads.
    fn prefetch(&self) -> Prefetch {
        Prefetch::Bounded(SMALL_BUFFER_SIZE)
    }

    /// Whether this operator attaches upstream on the calling thread.
    fn run_style(&self) -> RunStyle {
        RunStyle::Sync
    }

    /// Wrap `actual` into the subscriber to attach to `source`, or attach
    /// `source` out-of-band and return [`Attach::SelfHandled`].
    fn subscribe_or_return(
        &self,
        source: &StageRef,
        actual: BoxSubscriber<Self::Out>,
    ) -> Result<Attach<BoxSubscriber<Self::In>>, AssemblyError>;
}

// =============================================================================
// OPERATOR HEAD
// =============================================================================

/// Stage hosting one [`Operator`] above exactly one upstream stage.
pub struct OperatorHead<Op: Operator> {
    source: StageRef,
    operator: Op,
    cardinality: Cardinality,
}

impl<Op: Operator> OperatorHead<Op> {
    /// Create a head over `source`.
    #[must_use]
    pub fn new(source: StageRef, operator: Op, cardinality: Cardinality) -> Self {
        Self {
            source,
            operator,
            cardinality,
        }
    }

    /// Create a head over an upstream that may be absent.
    ///
    /// Returns `AssemblyError::MissingSource` immediately when `source` is
    /// `None`; the error never reaches attachment time.
    pub fn try_new(
        source: Option<StageRef>,
        operator: Op,
        cardinality: Cardinality,
    ) -> Result<Self, AssemblyError> {
        match source {
            Some(source) => Ok(Self::new(source, operator, cardinality)),
            None => Err(AssemblyError::MissingSource {
                operator: operator.name().to_string(),
            }),
        }
    }

    /// Cardinality advertised downstream.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl<Op: Operator> Scannable for OperatorHead<Op> {
    fn scan(&self, attr: Attr) -> Option<ScanValue> {
        match attr {
            Attr::Parent => Some(ScanValue::Parent(Arc::clone(&self.source))),
            Attr::Prefetch => Some(ScanValue::Prefetch(match self.cardinality {
                Cardinality::Many => self.operator.prefetch(),
                Cardinality::One => Prefetch::Unbounded,
            })),
            Attr::Name => Some(ScanValue::Name(self.operator.name().to_string())),
            Attr::RunStyle => Some(ScanValue::RunStyle(self.operator.run_style())),
        }
    }
}

impl<Op: Operator> Stage for OperatorHead<Op> {
    fn name(&self) -> &str {
        self.operator.name()
    }

    fn as_operator(&self) -> Option<&dyn OperatorStage> {
        Some(self)
    }

    fn attach(&self, subscriber: AnySubscriber) -> Result<(), AssemblyError> {
        assemble::subscribe_chain(self, subscriber).map(|_| ())
    }

    fn unlink(&mut self) -> Option<StageRef> {
        Some(std::mem::replace(&mut self.source, detached()))
    }
}

impl<Op: Operator> OperatorStage for OperatorHead<Op> {
    fn source(&self) -> &StageRef {
        &self.source
    }

    fn attach_or_self(
        &self,
        subscriber: AnySubscriber,
    ) -> Result<Attach<AnySubscriber>, AssemblyError> {
        let actual = subscriber.downcast::<Op::Out>(self.operator.name())?;
        let attach = self.operator.subscribe_or_return(&self.source, actual)?;
        Ok(attach.map(AnySubscriber::new))
    }
}

impl<Op: Operator> Drop for OperatorHead<Op> {
    fn drop(&mut self) {
        release_chain(Stage::unlink(self));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Hide;
    use crate::{Flux, Recorder};

    fn upstream() -> StageRef {
        Flux::from_iterable(vec![1u32, 2, 3]).into_stage()
    }

    #[test]
    fn try_new_without_source_fails_immediately() {
        let result = OperatorHead::try_new(None, Hide::<u32>::new(), Cardinality::Many);
        match result {
            Err(AssemblyError::MissingSource { operator }) => assert_eq!(operator, "hide"),
            _ => unreachable!("expected MissingSource"),
        }
    }

    #[test]
    fn parent_is_constructor_source() {
        let source = upstream();
        let head = OperatorHead::new(Arc::clone(&source), Hide::<u32>::new(), Cardinality::Many);

        match head.scan(Attr::Parent) {
            Some(ScanValue::Parent(parent)) => assert!(Arc::ptr_eq(&parent, &source)),
            other => unreachable!("unexpected parent scan: {:?}", other),
        }
        assert!(Arc::ptr_eq(head.source(), &source));
    }

    #[test]
    fn prefetch_depends_on_cardinality() {
        let many = OperatorHead::new(upstream(), Hide::<u32>::new(), Cardinality::Many);
        let one = OperatorHead::new(upstream(), Hide::<u32>::new(), Cardinality::One);

        assert!(matches!(
            many.scan(Attr::Prefetch),
            Some(ScanValue::Prefetch(Prefetch::Bounded(SMALL_BUFFER_SIZE)))
        ));
        assert!(matches!(
            one.scan(Attr::Prefetch),
            Some(ScanValue::Prefetch(Prefetch::Unbounded))
        ));
        assert_eq!(one.cardinality(), Cardinality::One);
    }

    #[test]
    fn attach_on_head_runs_the_chain() {
        let head = OperatorHead::new(upstream(), Hide::<u32>::new(), Cardinality::Many);
        let (recorder, handle) = Recorder::<u32>::new();

        head.attach(AnySubscriber::new::<u32>(Box::new(recorder)))
            .expect("attach");

        assert_eq!(handle.items(), vec![1, 2, 3]);
    }

    #[test]
    fn unlink_swaps_in_detached_placeholder() {
        let source = upstream();
        let mut head = OperatorHead::new(Arc::clone(&source), Hide::<u32>::new(), Cardinality::Many);

        let released = Stage::unlink(&mut head).expect("unlinked");
        assert!(Arc::ptr_eq(&released, &source));
        assert_eq!(head.source().name(), "detached");
    }
}
