//! # Chain Flattening
//!
//! Attach a subscriber through a chain of operators with one loop iteration
//! per operator and constant stack usage.
//!
//! ```text
//!   subscribe(X) on A
//!
//!   A.attach_or_self(X)  = X1 ─┐
//!   B.attach_or_self(X1) = X2  │  loop, two live variables
//!   C.attach_or_self(X2) = X3 ─┘
//!   D.attach(X3)                  single terminal attach
//! ```
//!
//! The only state carried between iterations is the current operator and the
//! current subscriber. Concurrent attachments to the same chain share nothing
//! mutable and need no locking.

use crate::{AnySubscriber, AssemblyError, Attach, OperatorStage, Stage};

/// What happened during one assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// The terminal stage accepted the rewritten subscriber after passing
    /// through `hops` operators.
    Attached { hops: usize },
    /// The operator at `position` (0 = outermost) took over its own
    /// attachment. Nothing upstream of it was touched.
    SelfHandled { position: usize },
}

impl Assembly {
    /// Number of `attach_or_self` calls made during the pass.
    #[must_use]
    pub fn operator_calls(self) -> usize {
        match self {
            Assembly::Attached { hops } => hops,
            Assembly::SelfHandled { position } => position + 1,
        }
    }

    /// Check if the pass ended in a terminal attach.
    #[must_use]
    pub fn reached_terminal(self) -> bool {
        matches!(self, Assembly::Attached { .. })
    }
}

/// Flatten a chain starting at `entry` and attach `subscriber` to its terminal.
///
/// # Contract
///
/// `entry` must carry the operator capability; the parameter type enforces it.
/// Use [`attach`] when the outermost stage may be a plain producer.
///
/// # Errors
///
/// Any error from an operator's `attach_or_self` or from the terminal attach
/// is returned as-is. Later stages are not visited.
pub fn subscribe_chain(
    entry: &dyn OperatorStage,
    subscriber: AnySubscriber,
) -> Result<Assembly, AssemblyError> {
    let mut operator = entry;
    let mut subscriber = subscriber;
    let mut hops = 0usize;

    let terminal = loop {
        match operator.attach_or_self(subscriber)? {
            Attach::Continue(next) => subscriber = next,
            Attach::SelfHandled => {
                tracing::debug!(
                    stage = operator.name(),
                    position = hops,
                    "operator attaches itself"
                );
                return Ok(Assembly::SelfHandled { position: hops });
            }
        }
        hops += 1;

        let source: &dyn Stage = operator.source().as_ref();
        match source.as_operator() {
            Some(next) => operator = next,
            None => break source,
        }
    };

    tracing::trace!(terminal = terminal.name(), hops, "attaching flattened chain");
    terminal.attach(subscriber)?;
    Ok(Assembly::Attached { hops })
}

/// Attach `subscriber` to any stage.
///
/// Operators go through [`subscribe_chain`]; a plain producer is attached
/// directly with zero hops.
pub fn attach(stage: &dyn Stage, subscriber: AnySubscriber) -> Result<Assembly, AssemblyError> {
    match stage.as_operator() {
        Some(operator) => subscribe_chain(operator, subscriber),
        None => {
            stage.attach(subscriber)?;
            Ok(Assembly::Attached { hops: 0 })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Flux, Recorder, Termination};

    #[test]
    fn plain_producer_attaches_with_zero_hops() {
        let flux = Flux::from_iterable(vec![1u8, 2, 3]);
        let (recorder, handle) = Recorder::<u8>::new();

        let assembly = attach(flux.stage().as_ref(), AnySubscriber::new::<u8>(Box::new(recorder)))
            .expect("attach");

        assert_eq!(assembly, Assembly::Attached { hops: 0 });
        assert_eq!(handle.items(), vec![1, 2, 3]);
    }

    #[test]
    fn one_hop_chain_reaches_terminal() {
        let flux = Flux::from_iterable(vec![1u8, 2]).map(|v| v * 10);
        let (recorder, handle) = Recorder::<u8>::new();

        let assembly = flux.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::Attached { hops: 1 });
        assert_eq!(assembly.operator_calls(), 1);
        assert_eq!(handle.items(), vec![10, 20]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn operator_calls_counts_self_handled_stage() {
        let assembly = Assembly::SelfHandled { position: 2 };
        assert_eq!(assembly.operator_calls(), 3);
        assert!(!assembly.reached_terminal());
    }

    #[test]
    fn wrong_item_type_fails_at_first_stage() {
        let flux = Flux::from_iterable(vec![1u8]).map(|v| v + 1);
        let (recorder, handle) = Recorder::<String>::new();

        let result = attach(
            flux.stage().as_ref(),
            AnySubscriber::new::<String>(Box::new(recorder)),
        );

        assert!(matches!(
            result,
            Err(AssemblyError::SubscriberMismatch { .. })
        ));
        assert!(handle.termination().is_none());
    }
}
