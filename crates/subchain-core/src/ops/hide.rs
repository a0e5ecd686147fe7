//! `hide`: an identity operator.
//!
//! Hands the downstream subscriber to its source unchanged. Useful to hide the
//! identity of the upstream stage, and as the cheapest possible hop when
//! building very deep chains.

use crate::{AssemblyError, Attach, BoxSubscriber, Operator, StageRef};
use std::marker::PhantomData;

/// Pass-through operator.
pub struct Hide<T> {
    _item: PhantomData<fn(T) -> T>,
}

impl<T> Hide<T> {
    /// Create a pass-through operator.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T: Send + 'static> Operator for Hide<T> {
    type In = T;
    type Out = T;

    fn name(&self) -> &str {
        "hide"
    }

    fn subscribe_or_return(
        &self,
        _source: &StageRef,
        actual: BoxSubscriber<T>,
    ) -> Result<Attach<BoxSubscriber<T>>, AssemblyError> {
        Ok(Attach::Continue(actual))
    }
}
