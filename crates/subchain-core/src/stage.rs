//! # Stage Capabilities
//!
//! The capability traits the flattening loop dispatches on.
//!
//! | Trait | Meaning |
//! |-------|---------|
//! | [`Scannable`] | Answers introspection queries (diagnostics only) |
//! | [`Stage`] | Can be attached to by a subscriber |
//! | [`OperatorStage`] | A stage with one upstream that intercepts attachment |
//!
//! A stage advertises the operator capability through [`Stage::as_operator`].
//! That call is the per-iteration type test of the flattening loop.

use crate::primitives::DETACHED_STAGE_NAME;
use crate::{AnySubscriber, AssemblyError, Attr, Prefetch, RunStyle};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared handle to a stage.
pub type StageRef = Arc<dyn Stage>;

// =============================================================================
// INTROSPECTION
// =============================================================================

/// Value returned by [`Scannable::scan`].
#[derive(Clone)]
pub enum ScanValue {
    /// Answer to [`Attr::Parent`].
    Parent(StageRef),
    /// Answer to [`Attr::Prefetch`].
    Prefetch(Prefetch),
    /// Answer to [`Attr::Name`].
    Name(String),
    /// Answer to [`Attr::RunStyle`].
    RunStyle(RunStyle),
}

impl fmt::Debug for ScanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanValue::Parent(stage) => f.debug_tuple("Parent").field(&stage.name()).finish(),
            ScanValue::Prefetch(prefetch) => f.debug_tuple("Prefetch").field(prefetch).finish(),
            ScanValue::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ScanValue::RunStyle(style) => f.debug_tuple("RunStyle").field(style).finish(),
        }
    }
}

/// Key/value metadata query for external tooling.
///
/// Must be free of side effects and safe to call concurrently with attachment.
/// `None` means the key is unknown to this stage.
pub trait Scannable {
    /// Look up one attribute.
    fn scan(&self, attr: Attr) -> Option<ScanValue>;
}

// =============================================================================
// STAGE
// =============================================================================

/// A node in a pipeline that a subscriber can attach to.
pub trait Stage: Scannable + Send + Sync + 'static {
    /// Name used in diagnostics and errors.
    fn name(&self) -> &str;

    /// The operator capability, if this stage has one.
    fn as_operator(&self) -> Option<&dyn OperatorStage> {
        None
    }

    /// Attach a subscriber to this stage.
    ///
    /// This is the single terminal attach contract. Operator stages implement
    /// it by running the flattening loop from themselves.
    fn attach(&self, subscriber: AnySubscriber) -> Result<(), AssemblyError>;

    /// Detach and return the upstream edge so a chain can be released
    /// iteratively. Only called with exclusive access during teardown.
    fn unlink(&mut self) -> Option<StageRef> {
        None
    }
}

// =============================================================================
// OPERATOR CAPABILITY
// =============================================================================

/// Outcome of [`OperatorStage::attach_or_self`].
#[derive(Debug)]
pub enum Attach<S> {
    /// Attach this subscriber to the operator's source in its place.
    Continue(S),
    /// The operator attaches itself; stop walking upstream.
    SelfHandled,
}

impl<S> Attach<S> {
    /// Transform the continued subscriber.
    pub fn map<U>(self, f: impl FnOnce(S) -> U) -> Attach<U> {
        match self {
            Attach::Continue(subscriber) => Attach::Continue(f(subscriber)),
            Attach::SelfHandled => Attach::SelfHandled,
        }
    }

    /// Check if the operator took over its own attachment.
    #[must_use]
    pub fn is_self_handled(&self) -> bool {
        matches!(self, Attach::SelfHandled)
    }
}

/// A stage wrapping exactly one upstream stage.
pub trait OperatorStage: Stage {
    /// The upstream stage. Fixed at construction.
    fn source(&self) -> &StageRef;

    /// Rewrite `subscriber` into the subscriber that should be attached to
    /// [`OperatorStage::source`], or take over attachment entirely.
    fn attach_or_self(
        &self,
        subscriber: AnySubscriber,
    ) -> Result<Attach<AnySubscriber>, AssemblyError>;
}

// =============================================================================
// TEARDOWN
// =============================================================================

/// Placeholder upstream for operators that have been unlinked during drop.
struct DetachedStage;

impl Scannable for DetachedStage {
    fn scan(&self, attr: Attr) -> Option<ScanValue> {
        match attr {
            Attr::Name => Some(ScanValue::Name(DETACHED_STAGE_NAME.to_string())),
            _ => None,
        }
    }
}

impl Stage for DetachedStage {
    fn name(&self) -> &str {
        DETACHED_STAGE_NAME
    }

    fn attach(&self, _subscriber: AnySubscriber) -> Result<(), AssemblyError> {
        Err(AssemblyError::Rejected {
            stage: DETACHED_STAGE_NAME.to_string(),
            reason: "stage was torn down".to_string(),
        })
    }
}

/// Shared placeholder swapped in for an operator's source during teardown.
pub(crate) fn detached() -> StageRef {
    static DETACHED: OnceLock<StageRef> = OnceLock::new();
    Arc::clone(DETACHED.get_or_init(|| Arc::new(DetachedStage)))
}

/// Release a chain of stages front to back without nested drops.
///
/// Each uniquely owned stage is unlinked before it is dropped, so dropping it
/// never reaches further upstream. A stage that is still shared elsewhere ends
/// the walk; its last owner releases the rest.
pub(crate) fn release_chain(mut next: Option<StageRef>) {
    while let Some(mut stage) = next {
        next = Arc::get_mut(&mut stage).and_then(|stage| stage.unlink());
    }
}

// =============================================================================
// TESTS
// =============================================================================
