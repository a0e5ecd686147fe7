//! # subchain-core
//!
//! Subscription-time assembly for push-based reactive pipelines - THE ASSEMBLY.
//!
//! A pipeline is a linear chain of stages: zero or more operators wrapping a
//! single terminal producer. Subscribing to the outermost stage has to attach
//! an equivalent subscriber through every operator down to the producer. The
//! naive shape (each operator subscribes its source) burns one stack frame per
//! operator; this crate walks the chain in a loop instead.
//!
//! ## Capability Model
//!
//! - [`Stage`]: anything that can be attached to. Always [`Scannable`].
//! - [`OperatorStage`]: a stage with exactly one upstream that may rewrite the
//!   subscriber ([`Attach::Continue`]) or take over its own attachment
//!   ([`Attach::SelfHandled`]).
//! - [`assemble::subscribe_chain`]: the flattening loop.
//!
//! ## Architectural Constraints
//!
//! - No recursion proportional to chain depth on attach, on drop, or when a
//!   terminal signal crosses adapters
//! - Chains are immutable after construction and safe to share across threads
//! - Introspection never drives control flow

// =============================================================================
// MODULES
// =============================================================================

pub mod assemble;
pub mod flux;
pub mod introspect;
pub mod operator;
pub mod ops;
pub mod plan;
pub mod primitives;
pub mod publisher;
pub mod scheduler;
pub mod stage;
pub mod subscriber;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AssemblyError, Attr, Cardinality, Prefetch, RunStyle, StreamError};

// =============================================================================
// RE-EXPORTS: Capabilities & Assembly
// =============================================================================

pub use assemble::{Assembly, attach, subscribe_chain};
pub use operator::{Operator, OperatorHead};
pub use stage::{Attach, OperatorStage, ScanValue, Scannable, Stage, StageRef};
pub use subscriber::{
    AnySubscriber, BoxSubscriber, Detached, Downstream, RecordHandle, Recorder, Subscriber,
    Termination,
};

// =============================================================================
// RE-EXPORTS: Pipeline Heads & Producers
// =============================================================================

pub use flux::{Flux, Mono};
pub use publisher::{Publisher, SourceStage};
pub use scheduler::{Immediate, Scheduler, ThreadScheduler};

// =============================================================================
// RE-EXPORTS: Introspection & Plans
// =============================================================================

pub use introspect::{ChainStep, describe, parents, steps};
pub use plan::{OperatorEntry, OperatorSpec, PipelinePlan, PlannedPipeline, SourceSpec};
