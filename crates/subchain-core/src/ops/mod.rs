//! # Operators
//!
//! The built-in [`crate::Operator`] implementations.
//!
//! | Operator | Attach outcome | Subscriber wrapping |
//! |----------|----------------|---------------------|
//! | `map`, `filter`, `take(n>0)`, `do_on_next`, `log` | `Continue` | one adapter |
//! | `hide` | `Continue` | none (pass-through) |
//! | `take(0)` | `SelfHandled` | completes immediately |
//! | `subscribe_on` | `SelfHandled` | attaches upstream on a scheduler |
//! | `count`, `collect_list`, `reduce` | `Continue` | accumulating adapter |
//!
//! Data-flow semantics are deliberately minimal: no demand, no cancellation.

mod filter;
mod hide;
mod map;
mod peek;
mod reduce;
mod subscribe_on;
mod take;

pub use filter::Filter;
pub use hide::Hide;
pub use map::Map;
pub use peek::{DoOnNext, Log};
pub use reduce::{CollectList, Count, Reduce};
pub use subscribe_on::SubscribeOn;
pub use take::Take;
