//! # Assembly Primitives
//!
//! Fixed constants for the subchain core.
//!
//! These values are compiled in and immutable at runtime. They only feed
//! introspection hints and plan validation; the flattening loop itself has
//! no tunables.

/// Default prefetch advertised by multi-result operators.
///
/// Matches the small buffer size commonly used by reactive libraries for
/// inter-stage queues. Introspection only.
pub const SMALL_BUFFER_SIZE: u32 = 256;

/// Maximum number of operators a single plan may generate (after `repeat`).
///
/// Assembly is O(1) in stack, but every operator still costs one allocation
/// per hop; plans beyond this are rejected up front.
pub const MAX_PLAN_DEPTH: usize = 1_000_000;

/// Maximum number of operators in a plan that wrap the subscriber.
///
/// Items are pushed through every adapter in turn, one call frame each, so
/// this bounds delivery stack depth. Pass-through operators (`hide`,
/// `subscribe_on`) only count against [`MAX_PLAN_DEPTH`].
pub const MAX_PLAN_ADAPTERS: usize = 1_024;

/// Maximum number of literal values in a `values` source.
pub const MAX_PLAN_VALUES: usize = 100_000;

/// Maximum `count` of a `range` source.
pub const MAX_PLAN_RANGE: u64 = 10_000_000;

/// Name reported by the placeholder a torn-down operator points at.
pub const DETACHED_STAGE_NAME: &str = "detached";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer_size_is_power_of_two() {
        assert!(SMALL_BUFFER_SIZE.is_power_of_two());
    }

    #[test]
    fn plan_limits_are_ordered() {
        assert!(MAX_PLAN_VALUES <= MAX_PLAN_DEPTH);
        assert!(MAX_PLAN_ADAPTERS <= MAX_PLAN_DEPTH);
        assert!(MAX_PLAN_VALUES as u64 <= MAX_PLAN_RANGE);
    }
}
