//! # Core Type Definitions
//!
//! This module contains the plain value types shared by every other module:
//! - Introspection keys and hints (`Attr`, `Prefetch`, `RunStyle`)
//! - Pipeline head cardinality (`Cardinality`)
//! - Error types (`AssemblyError`, `StreamError`)
//!
//! Nothing here knows about stages or subscribers; the capability traits live
//! in [`crate::stage`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// INTROSPECTION KEYS
// =============================================================================

/// Well-known keys accepted by [`crate::Scannable::scan`].
///
/// A stage answers `None` for any key it does not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attr {
    /// The immediate upstream stage.
    Parent,
    /// How many items downstream may request in advance.
    Prefetch,
    /// Human-readable operator or source name.
    Name,
    /// Whether attachment happens on the calling thread.
    RunStyle,
}

impl Attr {
    /// All keys, in a stable order. Useful for dumping every known attribute.
    pub const ALL: [Attr; 4] = [Attr::Parent, Attr::Prefetch, Attr::Name, Attr::RunStyle];
}

/// Prefetch hint exposed through [`Attr::Prefetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prefetch {
    /// At most this many items are requested ahead.
    Bounded(u32),
    /// No bound, or not applicable (single-result heads).
    Unbounded,
}

impl Prefetch {
    /// Check if this hint is unbounded.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        matches!(self, Prefetch::Unbounded)
    }
}

impl fmt::Display for Prefetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefetch::Bounded(n) => write!(f, "{}", n),
            Prefetch::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Execution style reported through [`Attr::RunStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStyle {
    /// Attaches and emits on the subscribing thread.
    Sync,
    /// Hands attachment to another execution context.
    Async,
}

impl fmt::Display for RunStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStyle::Sync => f.write_str("sync"),
            RunStyle::Async => f.write_str("async"),
        }
    }
}

// =============================================================================
// CARDINALITY
// =============================================================================

/// How many items a pipeline head may emit.
///
/// Both variants assemble identically; they differ only in the contract they
/// advertise downstream and in the default prefetch hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one item (`Mono`).
    One,
    /// Zero or more items (`Flux`).
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => f.write_str("mono"),
            Cardinality::Many => f.write_str("flux"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while building or attaching a chain.
///
/// - Configuration errors surface at construction, never during attachment
/// - Attachment errors abort the whole assembly; there is nothing to roll back
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// An operator was constructed without an upstream stage.
    #[error("Operator '{operator}' has no upstream stage")]
    MissingSource { operator: String },

    /// A type-erased subscriber reached a stage expecting another item type.
    #[error("Stage '{stage}' expected a subscriber of {expected}, got {found}")]
    SubscriberMismatch {
        stage: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A stage refused the subscriber.
    #[error("Stage '{stage}' rejected subscriber: {reason}")]
    Rejected { stage: String, reason: String },

    /// A scheduler could not accept deferred work.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// A pipeline plan failed validation.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

/// Failure delivered through [`crate::Subscriber::on_error`] after attachment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StreamError {
    message: String,
}

impl StreamError {
    /// Create a new stream error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefetch_display() {
        assert_eq!(Prefetch::Bounded(32).to_string(), "32");
        assert_eq!(Prefetch::Unbounded.to_string(), "unbounded");
        assert!(Prefetch::Unbounded.is_unbounded());
        assert!(!Prefetch::Bounded(1).is_unbounded());
    }

    #[test]
    fn cardinality_display() {
        assert_eq!(Cardinality::One.to_string(), "mono");
        assert_eq!(Cardinality::Many.to_string(), "flux");
    }

    #[test]
    fn missing_source_message_names_operator() {
        let err = AssemblyError::MissingSource {
            operator: "map".to_string(),
        };
        assert_eq!(err.to_string(), "Operator 'map' has no upstream stage");
    }

    #[test]
    fn stream_error_roundtrips_message() {
        let err = StreamError::new("boom");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn attr_all_is_sorted() {
        let mut sorted = Attr::ALL;
        sorted.sort();
        assert_eq!(sorted, Attr::ALL);
    }
}
