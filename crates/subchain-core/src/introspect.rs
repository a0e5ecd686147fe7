//! # Introspection
//!
//! Read-only walks over a chain driven purely by [`crate::Scannable::scan`].
//!
//! Nothing here is used by assembly. These helpers exist for diagnostics,
//! the `inspect` command and tests that need to check chain structure.

use crate::{Attr, Prefetch, RunStyle, ScanValue, Stage, StageRef};
use serde::Serialize;
use std::sync::Arc;

/// Iterator over the upstream stages of a chain, nearest first.
///
/// Follows [`Attr::Parent`] until a stage does not answer it. The starting
/// stage itself is not yielded.
pub struct Parents {
    next: Option<StageRef>,
}

impl Iterator for Parents {
    type Item = StageRef;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = parent_of(current.as_ref());
        Some(current)
    }
}

fn parent_of(stage: &dyn Stage) -> Option<StageRef> {
    match stage.scan(Attr::Parent) {
        Some(ScanValue::Parent(parent)) => Some(parent),
        _ => None,
    }
}

/// Walk upstream from `stage`.
#[must_use]
pub fn parents(stage: &StageRef) -> Parents {
    Parents {
        next: parent_of(stage.as_ref()),
    }
}

/// One stage in a chain, as seen through introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStep {
    /// Distance from the outermost stage (0 = outermost).
    pub position: usize,
    /// Stage name.
    pub name: String,
    /// Reported prefetch; terminal producers report none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<Prefetch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_style: Option<RunStyle>,
    /// Whether this stage has the operator capability.
    pub is_operator: bool,
}

impl ChainStep {
    fn read(position: usize, stage: &StageRef) -> Self {
        let prefetch = match stage.scan(Attr::Prefetch) {
            Some(ScanValue::Prefetch(prefetch)) => Some(prefetch),
            _ => None,
        };
        let run_style = match stage.scan(Attr::RunStyle) {
            Some(ScanValue::RunStyle(style)) => Some(style),
            _ => None,
        };
        let name = match stage.scan(Attr::Name) {
            Some(ScanValue::Name(name)) => name,
            _ => stage.name().to_string(),
        };

        Self {
            position,
            name,
            prefetch,
            run_style,
            is_operator: stage.as_operator().is_some(),
        }
    }
}

/// Every stage of the chain, outermost first, terminal last.
#[must_use]
pub fn steps(stage: &StageRef) -> Vec<ChainStep> {
    std::iter::once(Arc::clone(stage))
        .chain(parents(stage))
        .enumerate()
        .map(|(position, stage)| ChainStep::read(position, &stage))
        .collect()
}

/// One-line rendering such as `map -> filter -> range`.
#[must_use]
pub fn describe(stage: &StageRef) -> String {
    steps(stage)
        .into_iter()
        .map(|step| step.name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flux;

    #[test]
    fn parents_excludes_the_start_and_ends_at_terminal() {
        let head = Flux::range(0, 5).filter(|v| v % 2 == 0).map(|v| v * 2).into_stage();

        let names: Vec<String> = parents(&head).map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["filter", "range"]);
    }

    #[test]
    fn steps_report_metadata() {
        let head = Flux::range(0, 5).take(3).count().into_stage();
        let steps = steps(&head);

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].name, "count");
        assert_eq!(steps[0].prefetch, Some(Prefetch::Unbounded));
        assert_eq!(steps[1].prefetch, Some(Prefetch::Bounded(3)));
        assert!(steps[1].is_operator);
        assert_eq!(steps[2].position, 2);
        assert_eq!(steps[2].prefetch, None);
        assert!(!steps[2].is_operator);
    }

    #[test]
    fn describe_joins_names() {
        let head = Flux::from_iterable(vec![1u8]).hide().into_stage();
        assert_eq!(describe(&head), "hide -> from_iterable");
    }

    #[test]
    fn describe_single_terminal() {
        let head = Flux::range(0, 1).into_stage();
        assert_eq!(describe(&head), "range");
        assert_eq!(parents(&head).count(), 0);
    }

    #[test]
    fn steps_serialize_without_absent_fields() {
        let head = Flux::range(0, 1).into_stage();
        let json = serde_json::to_value(steps(&head)).expect("serialize");
        assert_eq!(json[0]["name"], "range");
        assert!(json[0].get("prefetch").is_none());
    }
}
