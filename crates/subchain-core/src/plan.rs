//! # Pipeline Plans
//!
//! Declarative description of an `i64` pipeline, loaded from configuration
//! and assembled into a stage chain.
//!
//! ```toml
//! name = "doubled evens"
//!
//! [source]
//! kind = "range"
//! start = 0
//! count = 10
//!
//! [[operators]]
//! kind = "keep_even"
//!
//! [[operators]]
//! kind = "multiply"
//! value = 2
//!
//! [[operators]]
//! kind = "hide"
//! repeat = 1000
//! ```
//!
//! Arithmetic saturates at the `i64` bounds. `count` and `sum` turn the rest
//! of the plan into single-result heads.

use crate::ops::{Count, Filter, Hide, Log, Map, Reduce, SubscribeOn, Take};
use crate::primitives::{MAX_PLAN_ADAPTERS, MAX_PLAN_DEPTH, MAX_PLAN_RANGE, MAX_PLAN_VALUES};
use crate::publisher::{Empty, Failing, FromIterable, Just, Range};
use crate::{
    AnySubscriber, Assembly, AssemblyError, Cardinality, Operator, OperatorHead, Publisher,
    Scheduler, SourceStage, StageRef, StreamError, Subscriber, assemble,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// PLAN TYPES
// =============================================================================

/// The terminal producer of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Range { start: i64, count: u64 },
    Just { value: i64 },
    Values { values: Vec<i64> },
    Empty,
    Error { message: String },
}

impl SourceSpec {
    fn stage(&self) -> StageRef {
        match self {
            SourceSpec::Range { start, count } => hosted(Range::new(*start, *count)),
            SourceSpec::Just { value } => hosted(Just::new(*value)),
            SourceSpec::Values { values } => hosted(FromIterable::new(values.clone())),
            SourceSpec::Empty => hosted(Empty::<i64>::new()),
            SourceSpec::Error { message } => {
                hosted(Failing::<i64>::new(StreamError::new(message.clone())))
            }
        }
    }
}

fn hosted<P: Publisher<i64>>(publisher: P) -> StageRef {
    Arc::new(SourceStage::new(publisher))
}

/// One operator of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorSpec {
    Add {
        value: i64,
    },
    Multiply {
        value: i64,
    },
    Negate,
    KeepEven,
    KeepOdd,
    KeepAbove {
        value: i64,
    },
    Take {
        count: u64,
    },
    Hide,
    Log {
        #[serde(default = "default_log_category")]
        category: String,
    },
    SubscribeOn,
    Count,
    /// Saturating sum; completes without an item on an empty upstream.
    Sum,
}

impl OperatorSpec {
    /// Whether the operator installs an adapter around the subscriber.
    fn wraps(&self) -> bool {
        !matches!(self, OperatorSpec::Hide | OperatorSpec::SubscribeOn)
    }
}

fn default_log_category() -> String {
    "plan".to_string()
}

/// An operator plus how many times to stack it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorEntry {
    #[serde(flatten)]
    pub op: OperatorSpec,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

impl OperatorEntry {
    /// A single occurrence of `op`.
    #[must_use]
    pub fn once(op: OperatorSpec) -> Self {
        Self { op, repeat: 1 }
    }
}

/// A whole pipeline: source, then operators applied in order (innermost first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<SourceSpec>,
    #[serde(default)]
    pub operators: Vec<OperatorEntry>,
}

// =============================================================================
// VALIDATION & BUILD
// =============================================================================

impl PipelinePlan {
    /// Check plan limits and return the number of operators it will generate.
    pub fn validate(&self) -> Result<usize, AssemblyError> {
        if self.source.is_none() && self.operators.is_empty() {
            return Err(AssemblyError::InvalidPlan(
                "plan has neither a source nor operators".to_string(),
            ));
        }

        match &self.source {
            Some(SourceSpec::Values { values }) if values.len() > MAX_PLAN_VALUES => {
                return Err(AssemblyError::InvalidPlan(format!(
                    "values source has {} entries (max {})",
                    values.len(),
                    MAX_PLAN_VALUES
                )));
            }
            Some(SourceSpec::Range { count, .. }) if *count > MAX_PLAN_RANGE => {
                return Err(AssemblyError::InvalidPlan(format!(
                    "range source has count {} (max {})",
                    count, MAX_PLAN_RANGE
                )));
            }
            _ => {}
        }

        let mut depth = 0usize;
        let mut adapters = 0usize;
        for (index, entry) in self.operators.iter().enumerate() {
            if entry.repeat == 0 {
                return Err(AssemblyError::InvalidPlan(format!(
                    "operator #{} has repeat = 0",
                    index
                )));
            }
            depth = depth.saturating_add(entry.repeat);
            if depth > MAX_PLAN_DEPTH {
                return Err(AssemblyError::InvalidPlan(format!(
                    "plan generates more than {} operators",
                    MAX_PLAN_DEPTH
                )));
            }
            if entry.op.wraps() {
                adapters = adapters.saturating_add(entry.repeat);
                if adapters > MAX_PLAN_ADAPTERS {
                    return Err(AssemblyError::InvalidPlan(format!(
                        "plan generates more than {} wrapping operators",
                        MAX_PLAN_ADAPTERS
                    )));
                }
            }
        }
        Ok(depth)
    }

    /// Assemble the plan into a chain.
    ///
    /// `scheduler` backs every `subscribe_on` entry. Fails with
    /// `AssemblyError::MissingSource` when operators are listed without a
    /// source.
    pub fn build(&self, scheduler: Arc<dyn Scheduler>) -> Result<PlannedPipeline, AssemblyError> {
        let depth = self.validate()?;

        let mut upstream = self.source.as_ref().map(SourceSpec::stage);
        let mut cardinality = Cardinality::Many;

        for entry in &self.operators {
            if matches!(entry.op, OperatorSpec::Count | OperatorSpec::Sum) {
                cardinality = Cardinality::One;
            }
            for _ in 0..entry.repeat {
                let stage = lift(upstream.take(), &entry.op, cardinality, &scheduler)?;
                upstream = Some(stage);
            }
        }

        let head = upstream.ok_or_else(|| {
            AssemblyError::InvalidPlan("plan produced no stages".to_string())
        })?;

        tracing::debug!(depth, %cardinality, "plan assembled");

        Ok(PlannedPipeline {
            name: self.name.clone().unwrap_or_else(|| "unnamed".to_string()),
            head,
            cardinality,
            depth,
        })
    }
}

fn lift(
    upstream: Option<StageRef>,
    op: &OperatorSpec,
    cardinality: Cardinality,
    scheduler: &Arc<dyn Scheduler>,
) -> Result<StageRef, AssemblyError> {
    match op {
        OperatorSpec::Add { value } => {
            let value = *value;
            head(upstream, Map::new(move |v: i64| v.saturating_add(value)), cardinality)
        }
        OperatorSpec::Multiply { value } => {
            let value = *value;
            head(upstream, Map::new(move |v: i64| v.saturating_mul(value)), cardinality)
        }
        OperatorSpec::Negate => head(upstream, Map::new(|v: i64| v.saturating_neg()), cardinality),
        OperatorSpec::KeepEven => head(upstream, Filter::new(|v: &i64| v % 2 == 0), cardinality),
        OperatorSpec::KeepOdd => head(upstream, Filter::new(|v: &i64| v % 2 != 0), cardinality),
        OperatorSpec::KeepAbove { value } => {
            let value = *value;
            head(upstream, Filter::new(move |v: &i64| *v > value), cardinality)
        }
        OperatorSpec::Take { count } => head(upstream, Take::<i64>::new(*count), cardinality),
        OperatorSpec::Hide => head(upstream, Hide::<i64>::new(), cardinality),
        OperatorSpec::Log { category } => {
            head(upstream, Log::<i64>::new(category.clone()), cardinality)
        }
        OperatorSpec::SubscribeOn => head(
            upstream,
            SubscribeOn::<i64>::new(Arc::clone(scheduler)),
            cardinality,
        ),
        OperatorSpec::Count => head(upstream, Count::<i64>::new(), cardinality),
        OperatorSpec::Sum => head(
            upstream,
            Reduce::new(|a: i64, b: i64| a.saturating_add(b)),
            cardinality,
        ),
    }
}

fn head<Op: Operator>(
    upstream: Option<StageRef>,
    operator: Op,
    cardinality: Cardinality,
) -> Result<StageRef, AssemblyError> {
    Ok(Arc::new(OperatorHead::try_new(upstream, operator, cardinality)?))
}

// =============================================================================
// PLANNED PIPELINE
// =============================================================================

/// A built plan, ready for any number of subscribers.
pub struct PlannedPipeline {
    name: String,
    head: StageRef,
    cardinality: Cardinality,
    depth: usize,
}

impl PlannedPipeline {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Outermost stage.
    #[must_use]
    pub fn head(&self) -> &StageRef {
        &self.head
    }

    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Number of operator stages above the source.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Attach `subscriber` to the pipeline.
    pub fn subscribe<S>(&self, subscriber: S) -> Result<Assembly, AssemblyError>
    where
        S: Subscriber<i64> + 'static,
    {
        assemble::attach(self.head.as_ref(), AnySubscriber::new::<i64>(Box::new(subscriber)))
    }
}

impl std::fmt::Debug for PlannedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedPipeline")
            .field("name", &self.name)
            .field("head", &self.head.name())
            .field("cardinality", &self.cardinality)
            .field("depth", &self.depth)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Immediate, Recorder, Termination, describe};

    fn immediate() -> Arc<dyn Scheduler> {
        Arc::new(Immediate)
    }

    fn plan(source: Option<SourceSpec>, ops: Vec<OperatorSpec>) -> PipelinePlan {
        PipelinePlan {
            name: Some("test".to_string()),
            source,
            operators: ops.into_iter().map(OperatorEntry::once).collect(),
        }
    }

    #[test]
    fn arithmetic_plan_runs() {
        let planned = plan(
            Some(SourceSpec::Range { start: 0, count: 6 }),
            vec![
                OperatorSpec::KeepEven,
                OperatorSpec::Multiply { value: 10 },
                OperatorSpec::Add { value: 1 },
            ],
        )
        .build(immediate())
        .expect("build");

        let (recorder, handle) = Recorder::<i64>::new();
        let assembly = planned.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::Attached { hops: 3 });
        assert_eq!(handle.items(), vec![1, 21, 41]);
        assert_eq!(describe(planned.head()), "map -> map -> filter -> range");
    }

    #[test]
    fn operators_without_source_fail_at_build() {
        let result = plan(None, vec![OperatorSpec::Hide]).build(immediate());
        match result {
            Err(AssemblyError::MissingSource { operator }) => assert_eq!(operator, "hide"),
            other => unreachable!("expected MissingSource, got {:?}", other),
        }
    }

    #[test]
    fn empty_plan_is_invalid() {
        assert!(matches!(
            PipelinePlan::default().validate(),
            Err(AssemblyError::InvalidPlan(_))
        ));
    }

    #[test]
    fn zero_repeat_is_invalid() {
        let mut p = plan(Some(SourceSpec::Empty), vec![OperatorSpec::Hide]);
        p.operators[0].repeat = 0;
        assert!(matches!(p.validate(), Err(AssemblyError::InvalidPlan(_))));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut p = plan(Some(SourceSpec::Empty), vec![OperatorSpec::Hide]);
        p.operators[0].repeat = MAX_PLAN_DEPTH + 1;
        assert!(matches!(p.validate(), Err(AssemblyError::InvalidPlan(_))));
    }

    #[test]
    fn wrapping_operators_have_their_own_limit() {
        let mut p = plan(
            Some(SourceSpec::Range { start: 0, count: 1 }),
            vec![OperatorSpec::Add { value: 1 }],
        );
        p.operators[0].repeat = 100_000;
        assert!(matches!(p.validate(), Err(AssemblyError::InvalidPlan(_))));
        assert!(matches!(p.build(immediate()), Err(AssemblyError::InvalidPlan(_))));

        p.operators[0].op = OperatorSpec::Hide;
        assert_eq!(p.validate().expect("hide is pass-through"), 100_000);
    }

    #[test]
    fn plan_at_adapter_limit_runs() {
        let mut p = plan(
            Some(SourceSpec::Range { start: 0, count: 2 }),
            vec![OperatorSpec::Add { value: 1 }, OperatorSpec::Hide],
        );
        p.operators[0].repeat = MAX_PLAN_ADAPTERS;
        p.operators[1].repeat = 10_000;
        let planned = p.build(immediate()).expect("build");

        let (recorder, handle) = Recorder::<i64>::new();
        planned.subscribe(recorder).expect("subscribe");

        let limit = i64::try_from(MAX_PLAN_ADAPTERS).expect("fits");
        assert_eq!(handle.items(), vec![limit, limit + 1]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn oversized_range_is_invalid() {
        let p = plan(
            Some(SourceSpec::Range {
                start: 0,
                count: MAX_PLAN_RANGE + 1,
            }),
            vec![],
        );
        assert!(matches!(p.validate(), Err(AssemblyError::InvalidPlan(_))));

        let p = plan(
            Some(SourceSpec::Range {
                start: 0,
                count: MAX_PLAN_RANGE,
            }),
            vec![],
        );
        assert_eq!(p.validate().expect("at limit"), 0);
    }

    #[test]
    fn repeat_expands_depth() {
        let mut p = plan(Some(SourceSpec::Just { value: 3 }), vec![OperatorSpec::Negate]);
        p.operators[0].repeat = 5;
        let planned = p.build(immediate()).expect("build");

        let (recorder, handle) = Recorder::<i64>::new();
        planned.subscribe(recorder).expect("subscribe");

        assert_eq!(planned.depth(), 5);
        assert_eq!(handle.items(), vec![-3]);
    }

    #[test]
    fn sum_switches_to_single_result() {
        let planned = plan(
            Some(SourceSpec::Values {
                values: vec![i64::MAX, 1, 2],
            }),
            vec![OperatorSpec::Sum, OperatorSpec::Hide],
        )
        .build(immediate())
        .expect("build");

        let (recorder, handle) = Recorder::<i64>::new();
        planned.subscribe(recorder).expect("subscribe");

        assert_eq!(planned.cardinality(), Cardinality::One);
        assert_eq!(handle.items(), vec![i64::MAX]);
        assert_eq!(handle.termination(), Some(Termination::Completed));
    }

    #[test]
    fn take_zero_stops_assembly() {
        let planned = plan(
            Some(SourceSpec::Range { start: 0, count: 3 }),
            vec![OperatorSpec::Hide, OperatorSpec::Take { count: 0 }],
        )
        .build(immediate())
        .expect("build");

        let (recorder, handle) = Recorder::<i64>::new();
        let assembly = planned.subscribe(recorder).expect("subscribe");

        assert_eq!(assembly, Assembly::SelfHandled { position: 0 });
        assert!(handle.is_empty());
    }

    #[test]
    fn plan_deserializes_from_json() {
        let json = r#"{
            "source": { "kind": "range", "start": 1, "count": 2 },
            "operators": [
                { "kind": "keep_above", "value": 1 },
                { "kind": "hide", "repeat": 3 },
                { "kind": "log" }
            ]
        }"#;
        let p: PipelinePlan = serde_json::from_str(json).expect("parse");

        assert_eq!(p.operators.len(), 3);
        assert_eq!(p.operators[1].repeat, 3);
        assert_eq!(
            p.operators[2].op,
            OperatorSpec::Log {
                category: "plan".to_string()
            }
        );
        assert_eq!(p.validate().expect("valid"), 5);
    }
}
