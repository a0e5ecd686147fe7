//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Assembly is synchronous and may walk very deep chains, so every command
//! that builds or attaches runs that work off the async runtime. `run`
//! subscribes on its own worker thread so the timeout covers pipelines that
//! emit everything inside `subscribe`.

use super::CliError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use subchain_core::{
    Assembly, ChainStep, Flux, Immediate, PipelinePlan, Recorder, Scheduler, Termination,
    ThreadScheduler, describe, steps,
};
use tokio::task::JoinSet;

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum plan file size (4 MB).
///
/// Large enough for a `values` source at its entry limit.
const MAX_PLAN_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Items emitted by the stress source.
const STRESS_ITEMS: u64 = 16;

/// Stack of the thread that subscribes to a plan (8 MB).
///
/// Items cross every wrapping operator as a nested call; plans cap those at
/// `MAX_PLAN_ADAPTERS`.
const RUN_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CliError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CliError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CliError::Plan(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CliError> {
    let canonical = path.canonicalize().map_err(|e| {
        CliError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CliError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn join_error(e: tokio::task::JoinError) -> CliError {
    CliError::Join(e.to_string())
}

// =============================================================================
// PLAN LOADING
// =============================================================================

/// Parse plan text. Files ending in `.json` are JSON, everything else TOML.
pub fn parse_plan(contents: &str, path: &Path) -> Result<PipelinePlan, CliError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(contents).map_err(|e| CliError::Plan(e.to_string()))
    } else {
        toml::from_str(contents).map_err(|e| CliError::Plan(e.to_string()))
    }
}

/// Read, parse and validate a plan file.
pub fn load_plan(path: &Path) -> Result<PipelinePlan, CliError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, MAX_PLAN_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated_path)
        .map_err(|e| CliError::Io(format!("Failed to read plan: {}", e)))?;

    let plan = parse_plan(&contents, &validated_path)?;
    let depth = plan.validate()?;
    tracing::debug!(path = %validated_path.display(), depth, "plan loaded");
    Ok(plan)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Outcome of running a plan once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub name: String,
    pub depth: usize,
    pub cardinality: String,
    /// `attached` or `self_handled`.
    pub assembly: String,
    /// Operators visited by the subscribing thread.
    pub operator_calls: usize,
    pub items: Vec<i64>,
}

/// Build `plan`, subscribe once and wait up to `timeout` for termination.
///
/// The subscription runs on a dedicated thread. On timeout that thread is
/// left to finish on its own.
pub fn run_plan(plan: &PipelinePlan, timeout: Duration) -> Result<RunReport, CliError> {
    let scheduler: Arc<dyn Scheduler> = Arc::new(ThreadScheduler::new("subchain-worker"));
    let planned = Arc::new(plan.build(scheduler)?);
    let (recorder, handle) = Recorder::<i64>::new();
    let deadline = Instant::now() + timeout;
    let timed_out = || CliError::Timeout {
        millis: timeout.as_millis() as u64,
    };

    let (sender, receiver) = mpsc::channel();
    let pipeline = Arc::clone(&planned);
    std::thread::Builder::new()
        .name("subchain-run".to_string())
        .stack_size(RUN_STACK_SIZE)
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            let _ = sender.send(pipeline.subscribe(recorder));
        })
        .map_err(|e| CliError::Io(format!("Failed to start run thread: {}", e)))?;

    let assembly = match receiver.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(RecvTimeoutError::Timeout) => return Err(timed_out()),
        Err(RecvTimeoutError::Disconnected) => {
            return Err(CliError::Join("run thread stopped without a result".to_string()));
        }
    };
    tracing::debug!(pipeline = planned.name(), ?assembly, "subscribed");

    if !handle.wait(deadline.saturating_duration_since(Instant::now())) {
        return Err(timed_out());
    }
    if let Some(Termination::Failed(error)) = handle.termination() {
        return Err(CliError::Stream(error.to_string()));
    }

    Ok(RunReport {
        name: planned.name().to_string(),
        depth: planned.depth(),
        cardinality: planned.cardinality().to_string(),
        assembly: match assembly {
            Assembly::Attached { .. } => "attached".to_string(),
            Assembly::SelfHandled { .. } => "self_handled".to_string(),
        },
        operator_calls: assembly.operator_calls(),
        items: handle.items(),
    })
}

/// Run a plan file and print what it emitted.
pub async fn cmd_run(
    plan_path: &Path,
    timeout_ms: u64,
    json_mode: bool,
    verbose: bool,
) -> Result<(), CliError> {
    let plan = load_plan(plan_path)?;
    let timeout = Duration::from_millis(timeout_ms);

    let report = tokio::task::spawn_blocking(move || run_plan(&plan, timeout))
        .await
        .map_err(join_error)??;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Pipeline: {}", report.name);
    println!("==========");
    println!("Depth:          {}", report.depth);
    println!("Cardinality:    {}", report.cardinality);
    println!("Assembly:       {}", report.assembly);
    if verbose {
        println!("Operator calls: {}", report.operator_calls);
    }
    println!();
    println!("Items ({}):", report.items.len());
    for item in &report.items {
        println!("  {}", item);
    }

    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Assembled chain as seen through introspection.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub name: String,
    pub depth: usize,
    pub cardinality: String,
    pub total_stages: usize,
    pub steps: Vec<ChainStep>,
}

/// Build `plan` and collect up to `limit` stages, outermost first.
pub fn inspect_plan(plan: &PipelinePlan, limit: usize) -> Result<InspectReport, CliError> {
    let planned = plan.build(Arc::new(Immediate))?;
    let mut all = steps(planned.head());
    let total_stages = all.len();
    all.truncate(limit);

    if total_stages <= limit {
        tracing::debug!(chain = %describe(planned.head()), "inspected");
    }

    Ok(InspectReport {
        name: planned.name().to_string(),
        depth: planned.depth(),
        cardinality: planned.cardinality().to_string(),
        total_stages,
        steps: all,
    })
}

/// Print every stage of a planned chain.
pub async fn cmd_inspect(plan_path: &Path, limit: usize, json_mode: bool) -> Result<(), CliError> {
    let plan = load_plan(plan_path)?;

    let report = tokio::task::spawn_blocking(move || inspect_plan(&plan, limit))
        .await
        .map_err(join_error)??;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Pipeline: {} ({})", report.name, report.cardinality);
    println!("==========");
    println!("{:>8}  {:<16} {:>10}  {:<6} {}", "POS", "NAME", "PREFETCH", "STYLE", "KIND");
    for step in &report.steps {
        println!(
            "{:>8}  {:<16} {:>10}  {:<6} {}",
            step.position,
            step.name,
            step.prefetch.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            step.run_style.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            if step.is_operator { "operator" } else { "terminal" }
        );
    }
    let hidden = report.total_stages.saturating_sub(report.steps.len());
    if hidden > 0 {
        println!("     ...  {} more stages", hidden);
    }

    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Check a plan file without building it.
pub fn cmd_validate(plan_path: &Path, json_mode: bool) -> Result<(), CliError> {
    let plan = load_plan(plan_path)?;
    let depth = plan.validate()?;

    if json_mode {
        let output = serde_json::json!({
            "valid": true,
            "name": plan.name,
            "depth": depth,
            "has_source": plan.source.is_some(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Plan is valid");
    println!("  Operators: {}", depth);
    if plan.source.is_none() {
        println!("  Warning:   no source; building will fail");
    }

    Ok(())
}

// =============================================================================
// STRESS COMMAND
// =============================================================================

/// Result of a concurrent attachment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    pub depth: usize,
    pub attachers: usize,
    pub items_delivered: usize,
    pub build_ms: u64,
    pub attach_ms: u64,
}

/// Build a `hide` chain of `depth` operators and attach `attachers`
/// subscribers to it concurrently.
pub async fn stress(depth: usize, attachers: usize) -> Result<StressReport, CliError> {
    if attachers == 0 {
        return Err(CliError::Stress("at least one attacher is required".to_string()));
    }

    let started = Instant::now();
    let flux = tokio::task::spawn_blocking(move || {
        let mut flux = Flux::range(0, STRESS_ITEMS);
        for _ in 0..depth {
            flux = flux.hide();
        }
        Arc::new(flux)
    })
    .await
    .map_err(join_error)?;
    let built = started.elapsed();

    let mut set = JoinSet::new();
    for attacher in 0..attachers {
        let flux = Arc::clone(&flux);
        set.spawn_blocking(move || -> Result<usize, CliError> {
            let (recorder, handle) = Recorder::<i64>::new();
            let assembly = flux.subscribe(recorder)?;

            if assembly != (Assembly::Attached { hops: depth }) {
                return Err(CliError::Stress(format!(
                    "attacher {} saw {:?}",
                    attacher, assembly
                )));
            }
            if handle.termination() != Some(Termination::Completed) {
                return Err(CliError::Stress(format!(
                    "attacher {} did not complete",
                    attacher
                )));
            }
            Ok(handle.len())
        });
    }

    let mut items_delivered = 0usize;
    while let Some(joined) = set.join_next().await {
        items_delivered = items_delivered.saturating_add(joined.map_err(join_error)??);
    }
    let attached = started.elapsed().saturating_sub(built);

    tracing::info!(depth, attachers, items_delivered, "stress run finished");

    Ok(StressReport {
        depth,
        attachers,
        items_delivered,
        build_ms: built.as_millis() as u64,
        attach_ms: attached.as_millis() as u64,
    })
}

/// Run the stress test and print a summary.
pub async fn cmd_stress(depth: usize, attachers: usize, json_mode: bool) -> Result<(), CliError> {
    let report = stress(depth, attachers).await?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Stress Test");
    println!("===========");
    println!("Depth:           {}", report.depth);
    println!("Attachers:       {}", report.attachers);
    println!("Items delivered: {}", report.items_delivered);
    println!("Build time:      {} ms", report.build_ms);
    println!("Attach time:     {} ms", report.attach_ms);

    Ok(())
}
