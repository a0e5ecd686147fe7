//! # Schedulers
//!
//! Execution contexts that operators such as `subscribe_on` hand deferred
//! attachment work to. The flattening loop never schedules anything itself.

use crate::AssemblyError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a [`Task`], now or later.
pub trait Scheduler: Send + Sync + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Accept `task` for execution.
    ///
    /// Returns `AssemblyError::Scheduler` if the task cannot be accepted.
    fn schedule(&self, task: Task) -> Result<(), AssemblyError>;
}

// =============================================================================
// IMMEDIATE
// =============================================================================

/// Runs every task inline on the scheduling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn name(&self) -> &str {
        "immediate"
    }

    fn schedule(&self, task: Task) -> Result<(), AssemblyError> {
        task();
        Ok(())
    }
}

// =============================================================================
// THREAD
// =============================================================================

/// Runs every task on a fresh, named OS thread.
#[derive(Debug)]
pub struct ThreadScheduler {
    prefix: String,
    spawned: AtomicUsize,
}

impl ThreadScheduler {
    /// Create a scheduler whose threads are named `{prefix}-{n}`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Number of threads spawned so far.
    #[must_use]
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Scheduler for ThreadScheduler {
    fn name(&self) -> &str {
        &self.prefix
    }

    fn schedule(&self, task: Task) -> Result<(), AssemblyError> {
        let index = self.spawned.fetch_add(1, Ordering::Relaxed);
        std::thread::Builder::new()
            .name(format!("{}-{}", self.prefix, index))
            .spawn(task)
            .map(|_| ())
            .map_err(|e| AssemblyError::Scheduler(format!("{}: {}", self.prefix, e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn immediate_runs_before_returning() {
        let (tx, rx) = mpsc::channel();
        Immediate
            .schedule(Box::new(move || {
                let _ = tx.send(1u8);
            }))
            .expect("schedule");
        assert_eq!(rx.try_recv().ok(), Some(1));
    }

    #[test]
    fn thread_scheduler_names_its_threads() {
        let scheduler = ThreadScheduler::new("worker");
        let (tx, rx) = mpsc::channel();

        scheduler
            .schedule(Box::new(move || {
                let name = std::thread::current().name().map(str::to_string);
                let _ = tx.send(name);
            }))
            .expect("schedule");

        let name = rx.recv_timeout(Duration::from_secs(5)).expect("recv");
        assert_eq!(name.as_deref(), Some("worker-0"));
        assert_eq!(scheduler.spawned(), 1);
    }
}
