//! Cron-style job scheduler.
//!
//! Every registered job runs on its own tokio task while the scheduler is
//! started. Jobs are fire-and-forget: callers never wait for a run.
//!
//! # Example
//!
//! ```
//! use shared::scheduler::Scheduler;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let scheduler = Scheduler::new();
//! let runs = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&runs);
//! let handle = scheduler
//!     .add_schedule("@every 1h", move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! scheduler.start().unwrap();
//! assert!(scheduler.is_running());
//! assert!(scheduler.remove(handle));
//! scheduler.stop();
//! # });
//! ```

mod schedule;

pub use schedule::Schedule;

use crate::error::SchedulerError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A job run by the scheduler.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// Opaque reference to a scheduled entry, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(u64);

impl std::fmt::Display for ScheduleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    expr: String,
    schedule: Arc<Schedule>,
    job: Job,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct SchedulerState {
    entries: HashMap<ScheduleHandle, Entry>,
    /// Set while started.
    runtime: Option<Handle>,
}

/// Runs jobs on recurring schedules.
#[derive(Default)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    next_id: AtomicU64,
}

impl Scheduler {
    /// Creates a stopped scheduler with no entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scheduler wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Starts running all entries on the current tokio runtime.
    ///
    /// Calling `start` on a running scheduler is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` if called outside a tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut state = self.lock();
        if state.runtime.is_some() {
            return Ok(());
        }

        for (handle, entry) in &mut state.entries {
            entry.task = Some(spawn_entry(&runtime, *handle, entry));
        }
        tracing::info!(entries = state.entries.len(), "Scheduler started");
        state.runtime = Some(runtime);
        Ok(())
    }

    /// Stops all running entries. Entries are kept and resume on the next
    /// [`Scheduler::start`].
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.runtime.take().is_none() {
            return;
        }
        for entry in state.entries.values_mut() {
            if let Some(task) = entry.task.take() {
                task.abort();
            }
        }
        tracing::info!(entries = state.entries.len(), "Scheduler stopped");
    }

    /// Returns true while the scheduler is started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().runtime.is_some()
    }

    /// Adds a job fired on `expr`. If the scheduler is running the job is
    /// armed immediately.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleInvalid` if `expr` cannot be parsed.
    pub fn add_schedule<F>(&self, expr: &str, job: F) -> Result<ScheduleHandle, SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let schedule: Schedule = expr.parse().inspect_err(|e| {
            tracing::warn!(%expr, error = %e, "Rejected schedule expression");
        })?;
        Ok(self.add_parsed(expr, schedule, job))
    }

    /// Adds a job fired on an already parsed schedule. `expr` is kept for
    /// logging only.
    pub fn add_parsed<F>(&self, expr: &str, schedule: Schedule, job: F) -> ScheduleHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = ScheduleHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut entry = Entry {
            expr: expr.to_string(),
            schedule: Arc::new(schedule),
            job: Arc::new(job),
            task: None,
        };

        let mut state = self.lock();
        if let Some(runtime) = &state.runtime {
            entry.task = Some(spawn_entry(runtime, handle, &entry));
        }
        state.entries.insert(handle, entry);

        tracing::debug!(%handle, %expr, "Schedule added");
        handle
    }

    /// Removes an entry and cancels its pending fire. Returns false if the
    /// handle was unknown.
    pub fn remove(&self, handle: ScheduleHandle) -> bool {
        let Some(entry) = self.lock().entries.remove(&handle) else {
            return false;
        };
        if let Some(task) = entry.task {
            task.abort();
        }
        tracing::debug!(%handle, expr = %entry.expr, "Schedule removed");
        true
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries hold no invariants a panicking holder could break.
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in state.entries.values_mut() {
            if let Some(task) = entry.task.take() {
                task.abort();
            }
        }
    }
}

fn spawn_entry(runtime: &Handle, handle: ScheduleHandle, entry: &Entry) -> JoinHandle<()> {
    let schedule = Arc::clone(&entry.schedule);
    let job = Arc::clone(&entry.job);
    let expr = entry.expr.clone();

    runtime.spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                tracing::debug!(%handle, %expr, "Schedule has no further fire times");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            tracing::debug!(%handle, %expr, "Running scheduled job");
            job();
        }
    })
}
