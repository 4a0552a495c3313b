//! Batch task queue
//!
//! Jobs are registered under caller-chosen ids, then [`TaskQueue::start`] hands
//! every pending one to a [`WorkerPool`]. Per task the lifecycle is
//!
//! ```text
//! Pending ──▶ Running ──▶ Completed | Failed
//!    └──────▶ Cancelled
//! ```
//!
//! All bookkeeping (task map, insertion order, active count, run flag) sits
//! behind a single mutex. Events are sent from inside the same critical section
//! that records a transition, so a subscriber always sees `Finished` after every
//! `TaskCompleted`/`TaskFailed` of the run. The conversion itself runs outside
//! the lock.
//!
//! Cancellation is cooperative: pending tasks are flipped to `Cancelled` and
//! their pool submissions dropped, but running subprocesses are left to finish.

use super::events::{EventBus, QueueEvent};
use super::pool::WorkerPool;
use crate::job::{ConversionJob, ConversionOutcome};
use crate::pandoc::Converter;
use crate::pandoc::service::panic_message;
use chrono::{DateTime, Utc};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MIN_CONCURRENT: usize = 1;
pub const MAX_CONCURRENT: usize = 16;
pub const DEFAULT_CONCURRENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Queue-tracked wrapper around a job
#[derive(Debug, Clone)]
pub struct BatchTask {
    pub id: String,
    pub job: ConversionJob,
    pub status: TaskStatus,
    pub outcome: Option<ConversionOutcome>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    scheduled: bool,
}

impl BatchTask {
    fn new(id: String, job: ConversionJob) -> Self {
        Self {
            id,
            job,
            status: TaskStatus::Pending,
            outcome: None,
            start_time: None,
            end_time: None,
            scheduled: false,
        }
    }

    /// Wall-clock seconds between start and end; zero when the task never ran
    pub fn duration_seconds(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Task counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub active_jobs: usize,
}

impl QueueSummary {
    /// Tasks that reached a terminal state
    pub fn settled(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: HashMap<String, BatchTask>,
    order: Vec<String>,
    active: usize,
    /// Set by `start`, cleared when `Finished` goes out
    run_active: bool,
    /// Bumped by `clear`; in-flight work from an older generation is discarded
    generation: u64,
    max_concurrent: usize,
}

impl QueueState {
    fn ordered(&self) -> impl Iterator<Item = &BatchTask> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary {
            total: self.tasks.len(),
            active_jobs: self.active,
            ..QueueSummary::default()
        };
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

struct Inner {
    state: Mutex<QueueState>,
    events: EventBus,
    converter: Arc<dyn Converter>,
}

impl Inner {
    fn run_task(&self, id: &str, generation: u64) {
        let job = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            let Some(task) = state.tasks.get_mut(id) else {
                return;
            };
            // Cancelled (or already claimed) between submission and pickup
            if task.status != TaskStatus::Pending {
                return;
            }
            task.status = TaskStatus::Running;
            task.start_time = Some(Utc::now());
            let job = task.job.clone();
            state.active += 1;
            self.events.emit(QueueEvent::TaskStarted {
                id: id.to_string(),
                display_name: job.display_name(),
            });
            job
        };

        debug!("Task {} running: {}", id, job.input_path.display());
        let outcome = catch_unwind(AssertUnwindSafe(|| self.converter.convert(&job))).unwrap_or_else(|panic| {
            ConversionOutcome {
                error_message: Some(format!("Task execution error: {}", panic_message(panic.as_ref()))),
                ..ConversionOutcome::default()
            }
        });

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Task {} finished after the queue was cleared", id);
            return;
        }
        let Some(task) = state.tasks.get_mut(id) else {
            return;
        };
        task.end_time = Some(Utc::now());
        task.status = if outcome.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        // Same clock as the `Finished` total
        let duration_seconds = task.duration_seconds();

        let event = if outcome.success {
            info!("Task {} completed in {:.2}s", id, duration_seconds);
            QueueEvent::TaskCompleted {
                id: id.to_string(),
                output_path: outcome.output_path.clone(),
                duration_seconds,
            }
        } else {
            warn!("Task {} failed: {}", id, outcome.error_text());
            QueueEvent::TaskFailed {
                id: id.to_string(),
                display_name: job.display_name(),
                error_message: outcome.error_text().to_string(),
            }
        };
        task.outcome = Some(outcome);
        state.active = state.active.saturating_sub(1);

        self.events.emit(event);
        self.check_completion(&mut state);
    }

    /// Fail a task that never reached a worker
    fn fail_unstarted(&self, id: &str, generation: u64, message: String) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        let Some(task) = state.tasks.get_mut(id) else {
            return;
        };
        if task.status != TaskStatus::Pending {
            return;
        }
        warn!("Task {} failed: {}", id, message);
        task.status = TaskStatus::Failed;
        task.end_time = Some(Utc::now());
        task.outcome = Some(ConversionOutcome {
            error_message: Some(message.clone()),
            ..ConversionOutcome::default()
        });
        let event = QueueEvent::TaskFailed {
            id: id.to_string(),
            display_name: task.job.display_name(),
            error_message: message,
        };

        self.events.emit(event);
        self.check_completion(&mut state);
    }

    /// Emit `Finished` once nothing is outstanding, `Progress` otherwise
    fn check_completion(&self, state: &mut QueueState) {
        if !state.run_active || state.tasks.is_empty() {
            return;
        }

        let summary = state.summary();
        if summary.pending + summary.running > 0 {
            self.events.emit(QueueEvent::Progress {
                settled: summary.settled(),
                total: summary.total,
            });
            return;
        }

        state.run_active = false;
        let total_duration: f64 = state.tasks.values().map(BatchTask::duration_seconds).sum();
        info!(
            "Queue finished: {}/{} successful in {:.2}s of task time",
            summary.completed, summary.total, total_duration
        );
        self.events.emit(QueueEvent::Finished {
            total: summary.total,
            successful: summary.completed,
            total_duration,
        });
    }
}

/// Runs conversion jobs with bounded parallelism
pub struct TaskQueue {
    inner: Arc<Inner>,
    pool: WorkerPool,
}

impl TaskQueue {
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self::with_max_concurrent(converter, DEFAULT_CONCURRENT)
    }

    pub fn with_max_concurrent(converter: Arc<dyn Converter>, max_concurrent: usize) -> Self {
        let max_concurrent = clamp_concurrency(max_concurrent);
        Self::with_pool(converter, WorkerPool::named("pandoc-batch", max_concurrent))
    }

    /// Run on a caller-built pool; its cap becomes the concurrency limit
    pub fn with_pool(converter: Arc<dyn Converter>, pool: WorkerPool) -> Self {
        let max_concurrent = clamp_concurrency(pool.max_workers());
        pool.set_max_workers(max_concurrent);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    max_concurrent,
                    ..QueueState::default()
                }),
                events: EventBus::default(),
                converter,
            }),
            pool,
        }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Clamp to 1..=16 and resize the pool; returns the applied value
    pub fn set_max_concurrent(&self, max_concurrent: usize) -> usize {
        let clamped = clamp_concurrency(max_concurrent);
        self.inner.state.lock().max_concurrent = clamped;
        self.pool.set_max_workers(clamped);
        info!("Max concurrent jobs set to {}", clamped);
        clamped
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.state.lock().max_concurrent
    }

    /// Register a job as `Pending`. Duplicate ids are rejected.
    pub fn add_task(&self, id: impl Into<String>, job: ConversionJob) -> bool {
        let id = id.into();
        let mut state = self.inner.state.lock();
        if state.tasks.contains_key(&id) {
            warn!("Task {} already exists", id);
            return false;
        }
        debug!("Added task {}: {}", id, job.input_path.display());
        state.order.push(id.clone());
        state.tasks.insert(id.clone(), BatchTask::new(id, job));
        true
    }

    /// Register a job under a fresh uuid
    pub fn add_job(&self, job: ConversionJob) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.add_task(id.clone(), job);
        id
    }

    /// Submit every pending, not yet submitted task. Returns immediately with
    /// the number submitted; zero means there was nothing to do.
    pub fn start(&self) -> usize {
        let (ids, generation) = {
            let mut state = self.inner.state.lock();
            let ids: Vec<String> = state
                .order
                .iter()
                .filter(|id| {
                    state
                        .tasks
                        .get(*id)
                        .is_some_and(|t| t.status == TaskStatus::Pending && !t.scheduled)
                })
                .cloned()
                .collect();
            if ids.is_empty() {
                warn!("No pending tasks to start");
                return 0;
            }
            for id in &ids {
                if let Some(task) = state.tasks.get_mut(id) {
                    task.scheduled = true;
                }
            }
            state.run_active = true;
            (ids, state.generation)
        };

        info!("Starting queue with {} tasks", ids.len());
        for id in &ids {
            let inner = Arc::clone(&self.inner);
            let task_id = id.clone();
            if let Err(e) = self.pool.submit(move || inner.run_task(&task_id, generation)) {
                self.inner
                    .fail_unstarted(id, generation, format!("Task execution error: no worker could be started: {e}"));
            }
        }
        ids.len()
    }

    /// Cancel every pending task; running ones finish normally. Returns how many were cancelled.
    pub fn cancel(&self) -> usize {
        let mut state = self.inner.state.lock();
        let now = Utc::now();
        let mut cancelled = 0;
        for task in state.tasks.values_mut() {
            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::Cancelled;
                task.end_time = Some(now);
                cancelled += 1;
            }
        }
        let dropped = self.pool.clear_pending();
        info!("Cancelled {} pending tasks ({} submissions dropped)", cancelled, dropped);

        if cancelled > 0 {
            self.inner.check_completion(&mut state);
        }
        cancelled
    }

    /// Forget every task. Work already running finishes but reports nothing.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.tasks.clear();
        state.order.clear();
        state.active = 0;
        state.run_active = false;
        state.generation += 1;
        self.pool.clear_pending();
        info!("Queue cleared");
    }

    /// Block until the pool has no outstanding work or the timeout elapses
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        self.pool.wait_for_done(Some(timeout))
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.inner.state.lock().tasks.get(id).map(|t| t.status)
    }

    pub fn outcome_of(&self, id: &str) -> Option<ConversionOutcome> {
        self.inner.state.lock().tasks.get(id).and_then(|t| t.outcome.clone())
    }

    pub fn task(&self, id: &str) -> Option<BatchTask> {
        self.inner.state.lock().tasks.get(id).cloned()
    }

    /// Ids in insertion order
    pub fn task_ids(&self) -> Vec<String> {
        self.inner.state.lock().order.clone()
    }

    pub fn summary(&self) -> QueueSummary {
        self.inner.state.lock().summary()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completed or failed
    pub fn completed_tasks(&self) -> Vec<BatchTask> {
        self.filtered(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Failed))
    }

    pub fn successful_tasks(&self) -> Vec<BatchTask> {
        self.filtered(|t| t.status == TaskStatus::Completed)
    }

    pub fn failed_tasks(&self) -> Vec<BatchTask> {
        self.filtered(|t| t.status == TaskStatus::Failed)
    }

    pub fn cancelled_tasks(&self) -> Vec<BatchTask> {
        self.filtered(|t| t.status == TaskStatus::Cancelled)
    }

    /// Tasks currently running
    pub fn active_jobs(&self) -> usize {
        self.inner.state.lock().active
    }

    /// A run was started and has not emitted `Finished` yet
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().run_active
    }

    fn filtered(&self, keep: impl Fn(&BatchTask) -> bool) -> Vec<BatchTask> {
        self.inner.state.lock().ordered().filter(|t| keep(t)).cloned().collect()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.pool.clear_pending();
    }
}

pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENT, MAX_CONCURRENT)
}
