//! Task queue behaviour with stub converters

use super::*;
use crate::formats::OutputFormat;
use crate::job::{ConversionJob, ConversionOutcome};
use crate::pandoc::Converter;
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

/// Sleeps, tracks peak concurrency, fails any input whose name contains "fail"
#[derive(Default)]
struct SleepyConverter {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SleepyConverter {
    fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(delay_ms),
            ..Self::default()
        })
    }
}

impl Converter for SleepyConverter {
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);

        if job.display_name().contains("fail") {
            ConversionOutcome {
                error_message: Some("pandoc: boom".to_string()),
                duration_seconds: self.delay.as_secs_f64(),
                ..ConversionOutcome::default()
            }
        } else {
            ConversionOutcome::succeeded(job.output_path.clone(), self.delay.as_secs_f64(), "stub".to_string())
        }
    }
}

/// Blocks every conversion until the test releases it
struct GatedConverter {
    release: Receiver<()>,
}

impl GatedConverter {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = unbounded();
        (Arc::new(Self { release: rx }), tx)
    }
}

impl Converter for GatedConverter {
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        let _ = self.release.recv_timeout(WAIT);
        ConversionOutcome::succeeded(job.output_path.clone(), 0.0, "gated".to_string())
    }
}

/// Takes real time but reports none of it
struct UntimedConverter {
    delay: Duration,
}

impl Converter for UntimedConverter {
    fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        thread::sleep(self.delay);
        ConversionOutcome::succeeded(job.output_path.clone(), 0.0, "untimed".to_string())
    }
}

fn job(name: &str) -> ConversionJob {
    ConversionJob::new(name, OutputFormat::Html)
}

fn drain(rx: &Receiver<QueueEvent>) -> Vec<QueueEvent> {
    rx.try_iter().collect()
}

fn finished_events(events: &[QueueEvent]) -> Vec<&QueueEvent> {
    events.iter().filter(|e| e.is_finished()).collect()
}

fn wait_for_start(rx: &Receiver<QueueEvent>) -> String {
    loop {
        match rx.recv_timeout(WAIT).expect("task should start") {
            QueueEvent::TaskStarted { id, .. } => return id,
            _ => continue,
        }
    }
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let queue = TaskQueue::new(SleepyConverter::new(0));
    assert!(queue.add_task("a", job("a.md")));
    assert!(!queue.add_task("a", job("other.md")));

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.status_of("a"), Some(TaskStatus::Pending));
    assert_eq!(queue.task("a").unwrap().job.input_path, std::path::PathBuf::from("a.md"));
}

#[test]
fn test_three_tasks_finish_within_cap() {
    let converter = SleepyConverter::new(40);
    let queue = TaskQueue::with_max_concurrent(converter.clone(), 2);
    let rx = queue.subscribe();
    for name in ["a.md", "b.md", "c.md"] {
        queue.add_task(name, job(name));
    }

    assert_eq!(queue.start(), 3);
    assert!(queue.wait_for_completion(WAIT));

    let events = drain(&rx);
    let finished = finished_events(&events);
    assert_eq!(finished.len(), 1);
    match finished[0] {
        QueueEvent::Finished { total, successful, total_duration } => {
            assert_eq!(*total, 3);
            assert_eq!(*successful, 3);
            assert!(*total_duration > 0.0);
        }
        _ => unreachable!(),
    }
    assert!(converter.peak.load(Ordering::SeqCst) <= 2);
    assert!(!queue.is_running());
    assert_eq!(queue.active_jobs(), 0);
}

#[test]
fn test_completed_durations_add_up_to_finished_total() {
    let converter = Arc::new(UntimedConverter {
        delay: Duration::from_millis(30),
    });
    let queue = TaskQueue::with_max_concurrent(converter, 2);
    let rx = queue.subscribe();
    for name in ["a.md", "b.md", "c.md"] {
        queue.add_task(name, job(name));
    }
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let events = drain(&rx);
    let completed: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            QueueEvent::TaskCompleted { duration_seconds, .. } => Some(*duration_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 3);
    assert!(completed.iter().all(|d| *d >= 0.02));

    let total_duration = events
        .iter()
        .find_map(|e| match e {
            QueueEvent::Finished { total_duration, .. } => Some(*total_duration),
            _ => None,
        })
        .expect("finished event");
    let sum: f64 = completed.iter().sum();
    assert!((sum - total_duration).abs() < 1e-6, "{sum} vs {total_duration}");
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_unspawnable_workers_fail_tasks_and_finish() {
    let pool = WorkerPool::named("stuck", 2).with_stack_size(1 << 62);
    let converter = SleepyConverter::new(0);
    let queue = TaskQueue::with_pool(converter.clone(), pool);
    let rx = queue.subscribe();
    queue.add_task("a", job("a.md"));
    queue.add_task("b", job("b.md"));

    assert_eq!(queue.start(), 2);
    assert!(queue.wait_for_completion(WAIT));

    let events = drain(&rx);
    let failures = events
        .iter()
        .filter(|e| matches!(e, QueueEvent::TaskFailed { error_message, .. } if error_message.contains("no worker could be started")))
        .count();
    assert_eq!(failures, 2);
    assert_eq!(finished_events(&events).len(), 1);
    assert!(events.last().is_some_and(QueueEvent::is_finished));
    assert_eq!(queue.summary().failed, 2);
    assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    assert!(!queue.is_running());
}

#[test]
fn test_running_count_never_exceeds_cap() {
    let converter = SleepyConverter::new(15);
    let queue = TaskQueue::with_max_concurrent(converter.clone(), 3);
    for i in 0..12 {
        queue.add_task(format!("t{i}"), job(&format!("{i}.md")));
    }
    queue.start();

    while queue.is_running() {
        assert!(queue.summary().running <= 3);
        assert!(queue.active_jobs() <= 3);
        thread::sleep(Duration::from_millis(2));
    }
    assert!(queue.wait_for_completion(WAIT));
    assert!(converter.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(converter.calls.load(Ordering::SeqCst), 12);
}

#[test]
fn test_finished_reports_accounting_once_and_last() {
    let queue = TaskQueue::with_max_concurrent(SleepyConverter::new(10), 4);
    let rx = queue.subscribe();
    for name in ["a.md", "fail-b.md", "c.md", "fail-d.md", "e.md", "f.md"] {
        queue.add_task(name, job(name));
    }
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let events = drain(&rx);
    assert!(events.last().unwrap().is_finished());
    assert_eq!(finished_events(&events).len(), 1);

    let started = events.iter().filter(|e| matches!(e, QueueEvent::TaskStarted { .. })).count();
    let completed = events.iter().filter(|e| matches!(e, QueueEvent::TaskCompleted { .. })).count();
    let failed = events.iter().filter(|e| matches!(e, QueueEvent::TaskFailed { .. })).count();
    assert_eq!((started, completed, failed), (6, 4, 2));

    let task_sum: f64 = queue.task_ids().iter().map(|id| queue.task(id).unwrap().duration_seconds()).sum();
    match events.last().unwrap() {
        QueueEvent::Finished { total, successful, total_duration } => {
            assert_eq!(*total, 6);
            assert_eq!(*successful, queue.successful_tasks().len());
            assert_eq!(*successful, 4);
            assert!((total_duration - task_sum).abs() < 1e-6);
        }
        _ => unreachable!(),
    }

    for id in queue.task_ids() {
        let task = queue.task(&id).unwrap();
        assert!(task.status.is_terminal());
        assert!(task.duration_seconds() >= 0.0);
        assert!(task.outcome.is_some());
    }
}

#[test]
fn test_progress_counts_settled_tasks() {
    let queue = TaskQueue::with_max_concurrent(SleepyConverter::new(5), 1);
    let rx = queue.subscribe();
    for name in ["a.md", "b.md", "c.md"] {
        queue.add_task(name, job(name));
    }
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let progress: Vec<(usize, usize)> = drain(&rx)
        .into_iter()
        .filter_map(|e| match e {
            QueueEvent::Progress { settled, total } => Some((settled, total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3)]);
}

#[test]
fn test_failure_message_is_reported_with_display_name() {
    let timing_out = |_: &ConversionJob| ConversionOutcome {
        error_message: Some("Pandoc conversion timed out after 5 minutes".to_string()),
        ..ConversionOutcome::default()
    };
    let queue = TaskQueue::new(Arc::new(timing_out));
    let rx = queue.subscribe();
    queue.add_task("slow", job("docs/slow.md"));
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let outcome = queue.outcome_of("slow").unwrap();
    assert!(!outcome.success);
    assert!(outcome.error_text().contains("timed out"));

    let failed = drain(&rx)
        .into_iter()
        .find(|e| matches!(e, QueueEvent::TaskFailed { .. }))
        .unwrap();
    assert_eq!(
        failed,
        QueueEvent::TaskFailed {
            id: "slow".into(),
            display_name: "slow.md".into(),
            error_message: "Pandoc conversion timed out after 5 minutes".into(),
        }
    );
    assert_eq!(queue.failed_tasks().len(), 1);
}

#[test]
fn test_panicking_converter_fails_the_task() {
    let panicking = |_: &ConversionJob| -> ConversionOutcome { panic!("converter exploded") };
    let queue = TaskQueue::new(Arc::new(panicking));
    let rx = queue.subscribe();
    queue.add_task("a", job("a.md"));
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    assert_eq!(queue.status_of("a"), Some(TaskStatus::Failed));
    assert_eq!(
        queue.outcome_of("a").unwrap().error_text(),
        "Task execution error: converter exploded"
    );
    assert_eq!(finished_events(&drain(&rx)).len(), 1);
}

#[test]
fn test_cancel_before_start() {
    let converter = SleepyConverter::new(0);
    let queue = TaskQueue::new(converter.clone());
    let rx = queue.subscribe();
    queue.add_task("a", job("a.md"));
    queue.add_task("b", job("b.md"));

    assert_eq!(queue.cancel(), 2);
    assert_eq!(queue.start(), 0);
    assert!(queue.wait_for_completion(WAIT));

    assert_eq!(queue.status_of("a"), Some(TaskStatus::Cancelled));
    assert_eq!(queue.status_of("b"), Some(TaskStatus::Cancelled));
    assert_eq!(queue.cancelled_tasks().len(), 2);
    assert!(drain(&rx).iter().all(|e| !matches!(e, QueueEvent::TaskStarted { .. })));
    assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_leaves_running_task_alone() {
    let (converter, release) = GatedConverter::new();
    let queue = TaskQueue::with_max_concurrent(converter, 1);
    let rx = queue.subscribe();
    for name in ["a.md", "b.md", "c.md"] {
        queue.add_task(name, job(name));
    }
    queue.start();

    let first = wait_for_start(&rx);
    assert_eq!(queue.cancel(), 2);
    assert_eq!(queue.status_of(&first), Some(TaskStatus::Running));

    release.send(()).unwrap();
    assert!(queue.wait_for_completion(WAIT));

    assert_eq!(queue.status_of(&first), Some(TaskStatus::Completed));
    let summary = queue.summary();
    assert_eq!((summary.completed, summary.cancelled, summary.pending), (1, 2, 0));

    let events = drain(&rx);
    assert!(events.iter().all(|e| !matches!(e, QueueEvent::TaskStarted { .. })));
    match finished_events(&events).as_slice() {
        [QueueEvent::Finished { total, successful, .. }] => assert_eq!((*total, *successful), (3, 1)),
        other => panic!("expected one finished event, got {other:?}"),
    }
}

#[test]
fn test_clear_discards_in_flight_results() {
    let (converter, release) = GatedConverter::new();
    let queue = TaskQueue::with_max_concurrent(converter, 1);
    let rx = queue.subscribe();
    queue.add_task("a", job("a.md"));
    queue.add_task("b", job("b.md"));
    queue.start();

    wait_for_start(&rx);
    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.active_jobs(), 0);

    release.send(()).unwrap();
    assert!(queue.wait_for_completion(WAIT));
    assert!(drain(&rx).is_empty());
    assert!(queue.task_ids().is_empty());
}

#[test]
fn test_wait_times_out_while_tasks_run() {
    let (converter, release) = GatedConverter::new();
    let queue = TaskQueue::new(converter);
    queue.add_task("a", job("a.md"));
    queue.start();

    assert!(!queue.wait_for_completion(Duration::from_millis(50)));
    release.send(()).unwrap();
    assert!(queue.wait_for_completion(WAIT));
}

#[test]
fn test_start_without_tasks_is_noop() {
    let queue = TaskQueue::new(SleepyConverter::new(0));
    let rx = queue.subscribe();
    assert_eq!(queue.start(), 0);
    assert!(!queue.is_running());
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_tasks_are_not_submitted_twice() {
    let converter = SleepyConverter::new(20);
    let queue = TaskQueue::with_max_concurrent(converter.clone(), 1);
    queue.add_task("a", job("a.md"));
    queue.add_task("b", job("b.md"));

    assert_eq!(queue.start(), 2);
    assert_eq!(queue.start(), 0);
    assert!(queue.wait_for_completion(WAIT));
    assert_eq!(converter.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_max_concurrent_is_clamped() {
    let queue = TaskQueue::new(SleepyConverter::new(0));
    assert_eq!(queue.max_concurrent(), 4);
    assert_eq!(queue.set_max_concurrent(0), 1);
    assert_eq!(queue.set_max_concurrent(64), 16);
    assert_eq!(queue.max_concurrent(), 16);
    assert_eq!(TaskQueue::with_max_concurrent(SleepyConverter::new(0), 100).max_concurrent(), 16);
}

#[test]
fn test_accessors_follow_insertion_order() {
    let queue = TaskQueue::with_max_concurrent(SleepyConverter::new(0), 4);
    for name in ["z.md", "fail-y.md", "x.md"] {
        queue.add_task(name, job(name));
    }
    let generated = queue.add_job(job("w.md"));
    assert_eq!(queue.task_ids()[..3], ["z.md", "fail-y.md", "x.md"]);
    assert_eq!(queue.task_ids()[3], generated);

    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let successful: Vec<String> = queue.successful_tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(successful, vec!["z.md".to_string(), "x.md".to_string(), generated]);
    assert_eq!(queue.completed_tasks().len(), 4);
    assert_eq!(queue.failed_tasks()[0].id, "fail-y.md");
    assert_eq!(queue.outcome_of("missing"), None);
    assert_eq!(queue.status_of("missing"), None);
}

#[cfg(unix)]
#[test]
fn test_missing_input_fails_fast_without_subprocess() {
    use crate::pandoc::{ConversionService, LocatorConfig, RunnerOptions};
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let marker = dir.path().join("spawned");
    let exe = dir.path().join("pandoc");
    std::fs::write(
        &exe,
        format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'pandoc 3.1.9'; exit 0; fi\ntouch '{}'\n",
            marker.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

    let locator = LocatorConfig {
        program: "pandoc-missing-7731".to_string(),
        search_well_known: false,
        ..LocatorConfig::default()
    }
    .with_explicit_path(&exe);
    let service = Arc::new(ConversionService::new(locator, RunnerOptions::default()));
    let queue = TaskQueue::new(service);
    let rx = queue.subscribe();
    queue.add_task("ghost", job(&dir.path().join("ghost.md").to_string_lossy()));
    queue.start();
    assert!(queue.wait_for_completion(WAIT));

    let failure = drain(&rx).into_iter().find_map(|e| match e {
        QueueEvent::TaskFailed { error_message, .. } => Some(error_message),
        _ => None,
    });
    assert!(failure.unwrap().contains("does not exist"));
    assert!(!marker.exists());
}
