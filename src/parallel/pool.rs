//! Resizable worker pool
//!
//! Work items are boxed closures on a crossbeam channel. Threads are spawned on
//! demand up to the cap and exit as soon as the channel runs dry, so an idle pool
//! holds no threads. All counters live behind one mutex paired with a condvar
//! that signals whenever work finishes or a worker retires.

use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

type Work = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
struct PoolState {
    max_workers: usize,
    live_workers: usize,
    queued: usize,
    running: usize,
    spawned_total: usize,
}

struct Shared {
    state: Mutex<PoolState>,
    changed: Condvar,
    work_rx: Receiver<Work>,
}

/// Bounded pool of OS threads
pub struct WorkerPool {
    shared: Arc<Shared>,
    work_tx: Sender<Work>,
    name: String,
    stack_size: Option<usize>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self::named("worker", max_workers)
    }

    /// Threads are named `<name>-<n>`
    pub fn named(name: &str, max_workers: usize) -> Self {
        let (work_tx, work_rx) = unbounded();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    max_workers: max_workers.max(1),
                    live_workers: 0,
                    queued: 0,
                    running: 0,
                    spawned_total: 0,
                }),
                changed: Condvar::new(),
                work_rx,
            }),
            work_tx,
            name: name.to_string(),
            stack_size: None,
        }
    }

    /// Stack size for worker threads spawned from now on
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Queue one unit of work, starting a worker if below the cap.
    ///
    /// Fails, and takes the item back, when no worker is alive and a new one
    /// cannot be spawned.
    pub fn submit<F>(&self, work: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if self.work_tx.send(Box::new(work)).is_err() {
            // The receiver lives in `shared`, so this only happens mid-teardown
            error!("Worker pool channel closed, dropping work");
            return Err(io::Error::other("worker pool channel closed"));
        }
        state.queued += 1;
        if state.live_workers < state.max_workers {
            if let Err(e) = self.spawn_worker(&mut state) {
                if state.live_workers == 0 {
                    // Workers only retire on an empty channel, so this is the item just sent
                    if self.shared.work_rx.try_recv().is_ok() {
                        state.queued = state.queued.saturating_sub(1);
                    }
                    self.shared.changed.notify_all();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Change the cap. Extra workers start immediately when work is waiting;
    /// surplus ones retire after their current item.
    pub fn set_max_workers(&self, max_workers: usize) {
        let mut state = self.shared.state.lock();
        state.max_workers = max_workers.max(1);
        let idle_work = state.queued;
        let room = state.max_workers.saturating_sub(state.live_workers);
        for _ in 0..room.min(idle_work) {
            if self.spawn_worker(&mut state).is_err() {
                break;
            }
        }
        debug!("Worker pool cap set to {}", state.max_workers);
    }

    pub fn max_workers(&self) -> usize {
        self.shared.state.lock().max_workers
    }

    /// Items currently executing
    pub fn running(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Items submitted but not yet picked up
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queued
    }

    pub fn live_workers(&self) -> usize {
        self.shared.state.lock().live_workers
    }

    /// Drop every item that has not started; returns how many were dropped
    pub fn clear_pending(&self) -> usize {
        let mut state = self.shared.state.lock();
        let dropped = self.shared.work_rx.try_iter().count();
        state.queued = state.queued.saturating_sub(dropped);
        self.shared.changed.notify_all();
        dropped
    }

    /// Block until nothing is queued or running. `None` waits forever.
    /// Returns whether the pool drained in time.
    pub fn wait_for_done(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();
        while state.queued + state.running > 0 {
            match deadline {
                Some(deadline) => {
                    if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                        return state.queued + state.running == 0;
                    }
                }
                None => self.shared.changed.wait(&mut state),
            }
        }
        true
    }

    fn spawn_worker(&self, state: &mut PoolState) -> io::Result<()> {
        state.spawned_total += 1;
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.name, state.spawned_total));
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        let shared = Arc::clone(&self.shared);

        match builder.spawn(move || worker_loop(shared)) {
            Ok(_) => {
                state.live_workers += 1;
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn worker thread: {}", e);
                Err(e)
            }
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let work = {
            let mut state = shared.state.lock();
            if state.live_workers > state.max_workers {
                state.live_workers -= 1;
                shared.changed.notify_all();
                return;
            }
            match shared.work_rx.try_recv() {
                Ok(work) => {
                    state.queued = state.queued.saturating_sub(1);
                    state.running += 1;
                    work
                }
                Err(_) => {
                    state.live_workers -= 1;
                    shared.changed.notify_all();
                    return;
                }
            }
        };

        if catch_unwind(AssertUnwindSafe(work)).is_err() {
            error!("Work item panicked in {:?}", thread::current().name());
        }

        let mut state = shared.state.lock();
        state.running -= 1;
        shared.changed.notify_all();
    }
}

/// Worker count from CPU cores, a usage percentage and an optional hard limit (0 = none)
pub fn calculate_optimal_workers(max_threads: usize, thread_percentage: u8) -> usize {
    let cpu_cores = num_cpus::get();
    let by_percentage = std::cmp::max(1, (cpu_cores * thread_percentage as usize) / 100);
    if max_threads > 0 {
        std::cmp::min(max_threads, by_percentage)
    } else {
        by_percentage
    }
}
