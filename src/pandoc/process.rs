//! Subprocess execution with a deadline

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// How a deadline-bound run ended
#[derive(Debug)]
pub enum ProcessResult {
    Exited(ProcessOutput),
    /// Child was killed once the deadline passed
    TimedOut { elapsed: Duration },
}

/// Run `program args…` capturing stdout/stderr as text, killing it after `timeout`
pub fn run_with_timeout<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    timeout: Duration,
) -> std::io::Result<ProcessResult> {
    let started = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes concurrently so a chatty child never blocks on a full buffer
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = started + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    match status {
        Some(status) => Ok(ProcessResult::Exited(ProcessOutput {
            status,
            stdout: join_reader(stdout_reader),
            stderr: join_reader(stderr_reader),
            elapsed: started.elapsed(),
        })),
        None => {
            kill_quietly(&mut child);
            // Grandchildren may still hold the pipes open; leave the readers detached
            drop(stdout_reader);
            drop(stderr_reader);
            Ok(ProcessResult::TimedOut { elapsed: started.elapsed() })
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill_quietly(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("Failed to kill timed out process {}: {}", child.id(), e);
    }
    let _ = child.wait();
}
