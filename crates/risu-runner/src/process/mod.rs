//! Bounded child-process execution with full output capture.
//!
//! [`ProcessExecutor`] implements the [`CommandExecutor`] trait by spawning
//! the command with stdout and stderr piped, draining both pipes on helper
//! threads so a verbose child never stalls on a full buffer, and polling for
//! exit until the wall-clock bound elapses. On timeout the child (and, on
//! Unix, its whole process group) is killed and reaped before the error is
//! returned.
//!
//! The bound also covers output capture. Once the child exits, anything left
//! in its process group is killed so background helpers cannot hold the pipes
//! open, and the drained output is awaited only until the bound elapses.
//!
//! The executor never interprets the return code; that is left to the
//! orchestrator.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::command::CommandLine;

/// Tracing target for process operations.
const PROCESS_TARGET: &str = "risu_runner::process";

/// Interval between exit polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Environment variable disabling output buffering in the Python-based tool.
const UNBUFFERED_ENV: (&str, &str) = ("PYTHONUNBUFFERED", "1");

/// Captured outcome of one child-process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    rc: i32,
    stdout: String,
    stderr: String,
    elapsed: Duration,
}

impl ExecutionResult {
    /// Creates an execution result.
    #[must_use]
    pub fn new(
        rc: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            rc,
            stdout: stdout.into(),
            stderr: stderr.into(),
            elapsed,
        }
    }

    /// Return code, or `-1` when the child was terminated by a signal.
    #[must_use]
    pub const fn rc(&self) -> i32 {
        self.rc
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        self.stdout.as_str()
    }

    /// Captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        self.stderr.as_str()
    }

    /// Wall-clock time between spawn and exit.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns whether the child exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.rc == 0
    }
}

/// Failures while launching or observing a child process.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The process could not be spawned.
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Waiting on the process failed.
    #[error("failed to wait for {}: {source}", .program.display())]
    Wait {
        /// Program being observed.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading one of the output pipes failed.
    #[error("failed to capture {stream} of {}: {source}", .program.display())]
    Capture {
        /// Program being observed.
        program: PathBuf,
        /// Either `stdout` or `stderr`.
        stream: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The process exceeded its bound and was killed.
    #[error("{} did not finish within {timeout_secs}s", .program.display())]
    TimedOut {
        /// Program that was killed.
        program: PathBuf,
        /// Bound that elapsed, in seconds.
        timeout_secs: u64,
    },
}

/// Trait abstracting child-process execution for testability.
///
/// The production implementation is [`ProcessExecutor`]. Test code can
/// implement this trait to return canned results without spawning anything.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use risu_runner::{CommandExecutor, CommandLine, ExecutionResult, ProcessError};
///
/// struct CannedExecutor;
///
/// impl CommandExecutor for CannedExecutor {
///     fn execute(
///         &self,
///         _command: &CommandLine,
///         _timeout: Duration,
///     ) -> Result<ExecutionResult, ProcessError> {
///         Ok(ExecutionResult::new(0, "RISU 3.1.4\n", "", Duration::ZERO))
///     }
/// }
/// ```
pub trait CommandExecutor {
    /// Runs `command` to completion or until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::TimedOut`] when the bound elapses, or another
    /// [`ProcessError`] when the process cannot be launched or observed.
    fn execute(
        &self,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<ExecutionResult, ProcessError>;
}

/// Executes commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn execute(
        &self,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<ExecutionResult, ProcessError> {
        run_with_timeout(command, timeout)
    }
}

fn run_with_timeout(
    command: &CommandLine,
    timeout: Duration,
) -> Result<ExecutionResult, ProcessError> {
    let program = command.program();

    debug!(
        target: PROCESS_TARGET,
        program = %program.display(),
        args = ?command.args(),
        timeout_secs = timeout.as_secs(),
        "spawning child process"
    );

    let start = Instant::now();
    let mut child = spawn(command)?;
    let pid = child.id();
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let status = wait_with_deadline(program, &mut child, start, timeout)?;
    let elapsed = start.elapsed();
    kill_group(pid);

    let stdout = collect(program, "stdout", stdout_reader, start, timeout)?;
    let stderr = collect(program, "stderr", stderr_reader, start, timeout)?;
    let rc = status.code().unwrap_or(-1);

    debug!(
        target: PROCESS_TARGET,
        program = %program.display(),
        rc,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "child process exited"
    );

    Ok(ExecutionResult {
        rc,
        stdout,
        stderr,
        elapsed,
    })
}

fn spawn(command: &CommandLine) -> Result<Child, ProcessError> {
    let mut process = Command::new(command.program());
    process
        .args(command.args())
        .env(UNBUFFERED_ENV.0, UNBUFFERED_ENV.1)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // A dedicated process group lets a timeout take down the plugins RISU
    // spawned along with RISU itself.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        process.process_group(0);
    }

    process.spawn().map_err(|err| ProcessError::Spawn {
        program: command.program().to_path_buf(),
        source: Arc::new(err),
    })
}

type Drain = Option<Receiver<std::io::Result<String>>>;

/// Reads a pipe to EOF on a helper thread, handing the text back over a
/// channel.
fn drain(pipe: Option<impl Read + Send + 'static>) -> Drain {
    pipe.map(|mut reader| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let outcome = reader
                .read_to_end(&mut buffer)
                .map(|_| String::from_utf8_lossy(&buffer).into_owned());
            drop(sender.send(outcome));
        });
        receiver
    })
}

/// Waits for a drained pipe until `timeout` has elapsed since `start`.
///
/// A pipe still held open by a process outside the child's group outlives
/// the bound; its reader thread is abandoned and the run times out.
fn collect(
    program: &Path,
    stream: &'static str,
    drain: Drain,
    start: Instant,
    timeout: Duration,
) -> Result<String, ProcessError> {
    let Some(receiver) = drain else {
        return Ok(String::new());
    };
    let capture_error = |source: std::io::Error| ProcessError::Capture {
        program: program.to_path_buf(),
        stream,
        source: Arc::new(source),
    };
    let remaining = timeout.saturating_sub(start.elapsed()).max(POLL_INTERVAL);
    match receiver.recv_timeout(remaining) {
        Ok(outcome) => outcome.map_err(capture_error),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                target: PROCESS_TARGET,
                program = %program.display(),
                stream,
                timeout_secs = timeout.as_secs(),
                "output pipe still open when the bound elapsed"
            );
            Err(ProcessError::TimedOut {
                program: program.to_path_buf(),
                timeout_secs: timeout.as_secs(),
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(capture_error(std::io::Error::other(
            "reader thread exited without output",
        ))),
    }
}

/// Waits for the child to exit, killing it once `timeout` has elapsed.
fn wait_with_deadline(
    program: &Path,
    child: &mut Child,
    start: Instant,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        program = %program.display(),
                        timeout_secs = timeout.as_secs(),
                        "child process timed out, killing it"
                    );
                    terminate(child);
                    return Err(ProcessError::TimedOut {
                        program: program.to_path_buf(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL.min(timeout.saturating_sub(elapsed)));
            }
            Err(err) => {
                terminate(child);
                return Err(ProcessError::Wait {
                    program: program.to_path_buf(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

/// Kills the child and its process group, then reaps it.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    drop(child.kill());
    drop(child.wait());
}

/// Sends `SIGKILL` to the process group led by `pid`.
///
/// The group outlives its leader while any member is alive; once it is empty
/// the signal fails with `ESRCH`, which is ignored.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(raw) = i32::try_from(pid) {
        drop(killpg(Pid::from_raw(raw), Signal::SIGKILL));
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
