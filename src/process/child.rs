// src/process/child.rs

//! One spawned tool process: pipe setup, output draining with dual timeouts,
//! single-shot exit classification, and tree termination.
//!
//! A `ChildProcess` belongs to exactly one execution attempt and is not safe
//! for concurrent use from multiple threads. It exclusively owns its OS
//! handles until [`ChildProcess::detach`] releases them; dropping it while the
//! child is still running force-kills the whole process tree.

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, warn};

use super::cancel::AbortSignal;
use super::kill_tree;

/// How often the drain loop is forced to turn so abort flags are observed
/// even when no I/O is arriving.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep reading leftover pipe data after the child has exited.
/// Bounded so an orphaned grandchild holding the write end cannot hang the
/// drain.
const POST_EXIT_GRACE: Duration = Duration::from_millis(200);

/// Why a process stopped, as recorded exactly once in the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// No terminal state recorded yet.
    Undefined,
    /// Process exited on its own; the exit code is meaningful.
    Normal,
    /// An abort token was observed before termination.
    Aborted,
    /// The overall wall-clock budget expired.
    Timeout,
    /// The output-inactivity budget expired.
    TimeoutInactive,
}

impl ExitReason {
    /// Stable diagnostic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Undefined => "Undefined",
            ExitReason::Normal => "Normal",
            ExitReason::Aborted => "Aborted",
            ExitReason::Timeout => "Process Timeout",
            ExitReason::TimeoutInactive => "Process Timeout Inactive",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors creating the child. A child that later exits non-zero is not a
/// spawn error.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("abort requested before spawn")]
    Aborted,

    #[error("process already started")]
    AlreadyStarted,

    #[error("failed to spawn '{executable}': {source}")]
    Io {
        executable: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to start one tool process.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub executable: String,
    /// Full argument string; split on whitespace honoring double quotes.
    pub arguments: String,
    /// Working directory; the process's own when `None`.
    pub working_dir: Option<PathBuf>,
    /// Full replacement environment; parent's inherited when `None`.
    pub environment: Option<Vec<(String, String)>>,
    /// When true, no pipes are set up and capture is unavailable; the child
    /// writes straight to the caller's console.
    pub share_parent_handles: bool,
}

impl SpawnRequest {
    pub fn new(executable: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: arguments.into(),
            working_dir: None,
            environment: None,
            share_parent_handles: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ProcState {
    NotStarted,
    Running,
    Terminal { reason: ExitReason, code: i32 },
}

/// A spawned tool process and its lifecycle state machine.
#[derive(Debug)]
pub struct ChildProcess {
    abort: AbortSignal,
    state: ProcState,
    child: Option<Child>,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    detached: bool,
}

impl ChildProcess {
    pub fn new(abort: AbortSignal) -> Self {
        Self {
            abort,
            state: ProcState::NotStarted,
            child: None,
            stdout: None,
            stderr: None,
            detached: false,
        }
    }

    /// Create the child process.
    ///
    /// Checks the abort signal first: a process is never spawned for an
    /// already-cancelled operation; the terminal state becomes `Aborted` and
    /// [`SpawnError::Aborted`] is returned so callers can tell cancellation
    /// from a real spawn failure.
    pub fn spawn(&mut self, req: &SpawnRequest) -> Result<(), SpawnError> {
        if !matches!(self.state, ProcState::NotStarted) {
            return Err(SpawnError::AlreadyStarted);
        }
        if self.abort.check().is_some() {
            self.state = ProcState::Terminal {
                reason: ExitReason::Aborted,
                code: -1,
            };
            return Err(SpawnError::Aborted);
        }

        let mut cmd = Command::new(&req.executable);
        cmd.args(split_command_arguments(&req.arguments));
        if let Some(dir) = &req.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(env) = &req.environment {
            cmd.env_clear();
            cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if req.share_parent_handles {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|source| SpawnError::Io {
            executable: req.executable.clone(),
            source,
        })?;

        self.stdout = child.stdout.take();
        self.stderr = child.stderr.take();
        self.child = Some(child);
        self.state = ProcState::Running;
        Ok(())
    }

    /// Drain stdout and stderr into `out` / `err` until the child has exited
    /// and both streams are closed, or a timeout/abort fires.
    ///
    /// Two independent timers run: the overall timer from call start, and the
    /// inactivity timer reset whenever bytes arrive on either stream. A value
    /// of 0 disables the corresponding timer. On timeout or abort the process
    /// tree is killed, the terminal state is recorded, and the call returns
    /// `false` with whatever output was captured so far.
    ///
    /// Both streams are serviced by one `select!` loop, so a full pipe on one
    /// side can never deadlock the other.
    pub async fn read_all_data(
        &mut self,
        out: &mut Vec<u8>,
        err: &mut Vec<u8>,
        overall_timeout_ms: u64,
        inactivity_timeout_ms: u64,
    ) -> bool {
        if !matches!(self.state, ProcState::Running) {
            return false;
        }
        let Some(mut child) = self.child.take() else {
            return false;
        };
        let mut stdout = self.stdout.take();
        let mut stderr = self.stderr.take();

        let start = Instant::now();
        // Disabled timers park on a far-away deadline; their branches are
        // additionally guarded so they are never polled.
        let far = start + Duration::from_secs(86_400 * 365);
        let overall_deadline = if overall_timeout_ms > 0 {
            start + Duration::from_millis(overall_timeout_ms)
        } else {
            far
        };
        let inactivity = (inactivity_timeout_ms > 0)
            .then(|| Duration::from_millis(inactivity_timeout_ms));
        let mut last_activity = start;

        let mut obuf = [0u8; 4096];
        let mut ebuf = [0u8; 4096];
        let mut exited = false;
        let mut exit_code = -1;

        let completed = loop {
            if let Some(cause) = self.abort.check() {
                debug!(%cause, "abort observed while draining process output");
                kill_and_reap(&mut child, exited).await;
                self.state = ProcState::Terminal {
                    reason: ExitReason::Aborted,
                    code: -1,
                };
                break false;
            }
            if exited && stdout.is_none() && stderr.is_none() {
                break true;
            }

            let inactivity_deadline = inactivity.map_or(far, |d| last_activity + d);

            tokio::select! {
                res = read_some(stdout.as_mut(), &mut obuf) => {
                    match res {
                        Ok(0) | Err(_) => stdout = None,
                        Ok(n) => {
                            out.extend_from_slice(&obuf[..n]);
                            last_activity = Instant::now();
                        }
                    }
                }
                res = read_some(stderr.as_mut(), &mut ebuf) => {
                    match res {
                        Ok(0) | Err(_) => stderr = None,
                        Ok(n) => {
                            err.extend_from_slice(&ebuf[..n]);
                            last_activity = Instant::now();
                        }
                    }
                }
                status = wait_some(&mut child, exited) => {
                    exited = true;
                    match status {
                        Ok(st) => exit_code = st.code().unwrap_or(-1),
                        Err(e) => warn!(error = %e, "waiting on child failed"),
                    }
                    // The child is gone; whatever is left in the pipes is
                    // bounded unless an orphan holds the write end, so the
                    // final drain uses a short grace window.
                    drain_remaining(&mut stdout, out).await;
                    drain_remaining(&mut stderr, err).await;
                }
                _ = sleep_until(overall_deadline), if overall_timeout_ms > 0 => {
                    kill_and_reap(&mut child, exited).await;
                    self.state = ProcState::Terminal {
                        reason: ExitReason::Timeout,
                        code: -1,
                    };
                    break false;
                }
                _ = sleep_until(inactivity_deadline), if inactivity.is_some() => {
                    kill_and_reap(&mut child, exited).await;
                    self.state = ProcState::Terminal {
                        reason: ExitReason::TimeoutInactive,
                        code: -1,
                    };
                    break false;
                }
                _ = sleep(ABORT_POLL_INTERVAL) => {}
            }
        };

        if completed {
            self.state = ProcState::Terminal {
                reason: ExitReason::Normal,
                code: exit_code,
            };
        }
        self.stdout = stdout;
        self.stderr = stderr;
        self.child = Some(child);
        completed
    }

    /// Block until the child has terminated and return its classification.
    ///
    /// The first call records the terminal state; every later call returns
    /// the cached value without re-querying the OS. The exit code is
    /// meaningful only for [`ExitReason::Normal`].
    pub async fn wait_for_exit(&mut self) -> (ExitReason, i32) {
        if let ProcState::Terminal { reason, code } = self.state {
            return (reason, code);
        }
        let Some(child) = self.child.as_mut() else {
            return (ExitReason::Undefined, -1);
        };
        let code = match child.wait().await {
            Ok(st) => st.code().unwrap_or(-1),
            Err(e) => {
                warn!(error = %e, "waiting on child failed");
                -1
            }
        };
        self.state = ProcState::Terminal {
            reason: ExitReason::Normal,
            code,
        };
        (ExitReason::Normal, code)
    }

    /// Forcibly terminate the child and all of its descendants.
    pub fn kill_process_tree(&mut self) {
        if let Some(pid) = self.child.as_ref().and_then(|c| c.id()) {
            kill_tree::kill_process_tree(pid);
        }
    }

    /// Release all handles without terminating the child. The object may be
    /// dropped afterwards without affecting the process.
    pub fn detach(&mut self) {
        self.detached = true;
        self.child = None;
        self.stdout = None;
        self.stderr = None;
    }

    /// Whether the child is still alive. Queries the OS when no terminal
    /// state is recorded yet, caching a normal exit if one is observed.
    pub fn is_running(&mut self) -> bool {
        if !matches!(self.state, ProcState::Running) {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(st)) => {
                self.state = ProcState::Terminal {
                    reason: ExitReason::Normal,
                    code: st.code().unwrap_or(-1),
                };
                false
            }
            Ok(None) => true,
            Err(_) => true,
        }
    }

    /// OS process id of the child, while a handle is held and the child has
    /// not been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// True only when the terminal state is `Aborted`.
    pub fn has_aborted(&self) -> bool {
        matches!(
            self.state,
            ProcState::Terminal {
                reason: ExitReason::Aborted,
                ..
            }
        )
    }

    /// The recorded exit reason, `Undefined` until a terminal state exists.
    pub fn exit_reason(&self) -> ExitReason {
        match self.state {
            ProcState::Terminal { reason, .. } => reason,
            _ => ExitReason::Undefined,
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.detached || !matches!(self.state, ProcState::Running) {
            return;
        }
        if let Some(pid) = self.child.as_ref().and_then(|c| c.id()) {
            kill_tree::kill_process_tree(pid);
        }
    }
}

/// Split a command line into arguments on whitespace, honoring double quotes
/// (quotes group and are stripped).
pub fn split_command_arguments(cmdline: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;
    for ch in cmdline.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

async fn read_some<R: AsyncRead + Unpin>(
    stream: Option<&mut R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stream {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn wait_some(child: &mut Child, already_exited: bool) -> std::io::Result<ExitStatus> {
    if already_exited {
        std::future::pending().await
    } else {
        child.wait().await
    }
}

async fn drain_remaining<R: AsyncRead + Unpin>(stream: &mut Option<R>, buf_out: &mut Vec<u8>) {
    let Some(r) = stream.as_mut() else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match timeout(POST_EXIT_GRACE, r.read(&mut chunk)).await {
            Ok(Ok(n)) if n > 0 => buf_out.extend_from_slice(&chunk[..n]),
            _ => break,
        }
    }
    *stream = None;
}

async fn kill_and_reap(child: &mut Child, already_exited: bool) {
    if let Some(pid) = child.id() {
        kill_tree::kill_process_tree(pid);
    }
    if !already_exited {
        let _ = child.wait().await;
    }
}
