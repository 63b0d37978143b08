// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised execution of one external process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::capture::{RingBuffer, CAPTURE_CAP};
use crate::command::CommandPolicy;
use crate::error::RunnerError;

/// Grace window between SIGTERM and SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// One external command invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Full argument vector; `argv[0]` must pass the policy.
    pub argv: Vec<String>,
    /// Bytes written to the child's stdin, then closed.
    pub stdin: Option<Vec<u8>>,
    pub cwd: PathBuf,
    /// Extra environment entries layered over the inherited environment.
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
    /// Cancellation propagated from the owning job.
    pub cancel: CancellationToken,
}

impl RunRequest {
    pub fn new(argv: Vec<String>, cwd: PathBuf, timeout: Duration) -> Self {
        Self { argv, stdin: None, cwd, env: Vec::new(), timeout, cancel: CancellationToken::new() }
    }

    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// What happened, always — the runner never fails silently after spawn.
#[derive(Debug)]
pub struct RunOutcome {
    /// Exit code; signal terminations map to `128 + signo`.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub cancelled: bool,
    pub timed_out: bool,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.cancelled && !self.timed_out
    }
}

/// Execute `req` under `policy`.
///
/// Errors only on precondition violations (empty argv, command not
/// allow-listed, unspawnable executable); every post-spawn condition is
/// reported in the returned [`RunOutcome`].
pub async fn run(policy: &CommandPolicy, req: RunRequest) -> Result<RunOutcome, RunnerError> {
    let program = req.argv.first().ok_or(RunnerError::EmptyArgv)?.clone();
    if !policy.allows(&program) {
        return Err(RunnerError::CommandNotAllowed(program));
    }

    tracing::debug!(cmd = %program, args = ?&req.argv[1..], "spawning process");
    let start = Instant::now();

    let mut command = tokio::process::Command::new(&program);
    command
        .args(&req.argv[1..])
        .current_dir(&req.cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if req.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .kill_on_drop(true)
        .process_group(0);
    for (key, value) in &req.env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|source| RunnerError::SpawnFailed { command: program.clone(), source })?;

    if let Some(data) = req.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading; a broken pipe is not fatal.
            let _ = stdin.write_all(&data).await;
            drop(stdin);
        }
    }

    let stdout_task = child.stdout.take().map(|pipe| spawn_reader(pipe));
    let stderr_task = child.stderr.take().map(|pipe| spawn_reader(pipe));

    let mut timed_out = false;
    let mut cancelled = false;
    let status = tokio::select! {
        status = child.wait() => {
            status.map_err(|source| RunnerError::Io { command: program.clone(), source })?
        }
        _ = tokio::time::sleep(req.timeout) => {
            timed_out = true;
            terminate(&mut child, &program).await?
        }
        _ = req.cancel.cancelled() => {
            cancelled = true;
            terminate(&mut child, &program).await?
        }
    };

    let stdout = collect(stdout_task).await;
    let stderr = collect(stderr_task).await;

    let exit_code = exit_code_of(status);
    let duration = start.elapsed();
    if timed_out || cancelled {
        tracing::warn!(cmd = %program, timed_out, cancelled, "process terminated early");
    } else {
        tracing::debug!(
            cmd = %program,
            exit_code,
            duration_ms = duration.as_millis() as u64,
            "process finished"
        );
    }

    Ok(RunOutcome { exit_code, stdout, stderr, duration, cancelled, timed_out })
}

/// SIGTERM to the process group, wait out the grace window, then SIGKILL.
async fn terminate(
    child: &mut Child,
    program: &str,
) -> Result<std::process::ExitStatus, RunnerError> {
    if let Some(pid) = child.id() {
        let pgid = Pid::from_raw(pid as i32);
        let _ = killpg(pgid, Signal::SIGTERM);
        let graceful = tokio::time::timeout(KILL_GRACE, child.wait()).await;
        if let Ok(status) = graceful {
            return status.map_err(|source| RunnerError::Io {
                command: program.to_string(),
                source,
            });
        }
        let _ = killpg(pgid, Signal::SIGKILL);
    }
    child
        .wait()
        .await
        .map_err(|source| RunnerError::Io { command: program.to_string(), source })
}

fn spawn_reader<R>(mut pipe: R) -> tokio::task::JoinHandle<RingBuffer>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = RingBuffer::new(CAPTURE_CAP);
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.push(&chunk[..n]),
            }
        }
        buf
    })
}

async fn collect(task: Option<tokio::task::JoinHandle<RingBuffer>>) -> String {
    match task {
        Some(handle) => handle.await.unwrap_or_default().into_string(),
        None => String::new(),
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
