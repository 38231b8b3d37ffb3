// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker: one persistent interpreter process
//!
//! ```text
//! spawned → free ⇄ busy → terminated
//! ```
//!
//! `terminated` is absorbing. It is reached through [`Worker::terminate`] or
//! when the interpreter's stdout reaches end-of-file.

use crate::error::{InvokeError, SpawnError, TerminateError};
use crate::protocol::{self, Decoded, Reply};
use http::StatusCode;
use lambda_core::InvocationEvent;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex, MutexGuard, Notify};

/// Observable worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Free,
    Busy,
    Terminated,
}

/// Interpreter session state, guarded by the invocation lock
struct Session {
    stdin: ChildStdin,
    lines: mpsc::UnboundedReceiver<String>,
    bootstrapped: bool,
}

/// A persistent interpreter process serving one invocation at a time
pub struct Worker {
    id: u32,
    pid: Option<u32>,
    timeout: Duration,
    busy: AtomicBool,
    terminated: Arc<AtomicBool>,
    session: Mutex<Session>,
    child: Mutex<Child>,
    freed: Arc<Notify>,
}

impl Worker {
    /// Start `program` with `args` and bind its standard streams.
    ///
    /// Must be called within a Tokio runtime. The process is killed when the
    /// worker is dropped.
    pub fn spawn(
        id: u32,
        program: impl AsRef<OsStr>,
        args: &[&str],
        timeout: Duration,
        working_dir: Option<&Path>,
    ) -> Result<Self, SpawnError> {
        let program = program.as_ref();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| SpawnError::Start {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or(SpawnError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(SpawnError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(SpawnError::MissingPipe("stderr"))?;
        let pid = child.id();

        let terminated = Arc::new(AtomicBool::new(false));
        let (tx, lines) = mpsc::unbounded_channel();

        let closed = Arc::clone(&terminated);
        tokio::spawn(async move {
            read_lines(BufReader::new(stdout), |line| tx.send(line).is_ok()).await;
            if closed.swap(true, Ordering::SeqCst) {
                tracing::debug!(worker_id = id, "interpreter output closed");
            } else {
                tracing::warn!(worker_id = id, "interpreter exited unexpectedly");
            }
        });

        tokio::spawn(async move {
            read_lines(BufReader::new(stderr), |line| {
                let line = strip_prompts(&line);
                if !line.is_empty() {
                    tracing::debug!(worker_id = id, line, "interpreter stderr");
                }
                true
            })
            .await;
        });

        tracing::info!(
            worker_id = id,
            pid,
            program = %program.to_string_lossy(),
            "started worker"
        );

        Ok(Self {
            id,
            pid,
            timeout,
            busy: AtomicBool::new(false),
            terminated,
            session: Mutex::new(Session {
                stdin,
                lines,
                bootstrapped: false,
            }),
            child: Mutex::new(child),
            freed: Arc::new(Notify::new()),
        })
    }

    /// Signal `freed` whenever this worker finishes an invocation
    pub(crate) fn with_free_signal(mut self, freed: Arc<Notify>) -> Self {
        self.freed = freed;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> WorkerState {
        if self.is_terminated() {
            WorkerState::Terminated
        } else if self.is_busy() {
            WorkerState::Busy
        } else {
            WorkerState::Free
        }
    }

    /// Invoke `handler` from `module` with `event`, waiting for the worker
    /// to be free.
    ///
    /// A timeout is not an error: it yields a `408 Request Timeout` reply.
    pub async fn handle(
        &self,
        module: &str,
        handler: &str,
        event: &InvocationEvent,
    ) -> Result<Reply, InvokeError> {
        if self.is_terminated() {
            return Err(InvokeError::Terminated { id: self.id });
        }
        let session = self.session.lock().await;
        self.invoke(self.claim(session), module, handler, event)
            .await
    }

    /// Like [`Worker::handle`], but returns `None` right away if the worker is
    /// busy or terminated.
    pub async fn try_handle(
        &self,
        module: &str,
        handler: &str,
        event: &InvocationEvent,
    ) -> Option<Result<Reply, InvokeError>> {
        if self.is_terminated() {
            return None;
        }
        let session = self.session.try_lock().ok()?;
        Some(
            self.invoke(self.claim(session), module, handler, event)
                .await,
        )
    }

    fn claim<'a>(&'a self, session: MutexGuard<'a, Session>) -> Claim<'a> {
        self.busy.store(true, Ordering::SeqCst);
        Claim {
            worker: self,
            session: Some(session),
        }
    }

    async fn invoke(
        &self,
        mut claim: Claim<'_>,
        module: &str,
        handler: &str,
        event: &InvocationEvent,
    ) -> Result<Reply, InvokeError> {
        let Some(session) = claim.session.as_mut() else {
            return Err(InvokeError::Terminated { id: self.id });
        };
        let request_id = event.request_id.as_str();
        let started = Instant::now();

        let call = protocol::encode_call(handler, request_id, event)?;
        let mut script = String::new();
        if !session.bootstrapped {
            tracing::debug!(worker_id = self.id, module, "bootstrapping interpreter");
            script.push_str(&protocol::bootstrap(module));
        }
        script.push_str(&call);

        let write = async {
            session.stdin.write_all(script.as_bytes()).await?;
            session.stdin.flush().await
        };
        write.await.map_err(|source| InvokeError::Write {
            id: self.id,
            source,
        })?;
        session.bootstrapped = true;

        tracing::debug!(worker_id = self.id, request_id, "invocation sent");

        match protocol::read_reply(&mut session.lines, request_id, self.timeout).await {
            Decoded::Reply(reply) => {
                tracing::debug!(
                    worker_id = self.id,
                    request_id,
                    status = reply.status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "invocation completed"
                );
                Ok(reply)
            }
            Decoded::TimedOut => {
                tracing::info!(
                    worker_id = self.id,
                    request_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "invocation timed out"
                );
                Ok(Reply::canonical(StatusCode::REQUEST_TIMEOUT))
            }
            Decoded::Closed => {
                self.terminated.store(true, Ordering::SeqCst);
                Err(InvokeError::Closed { id: self.id })
            }
        }
    }

    /// Kill the interpreter and wait for it to exit.
    ///
    /// The worker is marked terminated before the kill so dispatch stops
    /// selecting it immediately. A process already gone is not an error.
    pub async fn terminate(&self) -> Result<(), TerminateError> {
        self.terminated.store(true, Ordering::SeqCst);
        let mut child = self.child.lock().await;

        let exited = child.try_wait().map_err(|source| TerminateError::Wait {
            id: self.id,
            source,
        })?;
        if let Some(status) = exited {
            tracing::debug!(worker_id = self.id, %status, "worker already exited");
            return Ok(());
        }

        tracing::info!(worker_id = self.id, pid = self.pid, "terminating worker");
        child.start_kill().map_err(|source| TerminateError::Kill {
            id: self.id,
            source,
        })?;
        // Killed by signal is the expected exit status here
        let status = child.wait().await.map_err(|source| TerminateError::Wait {
            id: self.id,
            source,
        })?;
        tracing::info!(worker_id = self.id, %status, "worker terminated");
        Ok(())
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .finish()
    }
}

/// Exclusive hold on a worker for one invocation.
///
/// Dropping it clears busy, releases the session lock, then wakes one
/// dispatcher waiting for a free worker.
struct Claim<'a> {
    worker: &'a Worker,
    session: Option<MutexGuard<'a, Session>>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.worker.busy.store(false, Ordering::SeqCst);
        drop(self.session.take());
        self.worker.freed.notify_one();
    }
}

/// Feed lines to `on_line` until EOF, a read error, or `on_line` returns
/// false. Invalid UTF-8 is replaced rather than ending the stream.
async fn read_lines<R, F>(mut reader: R, mut on_line: F)
where
    R: AsyncBufRead + Unpin,
    F: FnMut(String) -> bool,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if !on_line(line.to_string()) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read interpreter output");
                break;
            }
        }
    }
}

/// Strip interactive prompts (`>>> `, `... `), which carry no newline and
/// pile up at the start of the next stderr line
fn strip_prompts(mut line: &str) -> &str {
    loop {
        let stripped = line
            .strip_prefix(">>> ")
            .or_else(|| line.strip_prefix("... "));
        match stripped {
            Some(rest) => line = rest,
            None => return line.trim_end(),
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
