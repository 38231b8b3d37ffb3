// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool for one function

use crate::error::{InvokeError, ProvisionError};
use crate::protocol::{self, Reply};
use crate::worker::Worker;
use http::StatusCode;
use lambda_core::{FunctionConfig, InvocationEvent, Runtime};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Interactive, quiet, unbuffered interpreter session
pub const PYTHON_LAUNCH_ARGS: &[&str] = &["-i", "-q", "-u"];

/// Launch flags for an interpreter of `runtime`
pub fn launch_args(runtime: Runtime) -> &'static [&'static str] {
    match runtime {
        Runtime::Python => PYTHON_LAUNCH_ARGS,
    }
}

/// Owns the workers serving one function.
///
/// The worker collection is fixed at provisioning; only per-worker state
/// changes afterwards.
pub struct Executor {
    name: String,
    module: String,
    handler: String,
    dispatch_timeout: Duration,
    workers: Vec<Worker>,
    freed: Arc<Notify>,
}

impl Executor {
    /// Spawn `config.workers` interpreters for the configured function.
    ///
    /// Fails on the first worker that cannot be started; workers spawned
    /// before it are killed.
    pub fn provision(config: &FunctionConfig) -> Result<Self, ProvisionError> {
        Self::provision_with(
            config,
            &config.python_executable,
            launch_args(config.runtime),
        )
    }

    /// Like [`Executor::provision`], launching `program args` instead of the
    /// configured interpreter
    pub fn provision_with(
        config: &FunctionConfig,
        program: impl AsRef<OsStr>,
        args: &[&str],
    ) -> Result<Self, ProvisionError> {
        let program = program.as_ref();
        let freed = Arc::new(Notify::new());
        let mut workers = Vec::new();

        for id in 0..config.workers {
            let worker = Worker::spawn(
                id,
                program,
                args,
                config.worker_timeout,
                config.working_dir.as_deref(),
            )
            .map_err(|source| ProvisionError::Spawn {
                name: config.name.clone(),
                id,
                source,
            })?;
            workers.push(worker.with_free_signal(Arc::clone(&freed)));
        }

        tracing::info!(
            lambda_name = %config.name,
            workers = workers.len(),
            "started lambda runtime"
        );

        Ok(Self {
            name: config.name.clone(),
            module: config.entrypoint_module(),
            handler: config.function.clone(),
            dispatch_timeout: config.dispatch_timeout,
            workers,
            freed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Run `event` on the first free worker.
    ///
    /// While every live worker is busy, waits for one to free up, at most
    /// the dispatch timeout. Answers `503 Service Unavailable` when no
    /// worker is alive or the wait runs out.
    pub async fn dispatch(&self, event: &InvocationEvent) -> Result<Reply, InvokeError> {
        let deadline = protocol::deadline_after(self.dispatch_timeout);

        loop {
            let mut alive = 0;
            for worker in &self.workers {
                if worker.is_terminated() {
                    continue;
                }
                alive += 1;
                if worker.is_busy() {
                    continue;
                }
                if let Some(result) = worker.try_handle(&self.module, &self.handler, event).await {
                    return result;
                }
            }

            if alive == 0 {
                tracing::debug!(
                    lambda_name = %self.name,
                    request_id = %event.request_id,
                    "no live workers"
                );
                return Ok(Reply::canonical(StatusCode::SERVICE_UNAVAILABLE));
            }

            if tokio::time::timeout_at(deadline, self.freed.notified())
                .await
                .is_err()
            {
                tracing::info!(
                    lambda_name = %self.name,
                    request_id = %event.request_id,
                    busy = alive,
                    "no worker became free"
                );
                return Ok(Reply::canonical(StatusCode::SERVICE_UNAVAILABLE));
            }
        }
    }

    /// Terminate every worker. Failures are logged and counted, never
    /// stopping the remaining workers from being terminated.
    pub async fn teardown(&self) -> usize {
        let mut failures = 0;
        for worker in &self.workers {
            if let Err(e) = worker.terminate().await {
                failures += 1;
                tracing::warn!(
                    lambda_name = %self.name,
                    worker_id = worker.id(),
                    error = %e,
                    "failed to terminate worker"
                );
            }
        }
        // Waiting dispatchers rescan and find nothing alive
        self.freed.notify_waiters();

        tracing::info!(
            lambda_name = %self.name,
            failures,
            "completed shutdown of lambda runtime"
        );
        failures
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
