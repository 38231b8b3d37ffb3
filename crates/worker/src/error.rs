// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for workers and the worker pool

use thiserror::Error;

/// Errors starting an interpreter process
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind interpreter {0}")]
    MissingPipe(&'static str),
}

/// Errors provisioning a worker pool
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed starting lambda {name} worker {id}: {source}")]
    Spawn {
        name: String,
        id: u32,
        #[source]
        source: SpawnError,
    },
}

/// Hard invocation failures. Callers answer these with a 500.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write to worker {id}: {source}")]
    Write {
        id: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("worker {id} output closed before the reply completed")]
    Closed { id: u32 },
    #[error("worker {id} is terminated")]
    Terminated { id: u32 },
}

/// Errors stopping an interpreter process
#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("failed to kill worker {id}: {source}")]
    Kill {
        id: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for worker {id}: {source}")]
    Wait {
        id: u32,
        #[source]
        source: std::io::Error,
    },
}
