// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lambda-worker: persistent interpreter workers and their pool
//!
//! Invocations travel to a worker as interpreter statements on stdin and come
//! back as marker-delimited lines on stdout, tagged with the request id.

pub mod error;
pub mod executor;
pub mod protocol;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use error::{InvokeError, ProvisionError, SpawnError, TerminateError};
pub use executor::{launch_args, Executor, PYTHON_LAUNCH_ARGS};
pub use protocol::Reply;
pub use worker::{Worker, WorkerState};
