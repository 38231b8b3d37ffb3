// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lambda-core: shared model for the lambda function executor
//!
//! This crate provides:
//! - Function and server configuration, validated from TOML
//! - The invocation event handed to functions
//! - Request identifiers

pub mod config;
pub mod event;
pub mod request_id;

pub use config::{
    entrypoint_module, ConfigError, FunctionConfig, Runtime, ServerConfig,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_PYTHON_EXECUTABLE, DEFAULT_WORKER_TIMEOUT, MAX_TIMEOUT,
};
pub use event::{Cookie, InvocationEvent, OneOrMany};
pub use request_id::{IdSource, NumberedIds, RandomIds, RequestId};
