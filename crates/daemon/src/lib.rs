// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lambda-daemon: serves one function over HTTP

pub mod adapter;
pub mod error;
pub mod server;

pub use adapter::Adapter;
pub use error::DaemonError;
pub use server::serve;
