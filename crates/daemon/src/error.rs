// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lambda_core::ConfigError;
use lambda_worker::ProvisionError;
use std::net::SocketAddr;
use thiserror::Error;

/// Daemon startup errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("usage: lambdad <config.toml>")]
    Usage,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
