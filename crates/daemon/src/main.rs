// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lambda Daemon (lambdad)
//!
//! Serves one function over HTTP from a pool of persistent interpreters.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use lambda_core::ServerConfig;
use lambda_daemon::{serve, Adapter, DaemonError};
use lambda_worker::Executor;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = setup_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            eprintln!("lambdad: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DaemonError> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(DaemonError::Usage)?;

    let config = ServerConfig::load(&config_path)?;
    info!("Starting lambdad with config: {}", config_path.display());

    let executor = Arc::new(Executor::provision(&config.function)?);

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(source) => {
            executor.teardown().await;
            return Err(DaemonError::Bind {
                addr: config.listen,
                source,
            });
        }
    };
    let addr = listener.local_addr()?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let lambda_name = config.function.name.clone();
    let adapter = Arc::new(Adapter::new(config.function, Arc::clone(&executor)));

    info!(%addr, lambda_name = %lambda_name, "Daemon ready");

    // Signal ready for the parent process, with the bound address
    println!("READY {addr}");

    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };
    serve(listener, adapter, config.max_body_bytes, shutdown).await;

    let failures = executor.teardown().await;
    if failures > 0 {
        warn!(failures, "some workers could not be terminated");
    }

    info!("Daemon stopped");
    Ok(())
}

/// Log to stderr through a non-blocking writer. `RUST_LOG` overrides the
/// default `info` filter.
fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}
