// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function and server configuration
//!
//! A config file holds the listen address and one `[function]` table. The
//! table is validated into a [`FunctionConfig`], which the worker pool
//! consumes read-only.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Interpreter used when `python_executable` is not set
pub const DEFAULT_PYTHON_EXECUTABLE: &str = "python";

/// Per-invocation timeout applied when `worker_timeout` is unset or below 1
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest accepted `worker_timeout` / `dispatch_timeout`; larger values are clamped
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Largest request body the daemon accepts when `max_body_bytes` is not set
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Address the daemon listens on when `listen` is not set
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid listen address {0:?}")]
    InvalidListen(String),
    #[error("lambda runtime is not set")]
    MissingRuntime,
    #[error("unsupported lambda runtime {0:?}")]
    UnsupportedRuntime(String),
    #[error("lambda name is not set")]
    MissingName,
    #[error("{name} lambda {runtime} runtime entrypoint path is not set")]
    MissingEntrypoint { name: String, runtime: Runtime },
    #[error("{name} lambda {runtime} runtime entrypoint function is not set")]
    MissingFunction { name: String, runtime: Runtime },
    #[error("failed to compile uri_filter {pattern}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Supported function runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Python,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Python => "python",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(ConfigError::MissingRuntime),
            "python" => Ok(Runtime::Python),
            other => Err(ConfigError::UnsupportedRuntime(other.to_string())),
        }
    }
}

/// Validated configuration of one function and its worker pool
#[derive(Debug, Clone)]
pub struct FunctionConfig {
    pub name: String,
    pub runtime: Runtime,
    /// Interpreter executable launched once per worker
    pub python_executable: PathBuf,
    /// Source path of the entrypoint, e.g. `app/index.py`
    pub entrypoint: String,
    /// Handler invoked inside the interpreter
    pub function: String,
    pub workers: u32,
    pub worker_timeout: Duration,
    /// Upper bound on how long a dispatch waits for a busy pool
    pub dispatch_timeout: Duration,
    pub uri_filter: Option<Regex>,
    /// Working directory of the interpreter processes
    pub working_dir: Option<PathBuf>,
}

impl FunctionConfig {
    /// Python function with a single worker and default timeouts
    pub fn new(
        name: impl Into<String>,
        entrypoint: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            runtime: Runtime::Python,
            python_executable: PathBuf::from(DEFAULT_PYTHON_EXECUTABLE),
            entrypoint: entrypoint.into(),
            function: function.into(),
            workers: 1,
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
            dispatch_timeout: DEFAULT_WORKER_TIMEOUT,
            uri_filter: None,
            working_dir: None,
        }
    }

    /// Import-style module identifier of the entrypoint
    pub fn entrypoint_module(&self) -> String {
        entrypoint_module(&self.entrypoint)
    }

    /// Whether a request URI should be routed to this function.
    ///
    /// Without a filter every URI matches.
    pub fn matches_uri(&self, request_uri: &str) -> bool {
        self.uri_filter
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(request_uri))
    }
}

/// Convert an entrypoint path into a dotted module identifier.
///
/// `assets/scripts/app/index.py` becomes `assets.scripts.app.index`.
pub fn entrypoint_module(path: &str) -> String {
    let path = path.trim_start_matches("./");
    let path = path.strip_suffix(".py").unwrap_or(path);
    path.replace(['/', '\\'], ".")
}

/// Raw `[function]` table as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionTable {
    name: Option<String>,
    runtime: Option<String>,
    python_executable: Option<String>,
    entrypoint: Option<String>,
    function: Option<String>,
    workers: Option<u32>,
    worker_timeout: Option<i64>,
    dispatch_timeout: Option<i64>,
    uri_filter: Option<String>,
    working_dir: Option<PathBuf>,
}

/// Raw config file layout
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerTable {
    listen: Option<String>,
    max_body_bytes: Option<usize>,
    function: Option<FunctionTable>,
}

impl FunctionTable {
    fn validate(self) -> Result<FunctionConfig, ConfigError> {
        let runtime: Runtime = self.runtime.as_deref().unwrap_or_default().parse()?;

        let name = non_empty(self.name).ok_or(ConfigError::MissingName)?;
        let entrypoint =
            non_empty(self.entrypoint).ok_or_else(|| ConfigError::MissingEntrypoint {
                name: name.clone(),
                runtime,
            })?;
        let function = non_empty(self.function).ok_or_else(|| ConfigError::MissingFunction {
            name: name.clone(),
            runtime,
        })?;
        let python_executable = non_empty(self.python_executable)
            .unwrap_or_else(|| DEFAULT_PYTHON_EXECUTABLE.to_string());

        let worker_timeout = timeout_secs(self.worker_timeout).unwrap_or(DEFAULT_WORKER_TIMEOUT);
        let dispatch_timeout = timeout_secs(self.dispatch_timeout).unwrap_or(worker_timeout);

        let uri_filter = match non_empty(self.uri_filter) {
            Some(pattern) => Some(
                Regex::new(&pattern)
                    .map_err(|source| ConfigError::InvalidFilter { pattern, source })?,
            ),
            None => None,
        };

        let config = FunctionConfig {
            name,
            runtime,
            python_executable: PathBuf::from(python_executable),
            entrypoint,
            function,
            workers: self.workers.unwrap_or(1),
            worker_timeout,
            dispatch_timeout,
            uri_filter,
            working_dir: self.working_dir,
        };

        tracing::debug!(
            name = %config.name,
            runtime = %config.runtime,
            python_executable = %config.python_executable.display(),
            entrypoint = %config.entrypoint,
            function = %config.function,
            workers = config.workers,
            "configured lambda function"
        );

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Positive timeouts in whole seconds, capped at [`MAX_TIMEOUT`]; anything
/// below 1 means "use the default"
fn timeout_secs(value: Option<i64>) -> Option<Duration> {
    value
        .filter(|secs| *secs >= 1)
        .map(|secs| Duration::from_secs(secs.unsigned_abs()).min(MAX_TIMEOUT))
}

/// Daemon configuration: where to listen and which function to serve
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Request bodies are read up to this size and then refused
    pub max_body_bytes: usize,
    pub function: FunctionConfig,
}

impl ServerConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&content)
    }

    /// Parse and validate config file content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: ServerTable = toml::from_str(content)?;

        let listen = raw.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(listen.clone()))?;
        let function = raw.function.unwrap_or_default().validate()?;

        Ok(Self {
            listen,
            max_body_bytes: raw.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            function,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
