// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for daemon integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::Duration;
use tempfile::TempDir;

/// How long to wait for `READY`
const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Stand-in interpreter answering every invocation with `status` and `body`
pub fn reply_interpreter(status: u16, body: &str) -> String {
    format!(
        r#"while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*)
      rid=${{line#*CMD_OUTPUT_END=}}; rid=${{rid%%;*}}
      echo "CMD_OUTPUT_START=$rid;"
      echo "CMD_STATUS_CODE={status};"
      echo "CMD_OUTPUT_BODY={body}"
      echo "CMD_OUTPUT_END=$rid;"
      ;;
  esac
done"#
    )
}

/// Stand-in interpreter that never finishes a reply
pub fn hanging_interpreter() -> String {
    r#"while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*)
      rid=${line#*CMD_OUTPUT_END=}; rid=${rid%%;*}
      echo "CMD_OUTPUT_START=$rid;"
      ;;
  esac
done"#
        .to_string()
}

pub fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Scratch directory holding a config file and stand-in interpreters
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `script` as an executable interpreter; launch flags are ignored
    pub fn interpreter(&self, script: &str) -> PathBuf {
        let path = self.path().join("interpreter.sh");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("Failed to write interpreter");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make interpreter executable");
        path
    }

    /// Config listening on an ephemeral port with the given `[function]` body
    pub fn config(&self, function: &str) -> PathBuf {
        let path = self.path().join("lambda.toml");
        let content = format!("listen = \"127.0.0.1:0\"\n\n[function]\n{function}\n");
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    /// Config for a function served by the interpreter at `interpreter`
    pub fn stand_in_config(&self, interpreter: &Path, extra: &str) -> PathBuf {
        self.config(&format!(
            r#"name = "test_fn"
runtime = "python"
python_executable = "{}"
entrypoint = "app/index.py"
function = "handler"
{extra}"#,
            interpreter.display()
        ))
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("lambdad.log")
    }

    /// Start `lambdad` and wait until it reports the bound address
    pub fn start(&self, config: &Path) -> Daemon {
        let log = File::create(self.log_path()).expect("Failed to create log file");
        let mut child = Command::new(env!("CARGO_BIN_EXE_lambdad"))
            .arg(config)
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log))
            .spawn()
            .expect("Failed to spawn lambdad");

        let stdout = child.stdout.take().expect("Failed to capture stdout");
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if let Some(addr) = line.strip_prefix("READY ") {
                    let _ = tx.send(addr.to_string());
                }
            }
        });

        let addr = match rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(addr) => addr,
            Err(_) => {
                let _ = child.kill();
                let logs = fs::read_to_string(self.log_path()).unwrap_or_default();
                panic!("lambdad did not become ready\n{logs}");
            }
        };

        Daemon {
            child,
            addr,
            agent: ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(Some(Duration::from_secs(30)))
                .build()
                .into(),
        }
    }

    pub fn logs(&self) -> String {
        fs::read_to_string(self.log_path()).unwrap_or_default()
    }
}

/// A running `lambdad`, killed on drop
pub struct Daemon {
    child: Child,
    addr: String,
    agent: ureq::Agent,
}

impl Daemon {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET `path`, returning status and body
    pub fn get(&self, path: &str) -> (u16, String) {
        let mut response = self
            .agent
            .get(&self.url(path))
            .call()
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .expect("Failed to read body");
        (status, body)
    }

    /// POST `body` to `path`, returning status and body
    pub fn post(&self, path: &str, body: &[u8]) -> (u16, String) {
        let mut response = self
            .agent
            .post(&self.url(path))
            .send(body)
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .expect("Failed to read body");
        (status, body)
    }

    pub fn wait(&mut self) -> ExitStatus {
        self.child.wait().expect("Failed to wait for lambdad")
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
