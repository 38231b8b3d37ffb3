// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe protocol between a worker and its interpreter
//!
//! Requests are Python statements written to the interpreter's stdin, one per
//! line. The interpreter is a long-lived session, so its stdout has no message
//! framing: each reply is delimited by sentinel lines carrying the request id.
//!
//! ```text
//! CMD_OUTPUT_START=<rid>;
//! CMD_STATUS_CODE=<int>;
//! CMD_OUTPUT_BODY=<text>
//! CMD_OUTPUT_END=<rid>;
//! ```
//!
//! Anything printed before the start marker of the current request (a banner,
//! late output of a timed-out request) is discarded.

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const OUTPUT_START: &str = "CMD_OUTPUT_START=";
pub const STATUS_CODE: &str = "CMD_STATUS_CODE=";
pub const OUTPUT_BODY: &str = "CMD_OUTPUT_BODY=";
pub const OUTPUT_END: &str = "CMD_OUTPUT_END=";

/// Prepended to recorded lines that carry no tag
pub const UNTAGGED_MARK: char = 'Y';

/// Status assumed until a well-formed status line arrives
pub const DEFAULT_STATUS: StatusCode = StatusCode::OK;

/// Interpreter-side name bound to the handler's return value
const RESULT_VAR: &str = "resp";

/// A decoded function reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reply whose body is the status's reason phrase, e.g. `Request Timeout`
    pub fn canonical(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One-time setup statements sent before a worker's first invocation
pub fn bootstrap(module: &str) -> String {
    format!("from {module} import *\nimport json\n")
}

/// Statements for one invocation of `handler` with `event`.
///
/// The event travels as a JSON string literal decoded by `json.loads`, which
/// keeps it on a single line and avoids Python/JSON literal mismatches
/// (`true`, `null`).
pub fn encode_call(
    handler: &str,
    request_id: &str,
    event: &impl Serialize,
) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(&serde_json::to_string(event)?)?;
    let start = serde_json::to_string(&format!("{OUTPUT_START}{request_id};"))?;
    let end = serde_json::to_string(&format!("{OUTPUT_END}{request_id};"))?;

    let mut script = String::new();
    script.push_str(&format!("{RESULT_VAR} = None\n"));
    script.push_str(&format!("{RESULT_VAR} = {handler}(json.loads({payload}))\n"));
    script.push_str(&format!("print({start})\n"));
    script.push_str(&format!(
        "print(f\"{STATUS_CODE}{{{RESULT_VAR}['status_code']}};\")\n"
    ));
    script.push_str(&format!(
        "print(f\"{OUTPUT_BODY}{{{RESULT_VAR}['body']}}\")\n"
    ));
    script.push_str(&format!("print({end})\n"));
    Ok(script)
}

/// Incremental decoder for one request's reply
#[derive(Debug)]
pub struct ReplyDecoder {
    request_id: String,
    start_marker: String,
    end_marker: String,
    recording: bool,
    status: StatusCode,
    body: Vec<String>,
}

impl ReplyDecoder {
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            start_marker: format!("{OUTPUT_START}{request_id};"),
            end_marker: format!("{OUTPUT_END}{request_id};"),
            recording: false,
            status: DEFAULT_STATUS,
            body: Vec::new(),
        }
    }

    /// Feed one output line. Returns true once the end marker is seen.
    pub fn feed(&mut self, line: &str) -> bool {
        if line.contains(&self.end_marker) {
            self.recording = false;
            return true;
        }
        if !self.recording {
            if line.contains(&self.start_marker) {
                self.recording = true;
            }
            return false;
        }

        if let Some(code) = line.strip_prefix(STATUS_CODE) {
            match parse_status(code) {
                Some(status) => self.status = status,
                None => tracing::warn!(
                    request_id = %self.request_id,
                    line,
                    "failed to parse status code, keeping {}",
                    self.status.as_u16()
                ),
            }
        } else if let Some(body) = line.strip_prefix(OUTPUT_BODY) {
            self.body.push(body.to_string());
        } else {
            self.body.push(format!("{UNTAGGED_MARK}{line}"));
        }
        false
    }

    pub fn finish(self) -> Reply {
        Reply::new(self.status, self.body.join("\n"))
    }
}

fn parse_status(code: &str) -> Option<StatusCode> {
    let code = code.trim_end().trim_end_matches(';').trim();
    let code: u16 = code.parse().ok()?;
    StatusCode::from_u16(code).ok()
}

/// Outcome of reading one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Reply(Reply),
    /// The deadline passed before the end marker arrived
    TimedOut,
    /// The output stream closed (the interpreter exited)
    Closed,
}

/// Read lines until the reply for `request_id` is complete or `timeout`
/// elapses.
///
/// Lines that arrive after a timeout stay in the channel and are discarded by
/// the next call as pre-start output.
pub async fn read_reply(
    lines: &mut mpsc::UnboundedReceiver<String>,
    request_id: &str,
    timeout: Duration,
) -> Decoded {
    let deadline = deadline_after(timeout);
    let mut decoder = ReplyDecoder::new(request_id);
    loop {
        match tokio::time::timeout_at(deadline, lines.recv()).await {
            Ok(Some(line)) => {
                if decoder.feed(&line) {
                    return Decoded::Reply(decoder.finish());
                }
            }
            Ok(None) => return Decoded::Closed,
            Err(_) => return Decoded::TimedOut,
        }
    }
}

/// Roughly thirty years, the stand-in for "no deadline"
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + timeout`, saturating to a far-future instant instead of overflowing
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
