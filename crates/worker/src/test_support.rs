// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in interpreters for tests
//!
//! Each script is run as `sh -c <script>`. It reads the statements a worker
//! writes and answers the marker protocol when it sees the end-marker print
//! statement, so no Python is needed.
#![cfg_attr(coverage_nightly, coverage(off))]

use lambda_core::{InvocationEvent, RequestId};
use std::time::Duration;

/// Pulls the request id out of the end-marker print statement
const EXTRACT_RID: &str = r#"rid=${line#*CMD_OUTPUT_END=}; rid=${rid%%;*}"#;

/// Replies 200 with a body naming the request id and how many times the
/// bootstrap `import json` was received
pub fn echo_script() -> String {
    format!(
        r#"imports=0
while IFS= read -r line; do
  case "$line" in
    "import json") imports=$((imports + 1)) ;;
    *CMD_OUTPUT_END=*)
      {EXTRACT_RID}
      echo "CMD_OUTPUT_START=$rid;"
      echo "CMD_STATUS_CODE=200;"
      echo "CMD_OUTPUT_BODY=rid=$rid imports=$imports"
      echo "CMD_OUTPUT_END=$rid;"
      ;;
  esac
done"#
    )
}

/// Replies with a fixed status line and body after `delay`
pub fn reply_script(status_line: &str, body: &str, delay: Duration) -> String {
    let sleep = if delay.is_zero() {
        String::new()
    } else {
        format!("sleep {}", delay.as_secs_f64())
    };
    format!(
        r#"while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*)
      {EXTRACT_RID}
      {sleep}
      echo "CMD_OUTPUT_START=$rid;"
      echo "CMD_STATUS_CODE={status_line};"
      echo "CMD_OUTPUT_BODY={body}"
      echo "CMD_OUTPUT_END=$rid;"
      ;;
  esac
done"#
    )
}

/// Starts a reply but never prints the end marker
pub fn hang_script() -> String {
    format!(
        r#"while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*)
      {EXTRACT_RID}
      echo "CMD_OUTPUT_START=$rid;"
      echo "CMD_STATUS_CODE=200;"
      ;;
  esac
done"#
    )
}

/// Prints a banner and a stale reply for another request before each answer
pub fn noisy_script() -> String {
    format!(
        r#"echo "Interactive session ready"
while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*)
      {EXTRACT_RID}
      echo "CMD_OUTPUT_START=stale;"
      echo "CMD_STATUS_CODE=500;"
      echo "CMD_OUTPUT_BODY=stale body"
      echo "CMD_OUTPUT_END=stale;"
      echo "CMD_OUTPUT_START=$rid;"
      echo "handler debug output"
      echo "CMD_STATUS_CODE=201;"
      echo "CMD_OUTPUT_BODY=created"
      echo "CMD_OUTPUT_END=$rid;"
      ;;
  esac
done"#
    )
}

/// Exits as soon as the first invocation arrives, without replying
pub fn crash_script() -> String {
    r#"while IFS= read -r line; do
  case "$line" in
    *CMD_OUTPUT_END=*) exit 3 ;;
  esac
done"#
        .to_string()
}

/// Event for a bare `GET /` with the given request id
pub fn event(request_id: &str) -> InvocationEvent {
    let (parts, ()) = http::Request::builder()
        .uri("/")
        .body(())
        .unwrap_or_default()
        .into_parts();
    InvocationEvent::from_parts(&parts, &RequestId::new(request_id), None)
}
