// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation event built from an inbound HTTP request
//!
//! The event is the single argument handed to the function. Deployed handlers
//! depend on its JSON shape: key names, header casing, and the scalar-or-list
//! collapsing are part of the contract.

use crate::request_id::RequestId;
use http::header::{COOKIE, HOST, SET_COOKIE};
use http::request::Parts;
use http::{HeaderMap, Version};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// A header or query value: a scalar when a key occurs once, a list otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Collapse a single value to a scalar. `None` for an empty list.
    pub fn collapse(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(values)),
        }
    }
}

/// A cookie sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Structured event passed to the function. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationEvent {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub proto: String,
    pub host: String,
    pub request_uri: String,
    pub remote_addr_port: String,
    pub cookies: Vec<Cookie>,
    pub headers: BTreeMap<String, OneOrMany>,
    pub query_params: BTreeMap<String, OneOrMany>,
}

impl InvocationEvent {
    /// Build the event for a request whose identifier is already known
    pub fn from_parts(parts: &Parts, request_id: &RequestId, remote: Option<SocketAddr>) -> Self {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let request_uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            request_id: request_id.as_str().to_string(),
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            proto: proto_name(parts.version).to_string(),
            host,
            request_uri,
            remote_addr_port: remote.map(|addr| addr.to_string()).unwrap_or_default(),
            cookies: parse_cookies(&parts.headers),
            headers: collect_headers(&parts.headers),
            query_params: collect_query(parts.uri.query()),
        }
    }

    /// Single-line JSON text of the event
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Headers keyed by canonical name, without `Cookie` and `Set-Cookie`
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, OneOrMany> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        if *name == COOKIE || *name == SET_COOKIE {
            continue;
        }
        grouped
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collapse_all(grouped)
}

/// Decoded query parameters, in key order
pub fn collect_query(query: Option<&str>) -> BTreeMap<String, OneOrMany> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            grouped
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }
    collapse_all(grouped)
}

fn collapse_all(grouped: BTreeMap<String, Vec<String>>) -> BTreeMap<String, OneOrMany> {
    grouped
        .into_iter()
        .filter_map(|(key, values)| OneOrMany::collapse(values).map(|v| (key, v)))
        .collect()
}

/// Cookies from every `Cookie` header, in the order sent.
///
/// Pairs without a name are skipped; surrounding double quotes are stripped
/// from values.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Protocol string as written on the request line: `HTTP/1.1`, `HTTP/2.0`
pub fn proto_name(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_11 {
        "HTTP/1.1"
    } else if version == Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        ""
    }
}

/// MIME canonical form of a header name: `x-request-id` → `X-Request-Id`
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
