// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request identifiers
//!
//! One physical request maps to one identifier: the first component that
//! needs it mints one and stores it in the request extensions, later
//! components reuse it.

use http::Extensions;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier tying an inbound request to its worker invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reuse the identifier stored in `extensions`, or mint and store one
    pub fn get_or_mint(extensions: &mut Extensions, source: &impl IdSource) -> Self {
        if let Some(existing) = extensions.get::<RequestId>() {
            return existing.clone();
        }
        let id = source.mint();
        extensions.insert(id.clone());
        id
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where fresh request identifiers come from
pub trait IdSource: Send + Sync {
    fn mint(&self) -> RequestId;
}

/// Random UUID v4 identifiers, one per request
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn mint(&self) -> RequestId {
        RequestId(uuid::Uuid::new_v4().to_string())
    }
}

/// Numbered identifiers (`req-1`, `req-2`, ...)
#[derive(Debug)]
pub struct NumberedIds {
    prefix: &'static str,
    issued: AtomicU64,
}

impl NumberedIds {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            issued: AtomicU64::new(0),
        }
    }

    /// How many identifiers have been minted so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

impl Default for NumberedIds {
    fn default() -> Self {
        Self::new("req")
    }
}

impl IdSource for NumberedIds {
    fn mint(&self) -> RequestId {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId(format!("{}-{n}", self.prefix))
    }
}

#[cfg(test)]
#[path = "request_id_tests.rs"]
mod tests;
