// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn random_ids_are_uuids() {
    let first = RandomIds.mint();
    assert_ne!(first, RandomIds.mint());
    assert!(uuid::Uuid::parse_str(first.as_str()).is_ok());
}

#[test]
fn numbered_ids_count_from_one() {
    let ids = NumberedIds::default();
    assert_eq!(ids.issued(), 0);
    assert_eq!(ids.mint().as_str(), "req-1");
    assert_eq!(ids.mint().as_str(), "req-2");
    assert_eq!(ids.issued(), 2);
}

#[test]
fn numbered_ids_stay_unique_across_threads() {
    let ids = Arc::new(NumberedIds::new("t"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ids = Arc::clone(&ids);
            std::thread::spawn(move || (0..100).map(|_| ids.mint()).collect::<Vec<_>>())
        })
        .collect();

    let minted: HashSet<RequestId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(minted.len(), 400);
    assert_eq!(ids.issued(), 400);
}

#[test]
fn mints_and_stores_when_absent() {
    let ids = NumberedIds::new("test");
    let mut extensions = Extensions::new();

    let id = RequestId::get_or_mint(&mut extensions, &ids);

    assert_eq!(id.as_str(), "test-1");
    assert_eq!(extensions.get::<RequestId>(), Some(&id));
}

#[test]
fn reuses_stored_identifier() {
    let ids = NumberedIds::new("test");
    let mut extensions = Extensions::new();
    extensions.insert(RequestId::new("upstream-42"));

    let first = RequestId::get_or_mint(&mut extensions, &ids);
    let second = RequestId::get_or_mint(&mut extensions, &ids);

    assert_eq!(first.as_str(), "upstream-42");
    assert_eq!(first, second);
    assert_eq!(ids.issued(), 0);
}
