// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

use super::*;
use std::collections::HashMap;

#[test]
fn action_id_has_prefix_and_fits_buffer() {
    let id = ActionId::new();
    assert!(id.as_str().starts_with("act-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn action_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    let id = ActionId::from_string("act-fixed");
    map.insert(id, 42);
    assert_eq!(map.get("act-fixed"), Some(&42));
}

#[test]
fn action_id_suffix_strips_prefix() {
    let id = ActionId::from_string("act-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn action_id_round_trips_through_json() {
    let id = ActionId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: ActionId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn short_truncates_long_strings() {
    assert_eq!(short("abcdefgh", 4), "abcd");
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn two_generated_ids_differ() {
    assert_ne!(ActionId::new(), ActionId::new());
}
