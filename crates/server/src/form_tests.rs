// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Form parsing tests, including the parse∘format round-trip law.

use proptest::prelude::*;

use super::*;

#[test]
fn basic_pairs_parse_in_order() {
    let pairs = parse_pairs("a=1&b=2&c=3");
    assert_eq!(
        pairs,
        vec![("a".into(), "1".into()), ("b".into(), "2".into()), ("c".into(), "3".into())]
    );
}

#[test]
fn plus_means_space_in_key_and_value() {
    let map = parse_map("full+name=Ada+Lovelace");
    assert_eq!(map.get("full name").map(String::as_str), Some("Ada Lovelace"));
}

#[test]
fn percent_sequences_decode() {
    let map = parse_map("q=caf%C3%A9&path=%2Ftmp%2Fx");
    assert_eq!(map.get("q").map(String::as_str), Some("café"));
    assert_eq!(map.get("path").map(String::as_str), Some("/tmp/x"));
}

#[test]
fn empty_keys_are_skipped() {
    let pairs = parse_pairs("=ignored&a=1&&=also");
    assert_eq!(pairs, vec![("a".into(), "1".into())]);
}

#[test]
fn later_duplicate_key_overwrites() {
    let map = parse_map("k=first&k=second");
    assert_eq!(map.get("k").map(String::as_str), Some("second"));
}

#[test]
fn pair_without_equals_has_empty_value() {
    let pairs = parse_pairs("flag&x=1");
    assert_eq!(pairs, vec![("flag".into(), String::new()), ("x".into(), "1".into())]);
}

#[test]
fn encode_escapes_reserved_bytes() {
    let s = encode_pairs([("a b", "c&d=e"), ("k", "v")]);
    assert_eq!(s, "a%20b=c%26d%3De&k=v");
}

proptest! {
    // Parse-then-format yields an equivalent map (modulo ordering and
    // duplicate last-wins).
    #[test]
    fn parse_format_roundtrip(
        entries in proptest::collection::hash_map("[a-zA-Z0-9 /+&=%._-]{1,12}", "[a-zA-Z0-9 /+&=%._-]{0,12}", 0..8)
    ) {
        let encoded = encode_pairs(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let decoded = parse_map(&encoded);
        prop_assert_eq!(decoded, entries);
    }
}
