// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `application/x-www-form-urlencoded` and query-string parsing.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except unreserved characters is escaped on encode; `+` never
/// appears raw so decode stays unambiguous.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Decode one form component: `+` means space, then percent-decode.
fn decode_component(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    percent_decode_str(&plus_decoded).decode_utf8_lossy().into_owned()
}

/// Iterate `key=value` pairs separated by `&`, in order. Pairs with an
/// empty key are skipped; a pair without `=` yields an empty value.
pub fn parse_pairs(s: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for piece in s.split('&') {
        if piece.is_empty() {
            continue;
        }
        let (key, value) = match piece.split_once('=') {
            Some((k, v)) => (k, v),
            None => (piece, ""),
        };
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        pairs.push((key, decode_component(value)));
    }
    pairs
}

/// Decoded key→value map; a later duplicate key overwrites an earlier one.
pub fn parse_map(s: &str) -> HashMap<String, String> {
    parse_pairs(s).into_iter().collect()
}

/// Encode pairs back into a form string.
pub fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        if key.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&utf8_percent_encode(key, FORM).to_string());
        out.push('=');
        out.push_str(&utf8_percent_encode(value, FORM).to_string());
    }
    out
}

#[cfg(test)]
#[path = "form_tests.rs"]
mod tests;
