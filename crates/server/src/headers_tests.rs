// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Header-value parsing tests.

use yare::parameterized;

use super::*;

#[test]
fn main_value_is_trimmed_and_lowercased() {
    let hv = parse_header_value("  Text/HTML ; charset=utf-8");
    assert_eq!(hv.value, "text/html");
    assert_eq!(hv.param_str("charset"), Some("utf-8"));
}

#[parameterized(
    double_quoted = { r#"form-data; name="field""#, "field" },
    single_quoted = { "form-data; name='field'", "field" },
    bare = { "form-data; name=field", "field" },
)]
fn quoting_styles_are_equivalent(raw: &str, expected: &str) {
    let hv = parse_header_value(raw);
    assert_eq!(hv.param_str("name"), Some(expected));
}

#[test]
fn escapes_inside_quotes_are_honoured() {
    let hv = parse_header_value(r#"form-data; filename="a\"b\\c""#);
    assert_eq!(hv.param_str("filename"), Some(r#"a"b\c"#));
}

#[test]
fn semicolon_inside_quotes_does_not_split() {
    let hv = parse_header_value(r#"form-data; filename="one;two"; x=1"#);
    assert_eq!(hv.param_str("filename"), Some("one;two"));
    assert_eq!(hv.param_str("x"), Some("1"));
}

#[test]
fn bare_segments_become_flags() {
    let hv = parse_header_value("inline; Secure; HttpOnly");
    assert!(hv.has_flag("secure"));
    assert!(hv.has_flag("httponly"));
    assert!(!hv.has_flag("absent"));
}

#[test]
fn param_keys_are_lowercased() {
    let hv = parse_header_value("attachment; FileName=report.txt");
    assert_eq!(hv.param_str("filename"), Some("report.txt"));
}

#[test]
fn ext_value_drops_star_and_percent_decodes() {
    let hv = parse_header_value("attachment; filename*=UTF-8''na%C3%AFve%20file.txt");
    assert_eq!(hv.param_str("filename"), Some("naïve file.txt"));
}

#[test]
fn ext_value_without_charset_form_is_kept_verbatim() {
    let hv = parse_header_value("attachment; filename*=plain");
    assert_eq!(hv.param_str("filename"), Some("plain"));
}

#[test]
fn value_only_header_has_no_params() {
    let hv = parse_header_value("application/json");
    assert_eq!(hv.value, "application/json");
    assert!(hv.params().is_empty());
}
