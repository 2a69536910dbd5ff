// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request parsing tests: framing, headers, bodies, keep-alive decisions.

use std::time::Duration;

use yare::parameterized;

use super::*;
use crate::test_support::MockTransport;

const KEEPALIVE: Duration = Duration::from_secs(15);

async fn parse(input: &str) -> Result<Request, RequestError> {
    parse_at(input, 1, 100).await
}

async fn parse_at(input: &str, iteration: u32, max: u32) -> Result<Request, RequestError> {
    let mut t = MockTransport::with_input(input.as_bytes());
    read_request(&mut t, KEEPALIVE, iteration, max).await
}

#[tokio::test]
async fn simple_get_parses() {
    let req = parse("GET /index.html?a=1&b=two HTTP/1.1\r\nHost: example\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.path, "/index.html");
    assert_eq!(req.query_string, "a=1&b=two");
    assert_eq!(req.query.get("b").map(String::as_str), Some("two"));
    assert_eq!(req.header("host"), Some("example"));
    assert!(req.body.is_none());
}

#[tokio::test]
async fn header_names_fold_to_lowercase_values_keep_whitespace() {
    let req = parse("GET / HTTP/1.1\r\nX-Odd-Header:  padded \r\n\r\n").await.unwrap();
    // One SP after the colon is framing; the rest belongs to the value.
    assert_eq!(req.header("x-odd-header"), Some(" padded "));
}

#[tokio::test]
async fn content_length_body_reads_exactly() {
    let req = parse("POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloEXTRA").await.unwrap();
    assert_eq!(req.body_bytes(), b"hello");
}

#[tokio::test]
async fn chunked_body_reassembles() {
    let req = parse(
        "POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
         5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n",
    )
    .await
    .unwrap();
    assert_eq!(req.body_bytes(), b"Hello World");
}

#[tokio::test]
async fn chunked_body_with_only_zero_chunk_is_empty() {
    let req = parse("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n")
        .await
        .unwrap();
    assert_eq!(req.body_bytes(), b"");
}

#[tokio::test]
async fn chunk_without_terminating_crlf_is_malformed() {
    let err = parse(
        "POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHelloX\r\n0\r\n",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RequestError::Malformed), "{err:?}");
}

#[tokio::test]
async fn bad_chunk_size_is_malformed() {
    let err = parse("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n")
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::Malformed));
}

#[parameterized(
    short_line = { "GET /\r\n\r\n" },
    long_line = { "GET / HTTP/1.1 extra\r\n\r\n" },
)]
#[test_macro(tokio::test)]
async fn bad_request_line_is_malformed(input: &str) {
    assert!(matches!(parse(input).await.unwrap_err(), RequestError::Malformed));
}

#[tokio::test]
async fn header_without_colon_is_malformed() {
    let err = parse("GET / HTTP/1.1\r\nbroken header\r\n\r\n").await.unwrap_err();
    assert!(matches!(err, RequestError::Malformed));
}

#[tokio::test]
async fn idle_connection_times_out() {
    let err = parse("").await.unwrap_err();
    assert!(matches!(err, RequestError::Timeout));
}

#[parameterized(
    http11_default = { "HTTP/1.1", "", true },
    http11_close = { "HTTP/1.1", "Connection: close\r\n", false },
    http10_default = { "HTTP/1.0", "", false },
    http10_keepalive = { "HTTP/1.0", "Connection: keep-alive\r\n", true },
    upgrade = { "HTTP/1.1", "Connection: Upgrade\r\n", false },
)]
#[test_macro(tokio::test)]
async fn keepalive_decision(version: &str, extra: &str, expected: bool) {
    let input = format!("GET / {version}\r\n{extra}\r\n");
    let req = parse(&input).await.unwrap();
    assert_eq!(req.keepalive, expected);
}

#[tokio::test]
async fn final_iteration_forces_close() {
    let input = "GET / HTTP/1.1\r\n\r\n";
    let req = parse_at(input, 3, 3).await.unwrap();
    assert!(!req.keepalive, "max_requests-th request must not keep alive");
    assert_eq!(req.keepalive_remaining, 1);

    let req = parse_at(input, 2, 3).await.unwrap();
    assert!(req.keepalive);
    assert_eq!(req.keepalive_remaining, 2);
}
