// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One HTTP message iteration on a connection.
//!
//! A `Request` is created after the body is read and dropped when the
//! handler returns; the underlying connection may outlive it across
//! keep-alive iterations.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::form;
use crate::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum RequestError {
    /// Request line, header, or chunk framing the parser cannot accept.
    #[error("malformed")]
    Malformed,

    /// The keep-alive timer fired before the first byte.
    #[error("timeout")]
    Timeout,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Parsed request handed to the application for one iteration.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    /// Raw version string from the request line, e.g. `HTTP/1.1`.
    pub version: String,
    pub path: String,
    pub query_string: String,
    /// Decoded query parameters, later duplicates winning.
    pub query: HashMap<String, String>,
    /// Header map with case-folded (lowercase) names.
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub peer: Option<SocketAddr>,
    /// Keep-alive decision for this iteration.
    pub keepalive: bool,
    /// Iterations left on this connection, this one included.
    pub keepalive_remaining: u32,
    /// Set by a protocol upgrade; the HTTP loop stops owning the socket.
    pub upgraded: bool,
    /// Handler-requested close: overrides the keep-alive decision for this
    /// iteration.
    pub closed: bool,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }
}

/// Keep-alive decision at iteration start, before the request counter
/// bound is applied.
fn wants_keepalive(version: &str, connection: Option<&str>) -> bool {
    let connection = connection.map(str::to_ascii_lowercase).unwrap_or_default();
    if connection.contains("upgrade") {
        return false;
    }
    if version == "HTTP/1.0" {
        connection.contains("keep-alive")
    } else {
        !connection.contains("close")
    }
}

/// Read and parse one request from the transport.
///
/// `iteration` is 1-based; `max_requests` bounds keep-alive so that the
/// `max_requests`-th response always carries `Connection: close`.
pub(crate) async fn read_request<T: Transport>(
    transport: &mut T,
    keepalive_timeout: Duration,
    iteration: u32,
    max_requests: u32,
) -> Result<Request, RequestError> {
    // Keep-alive timer: non-recurring, cancelled once the first byte of
    // the request line arrives.
    transport.set_timeout(Some(keepalive_timeout));
    match transport.poke().await {
        Ok(()) => {}
        Err(TransportError::Timeout) => return Err(RequestError::Timeout),
        Err(e) => return Err(e.into()),
    }
    transport.set_timeout(None);

    let line = transport.recv_line().await?;
    let line = std::str::from_utf8(&line).map_err(|_| RequestError::Malformed)?;
    let mut words = line.split_whitespace();
    let (method, target, version) = match (words.next(), words.next(), words.next(), words.next())
    {
        (Some(m), Some(t), Some(v), None) => (m.to_string(), t, v.to_string()),
        _ => return Err(RequestError::Malformed),
    };

    let (path, query_string) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.to_string(), String::new()),
    };
    let query = form::parse_map(&query_string);

    let headers = read_headers(transport).await?;
    let body = read_body(transport, &headers).await?;

    let keep = wants_keepalive(&version, headers.get("connection").map(String::as_str));
    let remaining = max_requests.saturating_sub(iteration.saturating_sub(1));
    let keepalive = keep && iteration < max_requests;

    Ok(Request {
        method,
        version,
        path,
        query_string,
        query,
        headers,
        body,
        peer: transport.peer_addr(),
        keepalive,
        keepalive_remaining: remaining,
        upgraded: false,
        closed: false,
    })
}

/// CRLF header lines up to the empty line. Names case-fold to lowercase;
/// a single space after the colon is consumed, any further whitespace is
/// part of the value.
async fn read_headers<T: Transport>(
    transport: &mut T,
) -> Result<HashMap<String, String>, RequestError> {
    let mut headers = HashMap::new();
    loop {
        let line = transport.recv_line().await?;
        if line.is_empty() {
            return Ok(headers);
        }
        let line = std::str::from_utf8(&line).map_err(|_| RequestError::Malformed)?;
        let (name, rest) = line.split_once(':').ok_or(RequestError::Malformed)?;
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        headers.insert(name.to_ascii_lowercase(), value.to_string());
    }
}

async fn read_body<T: Transport>(
    transport: &mut T,
    headers: &HashMap<String, String>,
) -> Result<Option<Bytes>, RequestError> {
    if let Some(length) = headers.get("content-length") {
        let length: usize = length.trim().parse().map_err(|_| RequestError::Malformed)?;
        if length == 0 {
            return Ok(None);
        }
        return Ok(Some(transport.recv_exact(length).await?));
    }

    let chunked = headers
        .get("transfer-encoding")
        .map(|v| v.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);
    if chunked {
        return Ok(Some(read_chunked(transport).await?));
    }

    Ok(None)
}

/// Chunked transfer decoding: hex length line, that many bytes, then a
/// mandatory CRLF; a zero-length chunk ends the body. Trailer headers are
/// consumed only if already buffered.
async fn read_chunked<T: Transport>(transport: &mut T) -> Result<Bytes, RequestError> {
    let mut body = Vec::new();
    loop {
        let line = transport.recv_line().await?;
        let line = std::str::from_utf8(&line).map_err(|_| RequestError::Malformed)?;
        // Chunk extensions after ';' are ignored.
        let size_part = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_part, 16).map_err(|_| RequestError::Malformed)?;
        if size == 0 {
            break;
        }
        let chunk = transport.recv_exact(size).await?;
        body.extend_from_slice(&chunk);
        let sep = transport.recv_line().await?;
        if !sep.is_empty() {
            return Err(RequestError::Malformed);
        }
    }
    // Trailer headers and the final CRLF are consumed only when already
    // buffered; a body ending right at `0\r\n` is complete as-is.
    while let Some(line) = transport.try_line() {
        if line.is_empty() {
            break;
        }
    }
    Ok(Bytes::from(body))
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
