// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![allow(async_fn_in_trait)]

//! comexe-server: the cooperative I/O core.
//!
//! HTTP/1.1 serving (keep-alive, chunked bodies, multipart), TLS termination
//! through a sans-IO engine adapter, and WebSocket framing. Everything in
//! one instance runs on a single-threaded cooperative scheduler; tasks yield
//! on I/O and nothing preempts script between requests.

pub mod chunk;
pub mod env;
pub mod form;
pub mod headers;
pub mod http;
pub mod multipart;
pub mod request;
pub mod response;
pub mod tls;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunk::ChunkBuffer;
pub use http::{Handler, Served, Server, ServerConfig};
pub use request::{Request, RequestError};
pub use response::Response;
pub use transport::{TcpTransport, Transport, TransportError};
