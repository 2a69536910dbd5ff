// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket-shaped transports the connection loop reads requests from.
//!
//! Both the plain TCP transport and the TLS adapter expose the same
//! receive patterns: one line (terminator stripped), an exact byte count,
//! or everything until the peer closes. Long-running receive loops observe
//! the server stop token and abort with "closed"; two caps protect the
//! line scan from misbehaving peers.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::chunk::ChunkBuffer;

/// Most buffered chunks one line read will accumulate.
pub const MAX_LINE_CHUNKS: usize = 4096;
/// Most fill iterations one receive call will attempt.
pub const MAX_ATTEMPTS: usize = 1_000_000;

pub(crate) const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer closed, or the server asked this connection to stop.
    #[error("closed")]
    Closed,

    /// A receive cap tripped on a misbehaving peer.
    #[error("max iterations")]
    MaxIterations,

    /// The keep-alive or per-call timer fired first.
    #[error("timeout")]
    Timeout,

    #[error("handshake timeout ({attempts}/{cap})")]
    HandshakeTimeout { attempts: u32, cap: u32 },

    #[error("tls: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Cooperative byte transport under one connection.
pub trait Transport {
    /// Wait until at least one byte is buffered.
    async fn poke(&mut self) -> Result<(), TransportError>;

    /// One line, CRLF or LF terminated, terminator stripped.
    async fn recv_line(&mut self) -> Result<Bytes, TransportError>;

    /// A complete line if one is already buffered; never waits.
    fn try_line(&mut self) -> Option<Bytes>;

    /// Exactly `n` bytes.
    async fn recv_exact(&mut self, n: usize) -> Result<Bytes, TransportError>;

    /// All bytes until the peer closes.
    async fn recv_all(&mut self) -> Result<Bytes, TransportError>;

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    async fn close(&mut self);

    /// Timeout applied to subsequent receive waits; `None` waits forever.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Plain (non-TLS) transport over an accepted socket.
pub struct TcpTransport {
    sock: TcpStream,
    buf: ChunkBuffer,
    stop: CancellationToken,
    timeout: Option<Duration>,
    peer: Option<SocketAddr>,
    eof: bool,
}

impl TcpTransport {
    pub fn new(sock: TcpStream, stop: CancellationToken) -> Self {
        let peer = sock.peer_addr().ok();
        Self { sock, buf: ChunkBuffer::new(), stop, timeout: None, peer, eof: false }
    }

    /// One socket read appended to the buffer; `Ok(0)` is EOF.
    async fn fill(&mut self) -> Result<usize, TransportError> {
        if self.stop.is_cancelled() {
            return Err(TransportError::Closed);
        }
        if self.eof {
            return Ok(0);
        }
        let timeout = self.timeout;
        let mut chunk = vec![0u8; READ_CHUNK];
        let n = match timeout {
            Some(t) => tokio::time::timeout(t, self.sock.read(&mut chunk))
                .await
                .map_err(|_| TransportError::Timeout)??,
            None => self.sock.read(&mut chunk).await?,
        };
        if n == 0 {
            self.eof = true;
            return Ok(0);
        }
        chunk.truncate(n);
        self.buf.append(Bytes::from(chunk));
        Ok(n)
    }
}

impl Transport for TcpTransport {
    async fn poke(&mut self) -> Result<(), TransportError> {
        while self.buf.is_empty() {
            if self.fill().await? == 0 {
                return Err(TransportError::Closed);
            }
        }
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<Bytes, TransportError> {
        let mut chunks = 0usize;
        for _ in 0..MAX_ATTEMPTS {
            if let Some(line) = self.buf.take_line() {
                return Ok(line);
            }
            chunks += 1;
            if chunks > MAX_LINE_CHUNKS {
                return Err(TransportError::MaxIterations);
            }
            if self.fill().await? == 0 {
                return Err(TransportError::Closed);
            }
        }
        Err(TransportError::MaxIterations)
    }

    fn try_line(&mut self) -> Option<Bytes> {
        self.buf.take_line()
    }

    async fn recv_exact(&mut self, n: usize) -> Result<Bytes, TransportError> {
        for _ in 0..MAX_ATTEMPTS {
            if self.buf.len() >= n {
                return Ok(self.buf.consume(n));
            }
            if self.fill().await? == 0 {
                return Err(TransportError::Closed);
            }
        }
        Err(TransportError::MaxIterations)
    }

    async fn recv_all(&mut self) -> Result<Bytes, TransportError> {
        while self.fill().await? > 0 {}
        Ok(self.buf.consume_all())
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.stop.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.sock.write_all(data).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.sock.shutdown().await;
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}
