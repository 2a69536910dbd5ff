// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS adapter over a synchronous sans-IO engine.
//!
//! The engine's read/write callbacks run inside a non-yieldable frame, so
//! they only ever see already-buffered bytes and report would-block by
//! returning partial results. All actual waiting happens out here on the
//! cooperative scheduler: the handshake loops `step` and yields between
//! steps, and every long-running loop checks both the peer-closed flag and
//! the server stop token, aborting with "closed".

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::chunk::ChunkBuffer;
use crate::transport::{Transport, TransportError, MAX_ATTEMPTS, MAX_LINE_CHUNKS, READ_CHUNK};

/// Result of one `process_packets` call.
pub struct TlsIoState {
    pub plaintext_bytes: usize,
    pub peer_closed: bool,
}

/// Contract imposed on the TLS engine: a synchronous state machine that
/// never blocks and never yields. Ciphertext moves through `read_tls` /
/// `write_tls`; plaintext through the paired plaintext calls.
pub trait TlsSession {
    fn is_handshaking(&self) -> bool;
    fn wants_read(&self) -> bool;
    fn wants_write(&self) -> bool;

    /// Feed ciphertext from the wire. `Ok(0)` means the input was empty.
    fn read_tls(&mut self, input: &mut dyn Read) -> std::io::Result<usize>;

    /// Drain ciphertext for the wire.
    fn write_tls(&mut self, output: &mut dyn Write) -> std::io::Result<usize>;

    fn process_packets(&mut self) -> Result<TlsIoState, TransportError>;

    /// Decrypted application bytes. `WouldBlock` means none are available
    /// yet; `Ok(0)` means the peer sent close-notify.
    fn read_plaintext(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    fn write_plaintext(&mut self, data: &[u8]) -> std::io::Result<usize>;

    fn send_close_notify(&mut self);
}

/// Creates one session per accepted connection.
pub trait SessionFactory {
    fn create(&self) -> Result<Box<dyn TlsSession>, TransportError>;
}

/// The stock engine: rustls server sessions.
pub struct RustlsFactory {
    config: Arc<rustls::ServerConfig>,
}

impl RustlsFactory {
    pub fn new(config: Arc<rustls::ServerConfig>) -> Self {
        Self { config }
    }
}

impl SessionFactory for RustlsFactory {
    fn create(&self) -> Result<Box<dyn TlsSession>, TransportError> {
        let conn = rustls::ServerConnection::new(Arc::clone(&self.config))
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Box::new(RustlsSession { conn }))
    }
}

struct RustlsSession {
    conn: rustls::ServerConnection,
}

impl TlsSession for RustlsSession {
    fn is_handshaking(&self) -> bool {
        self.conn.is_handshaking()
    }

    fn wants_read(&self) -> bool {
        self.conn.wants_read()
    }

    fn wants_write(&self) -> bool {
        self.conn.wants_write()
    }

    fn read_tls(&mut self, input: &mut dyn Read) -> std::io::Result<usize> {
        self.conn.read_tls(input)
    }

    fn write_tls(&mut self, output: &mut dyn Write) -> std::io::Result<usize> {
        self.conn.write_tls(output)
    }

    fn process_packets(&mut self) -> Result<TlsIoState, TransportError> {
        let state = self
            .conn
            .process_new_packets()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(TlsIoState {
            plaintext_bytes: state.plaintext_bytes_to_read(),
            peer_closed: state.peer_has_closed(),
        })
    }

    fn read_plaintext(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.conn.reader().read(buf)
    }

    fn write_plaintext(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.conn.writer().write(data)
    }

    fn send_close_notify(&mut self) {
        self.conn.send_close_notify();
    }
}

/// Socket-shaped adapter over a TLS session plus the raw socket.
pub struct TlsTransport {
    sock: TcpStream,
    sess: Box<dyn TlsSession>,
    buf: ChunkBuffer,
    stop: CancellationToken,
    timeout: Option<Duration>,
    peer: Option<SocketAddr>,
    /// Flipped when the peer closes, during handshake or after; every
    /// adapter loop observes it.
    closed: bool,
}

impl TlsTransport {
    pub fn new(sock: TcpStream, sess: Box<dyn TlsSession>, stop: CancellationToken) -> Self {
        let peer = sock.peer_addr().ok();
        Self { sock, sess, buf: ChunkBuffer::new(), stop, timeout: None, peer, closed: false }
    }

    /// Drive the handshake cooperatively, yielding between engine steps.
    /// `cap` bounds the number of steps.
    pub async fn handshake(&mut self, cap: u32) -> Result<(), TransportError> {
        let mut attempts: u32 = 0;
        while self.sess.is_handshaking() {
            attempts += 1;
            if attempts > cap {
                return Err(TransportError::HandshakeTimeout { attempts, cap });
            }
            if self.stop.is_cancelled() || self.closed {
                return Err(TransportError::Closed);
            }
            if self.sess.wants_write() {
                self.flush_tls().await?;
            } else if self.sess.wants_read() {
                self.pump_ciphertext().await?;
            }
            tokio::task::yield_now().await;
        }
        // Flush any handshake tail (e.g. the final flight or tickets).
        self.flush_tls().await?;
        Ok(())
    }

    /// Write pending ciphertext to the socket until the engine is drained.
    async fn flush_tls(&mut self) -> Result<(), TransportError> {
        while self.sess.wants_write() {
            let mut out = Vec::new();
            self.sess.write_tls(&mut out)?;
            if out.is_empty() {
                break;
            }
            self.sock.write_all(&out).await?;
        }
        Ok(())
    }

    /// One socket read fed into the engine. Flips `closed` when the peer
    /// goes away at the raw layer.
    async fn pump_ciphertext(&mut self) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let mut cipher = vec![0u8; READ_CHUNK];
        let n = match timeout {
            Some(t) => tokio::time::timeout(t, self.sock.read(&mut cipher))
                .await
                .map_err(|_| TransportError::Timeout)??,
            None => self.sock.read(&mut cipher).await?,
        };
        if n == 0 {
            self.closed = true;
            return Err(TransportError::Closed);
        }
        let mut input = &cipher[..n];
        while !input.is_empty() {
            if self.sess.read_tls(&mut input)? == 0 {
                break;
            }
            let state = self.sess.process_packets()?;
            if state.peer_closed {
                self.closed = true;
            }
        }
        Ok(())
    }

    /// Move decrypted bytes into the chunk buffer; `Ok(0)` is EOF.
    async fn fill(&mut self) -> Result<usize, TransportError> {
        loop {
            if self.stop.is_cancelled() {
                return Err(TransportError::Closed);
            }
            let mut plain = vec![0u8; READ_CHUNK];
            match self.sess.read_plaintext(&mut plain) {
                Ok(0) => {
                    // Clean close-notify, or nothing decrypted yet.
                    if self.closed {
                        return Ok(0);
                    }
                }
                Ok(n) => {
                    plain.truncate(n);
                    self.buf.append(Bytes::from(plain));
                    return Ok(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(TransportError::Io(e)),
            }
            if self.closed {
                return Ok(0);
            }
            if self.sess.wants_write() {
                self.flush_tls().await?;
            }
            match self.pump_ciphertext().await {
                Ok(()) => {}
                Err(TransportError::Closed) => return Ok(0),
                Err(e) => return Err(e),
            }
        }
    }
}

impl Transport for TlsTransport {
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
        if self.stop.is_cancelled() || self.closed {
            return Err(TransportError::Closed);
        }
        let mut written = 0;
        while written < data.len() {
            written += self.sess.write_plaintext(&data[written..])?;
            self.flush_tls().await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.sess.send_close_notify();
        let _ = self.flush_tls().await;
        let _ = self.sock.shutdown().await;
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
