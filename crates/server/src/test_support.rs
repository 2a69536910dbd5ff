// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for parser and protocol tests.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::chunk::ChunkBuffer;
use crate::transport::{Transport, TransportError};

/// Transport whose inbound bytes are fixed up front and whose outbound
/// bytes are captured. An exhausted input reads as peer-closed; a receive
/// wait with a timeout configured reads as the timer firing.
pub struct MockTransport {
    buf: ChunkBuffer,
    pub sent: Vec<u8>,
    timeout: Option<Duration>,
}

impl MockTransport {
    pub fn with_input(input: &[u8]) -> Self {
        let mut buf = ChunkBuffer::new();
        buf.append(Bytes::copy_from_slice(input));
        Self { buf, sent: Vec::new(), timeout: None }
    }

    pub fn empty() -> Self {
        Self::with_input(&[])
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }
}

impl Transport for MockTransport {
    async fn poke(&mut self) -> Result<(), TransportError> {
        if !self.buf.is_empty() {
            return Ok(());
        }
        if self.timeout.is_some() {
            return Err(TransportError::Timeout);
        }
        Err(TransportError::Closed)
    }

    async fn recv_line(&mut self) -> Result<Bytes, TransportError> {
        self.buf.take_line().ok_or(TransportError::Closed)
    }

    fn try_line(&mut self) -> Option<Bytes> {
        self.buf.take_line()
    }

    async fn recv_exact(&mut self, n: usize) -> Result<Bytes, TransportError> {
        if self.buf.len() < n {
            return Err(TransportError::Closed);
        }
        Ok(self.buf.consume(n))
    }

    async fn recv_all(&mut self) -> Result<Bytes, TransportError> {
        Ok(self.buf.consume_all())
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.extend_from_slice(data);
        Ok(())
    }

    async fn close(&mut self) {}

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
