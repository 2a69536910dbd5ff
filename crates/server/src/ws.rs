// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade and framing (RFC 6455), server side.
//!
//! Client frames must be masked; server frames go out unmasked with the
//! smallest length encoding that fits. The 64-bit length form uses only
//! its low 32 bits; frames above 4 GiB are not supported.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::request::Request;
use crate::transport::{Transport, TransportError};

/// Fixed accept-key suffix from RFC 6455.
pub const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl Opcode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Reserved(other),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Reserved(other) => other & 0x0F,
        }
    }
}

#[derive(Debug, Error)]
pub enum WsError {
    #[error("not a websocket upgrade request")]
    NotUpgrade,

    #[error("client frame not masked")]
    UnmaskedClient,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A request qualifies when it carries `upgrade: websocket`, a `connection`
/// containing `upgrade`, and a `sec-websocket-key`.
pub fn is_upgrade(req: &Request) -> bool {
    let upgrade = req
        .header("upgrade")
        .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    let connection = req
        .header("connection")
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    upgrade && connection && req.header("sec-websocket-key").is_some()
}

/// `base64(sha1(key + GUID))`.
pub fn accept_key(client_key: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(client_key.as_bytes());
    sha.update(GUID.as_bytes());
    BASE64.encode(sha.finalize())
}

/// Close-frame payload decoded into (status code, reason bytes). An empty
/// payload means code 1000 with an empty reason.
pub fn close_info(payload: &[u8]) -> (u16, Vec<u8>) {
    if payload.len() >= 2 {
        (u16::from_be_bytes([payload[0], payload[1]]), payload[2..].to_vec())
    } else {
        (1000, Vec::new())
    }
}

/// Perform the 101 handshake and take over the transport.
///
/// `protocol` is the sub-protocol the application wants to accept; with no
/// preference the `Sec-WebSocket-Protocol` response header is omitted.
/// Marks the request `upgraded` so the HTTP loop stops owning the socket.
pub async fn accept<'a, T: Transport>(
    req: &mut Request,
    transport: &'a mut T,
    protocol: Option<&str>,
) -> Result<WebSocket<'a, T>, WsError> {
    if !is_upgrade(req) {
        return Err(WsError::NotUpgrade);
    }
    let key = req.header("sec-websocket-key").ok_or(WsError::NotUpgrade)?;

    let mut raw = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n",
        accept_key(key)
    );
    if let Some(protocol) = protocol {
        raw.push_str(&format!("Sec-WebSocket-Protocol: {protocol}\r\n"));
    }
    raw.push_str("\r\n");
    transport.send(raw.as_bytes()).await?;

    req.upgraded = true;
    Ok(WebSocket { transport, closed: false })
}

/// Frame-level connection after a successful upgrade.
pub struct WebSocket<'a, T: Transport> {
    transport: &'a mut T,
    closed: bool,
}

impl<T: Transport> WebSocket<'_, T> {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receive the next data frame.
    ///
    /// CLOSE is answered with a matching CLOSE (echoing the code, default
    /// 1000) and returned with the connection marked closed. PING is
    /// answered with a PONG carrying the same payload; PONG is swallowed.
    /// Both yield back to the scheduler before the next read.
    pub async fn receive(&mut self) -> Result<(Vec<u8>, Opcode), WsError> {
        loop {
            let (payload, opcode, _fin) = self.read_frame().await?;
            match opcode {
                Opcode::Close => {
                    if !self.closed {
                        let (code, _) = close_info(&payload);
                        self.write_frame(&code.to_be_bytes(), Opcode::Close).await?;
                        self.closed = true;
                    }
                    return Ok((payload, Opcode::Close));
                }
                Opcode::Ping => {
                    self.write_frame(&payload, Opcode::Pong).await?;
                    tokio::task::yield_now().await;
                }
                Opcode::Pong => {
                    tokio::task::yield_now().await;
                }
                other => return Ok((payload, other)),
            }
        }
    }

    /// Send one unmasked frame with FIN set.
    pub async fn send(&mut self, payload: &[u8], opcode: Opcode) -> Result<(), WsError> {
        if self.closed {
            return Err(WsError::Transport(TransportError::Closed));
        }
        self.write_frame(payload, opcode).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), WsError> {
        self.send(text.as_bytes(), Opcode::Text).await
    }

    pub async fn send_binary(&mut self, payload: &[u8]) -> Result<(), WsError> {
        self.send(payload, Opcode::Binary).await
    }

    /// Initiate a close with the given status code.
    pub async fn close(&mut self, code: u16) -> Result<(), WsError> {
        if !self.closed {
            self.write_frame(&code.to_be_bytes(), Opcode::Close).await?;
            self.closed = true;
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<(Vec<u8>, Opcode, bool), WsError> {
        let head = self.transport.recv_exact(2).await?;
        let fin = head[0] & 0x80 != 0;
        let opcode = Opcode::from_bits(head[0] & 0x0F);
        let masked = head[1] & 0x80 != 0;
        let mut len = u64::from(head[1] & 0x7F);

        if len == 126 {
            let ext = self.transport.recv_exact(2).await?;
            len = u64::from(u16::from_be_bytes([ext[0], ext[1]]));
        } else if len == 127 {
            let ext = self.transport.recv_exact(8).await?;
            let full = u64::from_be_bytes([
                ext[0], ext[1], ext[2], ext[3], ext[4], ext[5], ext[6], ext[7],
            ]);
            // Only the low 32 bits are honoured.
            len = full & 0xFFFF_FFFF;
        }

        if !masked {
            return Err(WsError::UnmaskedClient);
        }
        let key = self.transport.recv_exact(4).await?;
        let mut payload = self.transport.recv_exact(len as usize).await?.to_vec();
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
        Ok((payload, opcode, fin))
    }

    async fn write_frame(&mut self, payload: &[u8], opcode: Opcode) -> Result<(), WsError> {
        self.transport.send(&encode_frame(payload, opcode)).await?;
        Ok(())
    }
}

/// Server→client frame bytes: FIN set, unmasked, smallest length form.
pub fn encode_frame(payload: &[u8], opcode: Opcode) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 10);
    frame.push(0x80 | opcode.bits());
    let len = payload.len();
    if len < 126 {
        frame.push(len as u8);
    } else if len <= 0xFFFF {
        frame.push(126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(127);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }
    frame.extend_from_slice(payload);
    frame
}

/// Decode one server-format (unmasked) frame from a byte slice, returning
/// the payload, opcode, and consumed length.
pub fn decode_frame(raw: &[u8]) -> Option<(Vec<u8>, Opcode, usize)> {
    if raw.len() < 2 {
        return None;
    }
    let opcode = Opcode::from_bits(raw[0] & 0x0F);
    let mut len = u64::from(raw[1] & 0x7F);
    let mut offset = 2;
    if len == 126 {
        len = u64::from(u16::from_be_bytes([*raw.get(2)?, *raw.get(3)?]));
        offset = 4;
    } else if len == 127 {
        let mut ext = [0u8; 8];
        ext.copy_from_slice(raw.get(2..10)?);
        len = u64::from_be_bytes(ext) & 0xFFFF_FFFF;
        offset = 10;
    }
    let end = offset + len as usize;
    let payload = raw.get(offset..end)?.to_vec();
    Some((payload, opcode, end))
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
