// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segmented byte queue for the transport adapters.
//!
//! `append` stores each chunk by reference; `consume` and `take_line`
//! splice across chunks as needed. A resumable newline cursor makes
//! repeated "line present?" probes O(new bytes), not O(buffered bytes).

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

#[derive(Default)]
pub struct ChunkBuffer {
    segs: VecDeque<Bytes>,
    len: usize,
    /// Bytes from the front already scanned for a newline without finding
    /// one. Reset whenever a line is taken or those bytes are consumed.
    scanned: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk without copying it.
    pub fn append(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.segs.push_back(chunk);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove and return exactly `n` buffered bytes. Callers check `len`
    /// first; asking for more than is buffered returns what is there.
    pub fn consume(&mut self, n: usize) -> Bytes {
        let n = n.min(self.len);
        self.scanned = self.scanned.saturating_sub(n);
        self.len -= n;

        match self.segs.front_mut() {
            Some(first) if first.len() >= n => {
                let out = first.split_to(n);
                if first.is_empty() {
                    self.segs.pop_front();
                }
                return out;
            }
            _ => {}
        }

        // Spliced across segments.
        let mut out = BytesMut::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let Some(mut seg) = self.segs.pop_front() else { break };
            if seg.len() <= remaining {
                remaining -= seg.len();
                out.extend_from_slice(&seg);
            } else {
                out.extend_from_slice(&seg.split_to(remaining));
                remaining = 0;
                self.segs.push_front(seg);
            }
        }
        out.freeze()
    }

    /// Drain everything buffered as one chunk.
    pub fn consume_all(&mut self) -> Bytes {
        let len = self.len;
        self.consume(len)
    }

    /// Return one complete line if a newline is buffered, with the
    /// terminator (CRLF or bare LF) stripped.
    pub fn take_line(&mut self) -> Option<Bytes> {
        let pos = self.find_newline()?;
        let mut line = self.consume(pos + 1);
        // Strip LF, then an optional preceding CR.
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(line)
    }

    /// First unscanned byte onward is searched; scanned prefix is skipped.
    fn find_newline(&mut self) -> Option<usize> {
        let mut offset = 0;
        for seg in &self.segs {
            if offset + seg.len() <= self.scanned {
                offset += seg.len();
                continue;
            }
            let start = self.scanned.saturating_sub(offset);
            if let Some(pos) = seg[start..].iter().position(|&b| b == b'\n') {
                return Some(offset + start + pos);
            }
            offset += seg.len();
        }
        self.scanned = self.len;
        None
    }
}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
