// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed event frames carried across instance boundaries.
//!
//! A logical event is one frame: START(arg_count) | arg × n | END. Frames
//! are serialized into an append-only [`EventBuffer`]; each instance owns a
//! [`Mailbox`] holding two buffers so enqueuers never block on drains.
//!
//! Values always cross by copy. There are no tables, functions, or live
//! interpreter references in a frame; the only by-reference escape hatch is
//! `Opaque`, a pointer-sized token the bus never dereferences or frees.

use thiserror::Error;

use parking_lot::Mutex;

/// One argument in a cross-thread event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    Nil,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// Raw bytes; script strings are byte strings, not UTF-8.
    Str(Vec<u8>),
    /// Opaque pointer-sized token passed by explicit contract between
    /// sender and receiver. Not owned, not freed by the bus.
    Opaque(usize),
}

impl EventArg {
    pub fn str(s: impl Into<Vec<u8>>) -> Self {
        EventArg::Str(s.into())
    }

    /// Borrow the bytes if this is a `Str` argument.
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            EventArg::Str(b) => Some(b),
            _ => None,
        }
    }
}

/// Decode-side frame protocol violations. Any of these is fatal to the
/// process: the sender wrote something the receiver cannot safely interpret.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("event frame truncated at offset {0}")]
    Truncated(usize),

    #[error("unknown event frame tag 0x{0:02x}")]
    BadTag(u8),

    #[error("event frame declared {declared} args, found {found}")]
    CountMismatch { declared: u32, found: u32 },

    #[error("event frame missing START tag")]
    MissingStart,

    #[error("event frame missing END tag")]
    MissingEnd,
}

const TAG_START: u8 = 0xF0;
const TAG_END: u8 = 0xF1;
const TAG_NIL: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_DOUBLE: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_OPAQUE: u8 = 0x05;

/// Append-only bump region holding serialized frames, with a parallel
/// frame index so readers can walk events in arrival order.
#[derive(Default)]
pub struct EventBuffer {
    bytes: Vec<u8>,
    frames: Vec<(usize, usize)>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize one START|args|END frame at the end of the region.
    pub fn push_frame(&mut self, args: &[EventArg]) {
        let start = self.bytes.len();
        self.bytes.push(TAG_START);
        self.bytes.extend_from_slice(&(args.len() as u32).to_le_bytes());
        for arg in args {
            encode_arg(&mut self.bytes, arg);
        }
        self.bytes.push(TAG_END);
        self.frames.push((start, self.bytes.len() - start));
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Clear contents, keeping allocated capacity for reuse.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.frames.clear();
    }

    /// Walk frames in order, decoding each into its argument list.
    pub fn iter(&self) -> impl Iterator<Item = Result<Vec<EventArg>, FrameError>> + '_ {
        self.frames.iter().map(move |&(off, len)| decode_frame(&self.bytes[off..off + len]))
    }
}

fn encode_arg(out: &mut Vec<u8>, arg: &EventArg) {
    match arg {
        EventArg::Nil => out.push(TAG_NIL),
        EventArg::Boolean(b) => {
            out.push(TAG_BOOLEAN);
            out.push(u8::from(*b));
        }
        EventArg::Integer(i) => {
            out.push(TAG_INTEGER);
            out.extend_from_slice(&i.to_le_bytes());
        }
        EventArg::Double(d) => {
            out.push(TAG_DOUBLE);
            out.extend_from_slice(&d.to_le_bytes());
        }
        EventArg::Str(bytes) => {
            out.push(TAG_STR);
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }
        EventArg::Opaque(p) => {
            out.push(TAG_OPAQUE);
            out.extend_from_slice(&(*p as u64).to_le_bytes());
        }
    }
}

fn decode_frame(buf: &[u8]) -> Result<Vec<EventArg>, FrameError> {
    let mut pos = 0usize;
    if take(buf, &mut pos, 1)?[0] != TAG_START {
        return Err(FrameError::MissingStart);
    }
    let declared = u32::from_le_bytes(take4(buf, &mut pos)?);
    let mut args = Vec::with_capacity(declared as usize);
    loop {
        let tag = take(buf, &mut pos, 1)?[0];
        match tag {
            TAG_END => break,
            TAG_NIL => args.push(EventArg::Nil),
            TAG_BOOLEAN => args.push(EventArg::Boolean(take(buf, &mut pos, 1)?[0] != 0)),
            TAG_INTEGER => args.push(EventArg::Integer(i64::from_le_bytes(take8(buf, &mut pos)?))),
            TAG_DOUBLE => args.push(EventArg::Double(f64::from_le_bytes(take8(buf, &mut pos)?))),
            TAG_STR => {
                let len = u32::from_le_bytes(take4(buf, &mut pos)?) as usize;
                args.push(EventArg::Str(take(buf, &mut pos, len)?.to_vec()));
            }
            TAG_OPAQUE => {
                args.push(EventArg::Opaque(u64::from_le_bytes(take8(buf, &mut pos)?) as usize));
            }
            other => return Err(FrameError::BadTag(other)),
        }
        if args.len() > declared as usize {
            return Err(FrameError::CountMismatch { declared, found: args.len() as u32 });
        }
    }
    if args.len() != declared as usize {
        return Err(FrameError::CountMismatch { declared, found: args.len() as u32 });
    }
    Ok(args)
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], FrameError> {
    let end = pos.checked_add(n).ok_or(FrameError::Truncated(*pos))?;
    if end > buf.len() {
        return Err(FrameError::Truncated(*pos));
    }
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

fn take4(buf: &[u8], pos: &mut usize) -> Result<[u8; 4], FrameError> {
    let s = take(buf, pos, 4)?;
    Ok([s[0], s[1], s[2], s[3]])
}

fn take8(buf: &[u8], pos: &mut usize) -> Result<[u8; 8], FrameError> {
    let s = take(buf, pos, 8)?;
    Ok([s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]])
}

/// Per-instance inbox: a receive buffer enqueuers append to and a spare the
/// drainer swaps in, both behind one event mutex. The drain walk itself runs
/// with the lock released, so senders only ever contend on the append.
#[derive(Default)]
pub struct Mailbox {
    inner: Mutex<MailboxInner>,
}

#[derive(Default)]
struct MailboxInner {
    receive: EventBuffer,
    spare: EventBuffer,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy one event frame into the receive buffer.
    pub fn push(&self, args: &[EventArg]) {
        self.inner.lock().receive.push_frame(args);
    }

    /// Exchange receive and spare buffers, returning the filled one to walk
    /// without holding the lock. Give it back with [`Mailbox::recycle`].
    pub fn swap(&self) -> EventBuffer {
        let mut inner = self.inner.lock();
        let spare = std::mem::take(&mut inner.spare);
        std::mem::replace(&mut inner.receive, spare)
    }

    /// Return a drained buffer so its capacity is reused by the next swap.
    pub fn recycle(&self, mut buf: EventBuffer) {
        buf.reset();
        self.inner.lock().spare = buf;
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.lock().receive.frame_count()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
