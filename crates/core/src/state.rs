// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance state bits behind a mutex + condition pair.
//!
//! Separate from the event mutex: senders setting EVENTS_PENDING never
//! contend with a drain that is walking a swapped-out buffer. A cooperative
//! loop may additionally register an async waker so `post` wakes it without
//! blocking the runtime on the condvar.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// The instance thread finished its bring-up and the returned id is safe
/// to use.
pub const ACTIVE: u8 = 0b001;
/// The mailbox holds at least one undrained frame.
pub const EVENTS_PENDING: u8 = 0b010;
/// `stop_loop` was called; the loop exits after the current drain.
pub const LOOP_CLOSE_REQUEST: u8 = 0b100;

/// State bitmask guarded by its own mutex, with a condvar for blocking
/// waiters and an optional [`Notify`] for a cooperative loop.
#[derive(Default)]
pub struct StateCell {
    bits: Mutex<u8>,
    cond: Condvar,
    waker: Mutex<Option<Arc<Notify>>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bits and wake every waiter (condvar and registered waker).
    pub fn set(&self, bits: u8) {
        *self.bits.lock() |= bits;
        self.cond.notify_all();
        if let Some(waker) = self.waker.lock().as_ref() {
            waker.notify_one();
        }
    }

    pub fn clear(&self, bits: u8) {
        *self.bits.lock() &= !bits;
    }

    pub fn contains(&self, bits: u8) -> bool {
        *self.bits.lock() & bits == bits
    }

    /// Block until any bit of `mask` is set; returns the bits seen.
    pub fn wait_any(&self, mask: u8) -> u8 {
        let mut bits = self.bits.lock();
        while *bits & mask == 0 {
            self.cond.wait(&mut bits);
        }
        *bits & mask
    }

    /// Snapshot of `mask` bits without blocking.
    pub fn peek(&self, mask: u8) -> u8 {
        *self.bits.lock() & mask
    }

    /// Install an async waker that `set` signals alongside the condvar.
    /// The cooperative loop of a serving instance registers one so event
    /// posts interleave with I/O ticks.
    pub fn register_waker(&self, waker: Arc<Notify>) {
        *self.waker.lock() = Some(waker);
    }

    pub fn clear_waker(&self) {
        *self.waker.lock() = None;
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
