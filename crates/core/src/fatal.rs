// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fatal error categories with distinct process exit codes.
//!
//! These are host errors the process cannot continue past: the diagnostic
//! message is printed and the process exits with the category's code.
//! `main()` performs the exit; library code only constructs and returns.

use std::fmt;

/// Fatal category. Discriminants are the process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// Usage or fatal host error.
    Usage = 1,
    /// Event-buffer protocol corruption.
    BufferCorrupt = 2,
    /// A sender passed a value no event frame can carry.
    UnknownArgType = 3,
    /// An event named a script global that does not exist.
    MissingHandler = 4,
    /// The embedded init chunk failed to load or run.
    InitLoad = 5,
}

impl FatalKind {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// A fatal error carrying its category and a diagnostic message.
#[derive(Debug)]
pub struct Fatal {
    pub kind: FatalKind,
    pub message: String,
}

impl Fatal {
    pub fn new(kind: FatalKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Fatal {}
