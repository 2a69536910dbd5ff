// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type carrying a process exit code.
//!
//! Command code returns `ExitError` instead of calling
//! `std::process::exit()` directly, so `main()` owns process termination
//! and the distinct fatal categories keep their codes.

use std::fmt;

use comexe_core::{Fatal, FatalKind};

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Usage or fatal host error (exit 1).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(FatalKind::Usage.exit_code(), message)
    }
}

impl From<Fatal> for ExitError {
    fn from(fatal: Fatal) -> Self {
        Self::new(fatal.kind.exit_code(), fatal.message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
