// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! comexe-pack: ZIP self-inspection and the merging packager.
//!
//! The running executable is itself a ZIP archive: the native image comes
//! first and the archive is appended, so the reader locates the central
//! directory from the end of the file and offsets every entry by the
//! archive base. The merger composes new images from inline entries,
//! directories, and other archives under ordered include/exclude rules.

pub mod merge;
pub mod read;
pub mod selfpath;
pub mod write;

pub use merge::{merge, MergeError, MergeReport, MergeSpec, Rule, RuleAction, Source, SourceKind};
pub use read::{EntryInfo, ZipError, ZipReader};
pub use write::ZipWriter;
