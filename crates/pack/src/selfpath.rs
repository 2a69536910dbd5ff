// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening the running image as an archive.

use std::path::PathBuf;

use crate::read::{ZipError, ZipReader};

/// Absolute path of the running executable.
pub fn current_exe() -> std::io::Result<PathBuf> {
    std::env::current_exe()
}

/// Open the running executable as a ZIP archive. Works because the build
/// appends the archive to the native image and the reader locates the
/// central directory from the end of the file.
pub fn open_self() -> Result<ZipReader, ZipError> {
    let path = current_exe()?;
    ZipReader::open(&path)
}
