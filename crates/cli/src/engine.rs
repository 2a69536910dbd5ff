// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine binding point.
//!
//! The interpreter is an external collaborator consumed through the
//! [`comexe_runtime::EngineFactory`] contract. A distribution links its
//! binding here; the stock build carries none, so script execution paths
//! report a usage error while the packaging tools stay fully functional.

use std::sync::Arc;

use comexe_runtime::EngineFactory;

/// The factory for the interpreter binding linked into this build, if any.
pub fn linked_factory() -> Option<Arc<dyn EngineFactory>> {
    None
}
