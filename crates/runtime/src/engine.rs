// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script engine seam.
//!
//! The interpreter is an external collaborator: the container only imposes
//! this contract on it. One engine per instance, created on the instance's
//! own thread and never shared; values cross instances only as [`EventArg`]
//! copies through the bus.

use std::sync::Arc;

use comexe_core::{EventArg, InstanceId};
use thiserror::Error;

use crate::app::Application;

/// Preloaded native module names visible to script, fixed at build time.
pub const PRELOADS: &[&str] = &[
    "com.raw.runtime",
    "com.thread",
    "com.event",
    "com.raw.buffer",
    "com.raw.minizip",
    "com.raw.libffi",
    "com.raw.libtcc",
    "com.coio",
    "com.socket.core",
    "com.mime.core",
    "com.tls",
];

/// Extra preloads registered on Windows builds.
#[cfg(windows)]
pub const WIN_PRELOADS: &[&str] = &["com.raw.win32", "com.raw.win32.com", "com.raw.win32.service"];

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine creation failed: {0}")]
    Create(String),

    #[error("no such global {0:?}")]
    NoSuchGlobal(String),

    #[error("chunk {name:?} failed: {message}")]
    Chunk { name: String, message: String },

    #[error("script error: {0}")]
    Script(String),

    #[error("no compiler in this build")]
    NoCompiler,
}

/// Host context handed to each engine so its bindings can reach the bus and
/// the container. Cross-instance references stay numeric ids resolved
/// through the registry, never live pointers.
#[derive(Clone)]
pub struct InstanceCtx {
    pub app: Arc<Application>,
    pub id: InstanceId,
}

/// Contract the container imposes on an embedded interpreter.
///
/// Engines are single-threaded: every method runs on the owning instance's
/// thread. Host code never panics on script errors; they surface as
/// [`EngineError`] values.
pub trait ScriptEngine: Send {
    /// Install the `arg` table: positive indices 1..argc from the
    /// application's argv.
    fn install_args(&mut self, args: &[String]) -> Result<(), EngineError>;

    /// Open the standard interpreter libraries.
    fn open_libraries(&mut self) -> Result<(), EngineError>;

    /// Register the preloaded native modules.
    fn register_preloads(&mut self, modules: &[&str]) -> Result<(), EngineError>;

    /// Load and execute a chunk under the given name.
    fn exec_chunk(&mut self, name: &str, chunk: &[u8]) -> Result<(), EngineError>;

    /// Invoke a script function by global name. The event loop routes every
    /// drained frame through this.
    fn call_global(&mut self, name: &[u8], args: &[EventArg]) -> Result<(), EngineError>;

    /// Install the host warning router; the engine delivers interpreter
    /// warnings to it as (message, to-be-continued) pairs. Engines without
    /// a warning system ignore it.
    fn set_warning_router(&mut self, _router: crate::warn::WarningRouter) {}

    /// Compile a source file to a loadable chunk, when the engine carries a
    /// compiler. The stock contract is [`EngineError::NoCompiler`].
    fn compile_chunk(&mut self, _name: &str, _source: &[u8]) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::NoCompiler)
    }
}

/// Creates one engine per instance, on the instance's thread.
pub trait EngineFactory: Send + Sync {
    fn create(&self, ctx: InstanceCtx) -> Result<Box<dyn ScriptEngine>, EngineError>;
}
