// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance cells and the instance thread body.
//!
//! An instance is one OS thread, one engine, one mailbox. The creating
//! thread blocks until the child flips its ACTIVE bit, so a returned id
//! always names a fully constructed instance.

use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;

use comexe_core::{FatalKind, InstanceId, Mailbox, StateCell, ACTIVE};
use parking_lot::Mutex;
use tracing::debug;

use crate::app::Application;
use crate::engine::InstanceCtx;

/// Shared record for one instance. The registry owns one Arc per live
/// instance; the instance thread holds another until it exits.
pub(crate) struct InstanceCell {
    id: AtomicU32,
    pub(crate) name: String,
    pub(crate) exit_event: Option<String>,
    pub(crate) parent: InstanceId,
    pub(crate) mailbox: Mailbox,
    pub(crate) state: StateCell,
    pub(crate) join: Mutex<Option<JoinHandle<()>>>,
}

impl InstanceCell {
    pub(crate) fn new(name: String, exit_event: Option<String>, parent: InstanceId) -> Self {
        Self {
            id: AtomicU32::new(InstanceId::INVALID.as_u32()),
            name,
            exit_event,
            parent,
            mailbox: Mailbox::new(),
            state: StateCell::new(),
            join: Mutex::new(None),
        }
    }

    pub(crate) fn set_id(&self, id: InstanceId) {
        self.id.store(id.as_u32(), Ordering::Release);
    }

    pub(crate) fn id(&self) -> InstanceId {
        InstanceId::from_raw(self.id.load(Ordering::Acquire))
    }
}

/// Per-thread platform bring-up. Windows needs apartment-threaded COM for
/// the service and shell bindings; everywhere else this is a no-op.
#[cfg(not(windows))]
pub(crate) fn platform_thread_init() {}

#[cfg(windows)]
pub(crate) fn platform_thread_init() {
    // Apartment-threaded COM init is performed by the win32 binding when it
    // is first required; nothing to do ahead of time here.
}

/// Body of every instance thread.
pub(crate) fn instance_thread(app: std::sync::Arc<Application>, cell: std::sync::Arc<InstanceCell>) {
    platform_thread_init();

    // Wake the parent blocked in spawn() before any fallible work, so the
    // returned id always refers to a constructed instance.
    cell.state.set(ACTIVE);

    let id = cell.id();
    let ctx = InstanceCtx { app: std::sync::Arc::clone(&app), id };
    debug!(instance = %id, name = %cell.name, "instance starting");

    if let Err(e) = bring_up(&app, ctx) {
        app.report_fatal(FatalKind::InitLoad, format!("instance {id} ({}): {e}", cell.name));
    }

    // Parent-exit notification: sent before the parent can observe this
    // instance missing from the registry (removal happens in join()).
    if let Some(event) = cell.exit_event.as_deref() {
        if !event.is_empty() {
            app.post(
                cell.parent,
                event,
                &[comexe_core::EventArg::Integer(i64::from(id.as_u32()))],
            );
        }
    }

    debug!(instance = %id, name = %cell.name, "instance finished");
}

/// Engine bring-up in the order the container guarantees: warnings wired,
/// `arg` table, standard libraries, preloads, then the init chunk.
fn bring_up(app: &Application, ctx: InstanceCtx) -> Result<(), crate::engine::EngineError> {
    let mut engine = app.factory().create(ctx)?;
    let router = if app.warnings_enabled() {
        crate::warn::WarningRouter::enabled()
    } else {
        crate::warn::WarningRouter::new()
    };
    engine.set_warning_router(router);
    engine.install_args(app.argv())?;
    engine.open_libraries()?;
    engine.register_preloads(crate::engine::PRELOADS)?;
    #[cfg(windows)]
    engine.register_preloads(crate::engine::WIN_PRELOADS)?;
    engine.exec_chunk(Application::INIT_CHUNK_NAME, app.init_chunk())
}
