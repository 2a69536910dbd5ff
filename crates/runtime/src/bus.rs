// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-thread event bus operations.
//!
//! `post` and `broadcast` copy typed argument frames into the target's
//! mailbox; delivery happens on the target's own thread via `run_loop` (a
//! blocking drain/sleep loop) or `process_events` (one non-blocking pass,
//! for instances that interleave drains with a cooperative I/O loop).

use std::sync::Arc;

use comexe_core::{
    EventArg, Fatal, FatalKind, InstanceId, EVENTS_PENDING, LOOP_CLOSE_REQUEST,
};
use tracing::error;

use crate::app::Application;
use crate::engine::{EngineError, ScriptEngine};
use crate::instance::InstanceCell;

impl Application {
    /// Deliver one event to `target`'s mailbox. The frame carries the event
    /// name as its first STRING argument; the receiver invokes the script
    /// global of that name with the remaining arguments.
    ///
    /// Returns `false` when the target id names no live instance.
    pub fn post(&self, target: InstanceId, event_name: &str, args: &[EventArg]) -> bool {
        let cell = self.registry.lock().get(target).map(Arc::clone);
        let Some(cell) = cell else { return false };

        let mut frame = Vec::with_capacity(args.len() + 1);
        frame.push(EventArg::str(event_name.as_bytes()));
        frame.extend_from_slice(args);

        cell.mailbox.push(&frame);
        cell.state.set(EVENTS_PENDING);
        true
    }

    /// Post the event to every live instance. The registry bound is
    /// snapshotted once; instances added or removed mid-iteration may or
    /// may not see the event.
    pub fn broadcast(&self, event_name: &str, args: &[EventArg]) -> usize {
        let capacity = self.registry.lock().capacity();
        let mut delivered = 0;
        for raw in 1..capacity {
            if self.post(InstanceId::from_raw(raw), event_name, args) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Request that `target`'s running event loop exit after it finishes
    /// its current drain.
    pub fn stop_loop(&self, target: InstanceId) -> bool {
        let cell = self.registry.lock().get(target).map(Arc::clone);
        let Some(cell) = cell else { return false };
        cell.state.set(LOOP_CLOSE_REQUEST);
        true
    }

    /// Register an async waker signalled whenever state bits are set on
    /// `id`, so a cooperative scheduler can interleave one event pass per
    /// loop tick instead of blocking on the condvar.
    pub fn register_event_waker(&self, id: InstanceId, waker: Arc<tokio::sync::Notify>) -> bool {
        let cell = self.registry.lock().get(id).map(Arc::clone);
        match cell {
            Some(cell) => {
                cell.state.register_waker(waker);
                true
            }
            None => false,
        }
    }

    /// Blocking event loop for `id`: alternate between draining events and
    /// sleeping on the instance condition until a close is requested.
    ///
    /// Must be called on the instance's own thread with its engine.
    pub fn run_loop(&self, id: InstanceId, engine: &mut dyn ScriptEngine) -> Result<(), Fatal> {
        let cell = self.registry.lock().get(id).map(Arc::clone);
        let Some(cell) = cell else {
            return Err(Fatal::new(FatalKind::Usage, format!("run_loop on unknown instance {id}")));
        };

        loop {
            let bits = cell.state.wait_any(EVENTS_PENDING | LOOP_CLOSE_REQUEST);
            if bits & EVENTS_PENDING != 0 {
                drain(self, &cell, engine)?;
            }
            if cell.state.peek(LOOP_CLOSE_REQUEST) != 0 {
                cell.state.clear(LOOP_CLOSE_REQUEST);
                return Ok(());
            }
        }
    }

    /// One non-blocking drain pass for `id`. Returns the number of frames
    /// delivered.
    pub fn process_events(
        &self,
        id: InstanceId,
        engine: &mut dyn ScriptEngine,
    ) -> Result<usize, Fatal> {
        let cell = self.registry.lock().get(id).map(Arc::clone);
        let Some(cell) = cell else { return Ok(0) };
        if cell.state.peek(EVENTS_PENDING) == 0 {
            return Ok(0);
        }
        drain(self, &cell, engine)
    }

    /// True when a close request is pending on `id`.
    pub fn close_requested(&self, id: InstanceId) -> bool {
        self.registry
            .lock()
            .get(id)
            .map(|cell| cell.state.peek(LOOP_CLOSE_REQUEST) != 0)
            .unwrap_or(true)
    }
}

/// Swap buffers under the event mutex, release, then walk the drained
/// frames invoking script globals by name.
fn drain(
    app: &Application,
    cell: &InstanceCell,
    engine: &mut dyn ScriptEngine,
) -> Result<usize, Fatal> {
    cell.state.clear(EVENTS_PENDING);
    let drained = cell.mailbox.swap();

    let mut delivered = 0;
    for frame in drained.iter() {
        let args = match frame {
            Ok(args) => args,
            Err(e) => {
                let fatal = Fatal::new(FatalKind::BufferCorrupt, e.to_string());
                app.report_fatal(fatal.kind, fatal.message.clone());
                return Err(fatal);
            }
        };
        let Some(EventArg::Str(name)) = args.first() else {
            let fatal = Fatal::new(
                FatalKind::BufferCorrupt,
                "event frame does not start with a handler name",
            );
            app.report_fatal(fatal.kind, fatal.message.clone());
            return Err(fatal);
        };
        match engine.call_global(name, &args[1..]) {
            Ok(()) => delivered += 1,
            Err(EngineError::NoSuchGlobal(global)) => {
                let fatal = Fatal::new(
                    FatalKind::MissingHandler,
                    format!("no event handler global {global:?}"),
                );
                app.report_fatal(fatal.kind, fatal.message.clone());
                return Err(fatal);
            }
            Err(e) => {
                // Handler errors stay local to the receiver; the sender is
                // not at fault and the loop keeps draining.
                error!(instance = %cell.id(), "event handler failed: {e}");
                delivered += 1;
            }
        }
    }

    cell.mailbox.recycle(drained);
    Ok(delivered)
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
