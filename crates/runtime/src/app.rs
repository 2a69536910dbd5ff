// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide application: argv, instance registry, init chunk.

use std::sync::Arc;

use comexe_core::{Fatal, FatalKind, InstanceId, Registry, SearchChain, ACTIVE};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::engine::EngineFactory;
use crate::instance::{instance_thread, InstanceCell};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to start instance thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// What to run in a new instance.
pub struct SpawnSpec {
    /// Human-readable module name, also the OS thread name.
    pub name: String,
    /// Event posted to the parent exactly once at teardown, when non-empty.
    pub exit_event: Option<String>,
    pub parent: InstanceId,
}

impl SpawnSpec {
    pub fn root(name: impl Into<String>) -> Self {
        Self { name: name.into(), exit_event: None, parent: InstanceId::INVALID }
    }

    pub fn child(
        name: impl Into<String>,
        parent: InstanceId,
        exit_event: Option<String>,
    ) -> Self {
        Self { name: name.into(), exit_event, parent }
    }
}

/// Process-wide singleton. Created at process start, destroyed after the
/// root instance terminates.
pub struct Application {
    argv: Vec<String>,
    chain: SearchChain,
    init_chunk: Vec<u8>,
    warnings: bool,
    factory: Arc<dyn EngineFactory>,
    pub(crate) registry: Mutex<Registry<Arc<InstanceCell>>>,
    fatal: Mutex<Option<Fatal>>,
}

pub struct ApplicationBuilder {
    argv: Vec<String>,
    chain: SearchChain,
    init_chunk: Vec<u8>,
    warnings: bool,
    factory: Arc<dyn EngineFactory>,
}

impl ApplicationBuilder {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            argv: Vec::new(),
            chain: SearchChain::default(),
            init_chunk: Vec::new(),
            warnings: false,
            factory,
        }
    }

    /// Ordered argument vector, fixed at creation.
    pub fn argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }

    pub fn search_chain(mut self, chain: SearchChain) -> Self {
        self.chain = chain;
        self
    }

    /// Raw bytes of the embedded initialization chunk, read once from the
    /// executable's own archive entry.
    pub fn init_chunk(mut self, chunk: Vec<u8>) -> Self {
        self.init_chunk = chunk;
        self
    }

    /// Start every instance with warning printing enabled (`-W`).
    pub fn warnings(mut self, enabled: bool) -> Self {
        self.warnings = enabled;
        self
    }

    pub fn build(self) -> Arc<Application> {
        Arc::new(Application {
            argv: self.argv,
            chain: self.chain,
            init_chunk: self.init_chunk,
            warnings: self.warnings,
            factory: self.factory,
            registry: Mutex::new(Registry::new()),
            fatal: Mutex::new(None),
        })
    }
}

impl Application {
    /// Name the embedded init chunk loads under, also its archive entry.
    pub const INIT_CHUNK_NAME: &'static str = "comexe/init.lua";

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn search_chain(&self) -> &SearchChain {
        &self.chain
    }

    pub fn init_chunk(&self) -> &[u8] {
        &self.init_chunk
    }

    pub(crate) fn warnings_enabled(&self) -> bool {
        self.warnings
    }

    pub(crate) fn factory(&self) -> &dyn EngineFactory {
        &*self.factory
    }

    /// Record a host-fatal error; the first one wins. `main()` exits with
    /// its category code after the root instance is joined.
    pub fn report_fatal(&self, kind: FatalKind, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(code = kind.exit_code(), "{message}");
        let mut slot = self.fatal.lock();
        if slot.is_none() {
            *slot = Some(Fatal::new(kind, message));
        }
    }

    pub fn take_fatal(&self) -> Option<Fatal> {
        self.fatal.lock().take()
    }

    /// Spawn an instance and block until its thread has set ACTIVE.
    pub fn spawn(self: &Arc<Self>, spec: SpawnSpec) -> Result<InstanceId, SpawnError> {
        let cell = Arc::new(InstanceCell::new(spec.name, spec.exit_event, spec.parent));
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.add(Arc::clone(&cell));
            cell.set_id(id);
            id
        };

        let app = Arc::clone(self);
        let thread_cell = Arc::clone(&cell);
        let handle = std::thread::Builder::new()
            .name(cell.name.clone())
            .spawn(move || instance_thread(app, thread_cell));

        let handle = match handle {
            Ok(h) => h,
            Err(e) => {
                self.registry.lock().remove(id);
                return Err(SpawnError::Thread(e));
            }
        };
        *cell.join.lock() = Some(handle);

        cell.state.wait_any(ACTIVE);
        Ok(id)
    }

    /// Block on the target thread, then unregister it and free its
    /// resources. Returns `false` for unknown ids.
    pub fn join(&self, id: InstanceId) -> bool {
        let cell = self.registry.lock().get(id).map(Arc::clone);
        let Some(cell) = cell else { return false };

        let handle = cell.join.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(instance = %id, "instance thread panicked");
            }
        }
        self.registry.lock().remove(id);
        true
    }

    pub fn is_registered(&self, id: InstanceId) -> bool {
        self.registry.lock().is_valid(id)
    }

    pub fn instance_name(&self, id: InstanceId) -> Option<String> {
        self.registry.lock().get(id).map(|c| c.name.clone())
    }

    /// Run the whole application: spawn the root instance, join it, then
    /// diagnose anything still registered.
    pub fn run(self: &Arc<Self>, root_name: &str) -> Result<(), Fatal> {
        let root = self.spawn(SpawnSpec::root(root_name)).map_err(|e| {
            Fatal::new(FatalKind::Usage, format!("cannot start root instance: {e}"))
        })?;
        self.join(root);

        self.warn_leftover_instances();

        match self.take_fatal() {
            Some(fatal) => Err(fatal),
            None => Ok(()),
        }
    }

    /// Misuse diagnostic, not recovery: list the thread hierarchy of
    /// instances still registered after the root returned, re-parenting
    /// orphans under a synthetic "Orphans" root, then exit cleanly without
    /// joining them.
    fn warn_leftover_instances(&self) {
        let snapshot: Vec<(InstanceId, InstanceId, String)> = {
            let registry = self.registry.lock();
            registry
                .iter()
                .map(|(id, cell)| (id, cell.parent, cell.name.clone()))
                .collect()
        };
        if snapshot.is_empty() {
            return;
        }

        let known: std::collections::HashSet<InstanceId> =
            snapshot.iter().map(|&(id, _, _)| id).collect();

        fn append_subtree(
            out: &mut String,
            all: &[(InstanceId, InstanceId, String)],
            parent: InstanceId,
            depth: usize,
        ) {
            for (id, p, name) in all {
                if *p == parent {
                    for _ in 0..depth {
                        out.push_str("  ");
                    }
                    out.push_str(&format!("{name} ({id})\n"));
                    append_subtree(out, all, *id, depth + 1);
                }
            }
        }

        let mut report = String::from("instances still active at exit:\n");

        // Instances spawned as roots keep their place in the hierarchy.
        for (id, parent, name) in &snapshot {
            if parent.is_invalid() {
                report.push_str(&format!("  {name} ({id})\n"));
                append_subtree(&mut report, &snapshot, *id, 2);
            }
        }

        // Anything whose parent already exited is re-parented under a
        // synthetic "Orphans" root.
        let orphans: Vec<&(InstanceId, InstanceId, String)> = snapshot
            .iter()
            .filter(|(_, parent, _)| !parent.is_invalid() && !known.contains(parent))
            .collect();
        if !orphans.is_empty() {
            report.push_str("  Orphans\n");
            for (id, _, name) in orphans {
                report.push_str(&format!("    {name} ({id})\n"));
                append_subtree(&mut report, &snapshot, *id, 3);
            }
        }

        warn!("{}", report.trim_end());
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
