// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory engine for tests: records global calls and runs canned
//! programs instead of real script.

use std::collections::HashMap;
use std::sync::Arc;

use comexe_core::{EventArg, InstanceId};
use parking_lot::Mutex;

use crate::engine::{EngineError, EngineFactory, InstanceCtx, ScriptEngine};

/// One observed `call_global` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub instance: InstanceId,
    pub global: String,
    pub args: Vec<EventArg>,
}

/// What a fake instance does when its init chunk "runs".
pub enum FakeProgram {
    /// Return immediately (the instance exits right away).
    Idle,
    /// Run the blocking event loop until `stop_loop`.
    RunLoop,
    /// Fail chunk execution with the given message.
    FailChunk(String),
    /// Arbitrary test behavior with access to the host context and the
    /// instance's own engine (for event drains).
    Custom(Box<dyn FnOnce(&InstanceCtx, &mut dyn ScriptEngine) + Send>),
}

type Handler = Arc<dyn Fn(&InstanceCtx, &[EventArg]) + Send + Sync>;

/// Factory shared by a test; engines it creates share the call recorder
/// and handler table, while each engine state stays instance-private.
#[derive(Default)]
pub struct FakeEngineFactory {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    programs: Mutex<HashMap<String, FakeProgram>>,
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
    strict: bool,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unregistered globals become `NoSuchGlobal` errors instead of being
    /// recorded silently.
    pub fn strict() -> Self {
        Self { strict: true, ..Self::default() }
    }

    /// Assign the program the instance named `name` runs.
    pub fn program(self, name: impl Into<String>, program: FakeProgram) -> Self {
        self.programs.lock().insert(name.into(), program);
        self
    }

    /// Register a handler global callable from any fake instance.
    pub fn handler(
        self,
        global: impl Into<String>,
        f: impl Fn(&InstanceCtx, &[EventArg]) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.lock().insert(global.into(), Arc::new(f));
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }

    /// Recorded calls to one global, in delivery order.
    pub fn calls_to(&self, global: &str) -> Vec<RecordedCall> {
        self.calls.lock().iter().filter(|c| c.global == global).cloned().collect()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(&self, ctx: InstanceCtx) -> Result<Box<dyn ScriptEngine>, EngineError> {
        let name = ctx.app.instance_name(ctx.id).unwrap_or_default();
        let program = self.programs.lock().remove(&name).unwrap_or(FakeProgram::Idle);
        Ok(Box::new(FakeEngine {
            ctx,
            program: Some(program),
            calls: Arc::clone(&self.calls),
            handlers: Arc::clone(&self.handlers),
            strict: self.strict,
        }))
    }
}

struct FakeEngine {
    ctx: InstanceCtx,
    program: Option<FakeProgram>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
    strict: bool,
}

impl ScriptEngine for FakeEngine {
    fn install_args(&mut self, _args: &[String]) -> Result<(), EngineError> {
        Ok(())
    }

    fn open_libraries(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn register_preloads(&mut self, _modules: &[&str]) -> Result<(), EngineError> {
        Ok(())
    }

    fn exec_chunk(&mut self, name: &str, _chunk: &[u8]) -> Result<(), EngineError> {
        match self.program.take().unwrap_or(FakeProgram::Idle) {
            FakeProgram::Idle => Ok(()),
            FakeProgram::RunLoop => {
                let app = Arc::clone(&self.ctx.app);
                let id = self.ctx.id;
                app.run_loop(id, self).map_err(|e| EngineError::Script(e.to_string()))
            }
            FakeProgram::FailChunk(message) => {
                Err(EngineError::Chunk { name: name.to_string(), message })
            }
            FakeProgram::Custom(f) => {
                let ctx = self.ctx.clone();
                f(&ctx, self);
                Ok(())
            }
        }
    }

    fn call_global(&mut self, name: &[u8], args: &[EventArg]) -> Result<(), EngineError> {
        let global = String::from_utf8_lossy(name).into_owned();
        let handler = self.handlers.lock().get(&global).cloned();
        if handler.is_none() && self.strict {
            return Err(EngineError::NoSuchGlobal(global));
        }
        self.calls.lock().push(RecordedCall {
            instance: self.ctx.id,
            global,
            args: args.to_vec(),
        });
        if let Some(handler) = handler {
            handler(&self.ctx, args);
        }
        Ok(())
    }
}
