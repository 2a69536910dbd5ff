// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! comexe-runtime: the scripted application container.
//!
//! One [`Application`] per process owns the instance registry. Each instance
//! is one OS thread plus one exclusively-owned script engine plus one
//! mailbox; the only communication between instances is the typed event bus.

pub mod app;
pub mod bus;
pub mod engine;
pub mod instance;
pub mod warn;

#[cfg(any(test, feature = "test-support"))]
pub mod fake_engine;

pub use app::{Application, ApplicationBuilder, SpawnError, SpawnSpec};
pub use engine::{EngineError, EngineFactory, InstanceCtx, ScriptEngine, PRELOADS};
#[cfg(any(test, feature = "test-support"))]
pub use fake_engine::{FakeEngineFactory, FakeProgram, RecordedCall};
pub use warn::WarningRouter;
