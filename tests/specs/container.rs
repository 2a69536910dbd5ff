// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container scenarios: spawn/join lifetimes and the parent-exit event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use comexe_core::EventArg;
use comexe_runtime::{
    ApplicationBuilder, Application, EngineFactory, FakeEngineFactory, FakeProgram, SpawnSpec,
};

fn app_with(factory: FakeEngineFactory) -> (Arc<Application>, Arc<FakeEngineFactory>) {
    let factory = Arc::new(factory);
    let app = ApplicationBuilder::new(Arc::clone(&factory) as Arc<dyn EngineFactory>)
        .init_chunk(b"-- embedded init".to_vec())
        .build();
    (app, factory)
}

fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Thread A spawns B with exit event `B_DONE`; B exits immediately. A's
/// event loop observes exactly one `B_DONE(id_of_B)`; the first join
/// returns true and the second false.
#[test]
fn child_exit_event_reaches_parent_once() {
    let (app, factory) = app_with(FakeEngineFactory::new().program("a", FakeProgram::RunLoop));

    let a = app.spawn(SpawnSpec::root("a")).unwrap();
    let b = app.spawn(SpawnSpec::child("b", a, Some("B_DONE".into()))).unwrap();

    wait_for("B_DONE delivery", || !factory.calls_to("B_DONE").is_empty());
    let calls = factory.calls_to("B_DONE");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].instance, a);
    assert_eq!(calls[0].args, vec![EventArg::Integer(i64::from(b.as_u32()))]);

    assert!(app.join(b));
    assert!(!app.join(b));

    app.stop_loop(a);
    assert!(app.join(a));
    assert_eq!(factory.calls_to("B_DONE").len(), 1);
}

/// A joined id may be reissued later, but never to two owners at once.
#[test]
fn ids_recycle_without_aliasing() {
    let (app, _) = app_with(FakeEngineFactory::new());

    let first = app.spawn(SpawnSpec::root("one")).unwrap();
    assert!(app.is_registered(first));
    app.join(first);
    assert!(!app.is_registered(first));

    let second = app.spawn(SpawnSpec::root("two")).unwrap();
    assert_eq!(first, second, "freed id comes back");
    assert_eq!(app.instance_name(second).as_deref(), Some("two"));
    app.join(second);
}

/// Broadcast wakes every live loop; posts from one sender arrive in
/// program order.
#[test]
fn broadcast_and_ordering() {
    let (app, factory) = app_with(
        FakeEngineFactory::new()
            .program("x", FakeProgram::RunLoop)
            .program("y", FakeProgram::RunLoop),
    );

    let x = app.spawn(SpawnSpec::root("x")).unwrap();
    let y = app.spawn(SpawnSpec::root("y")).unwrap();

    for i in 0..10 {
        app.post(x, "tick", &[EventArg::Integer(i)]);
    }
    app.broadcast("flush", &[]);
    wait_for("all deliveries", || {
        factory.calls_to("tick").len() == 10 && factory.calls_to("flush").len() == 2
    });

    let order: Vec<_> = factory.calls_to("tick").iter().map(|c| c.args[0].clone()).collect();
    assert_eq!(order, (0..10).map(EventArg::Integer).collect::<Vec<_>>());

    app.stop_loop(x);
    app.stop_loop(y);
    app.join(x);
    app.join(y);
}

/// The application run cycle: root runs the init chunk and the process
/// outcome reflects fatal categories.
#[test]
fn run_reports_init_failures_with_exit_code_five() {
    let (app, _) = app_with(
        FakeEngineFactory::new().program("main", FakeProgram::FailChunk("syntax error".into())),
    );
    let fatal = app.run("main").unwrap_err();
    assert_eq!(fatal.kind.exit_code(), 5);
}
