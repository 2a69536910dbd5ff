// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A full serving instance: the cooperative loop inside one instance
//! serves HTTP while draining cross-thread events between ticks.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use comexe_core::EventArg;
use comexe_runtime::{
    Application, ApplicationBuilder, EngineFactory, FakeEngineFactory, FakeProgram, SpawnSpec,
};
use comexe_server::{Handler, Request, Response, Served, Server, ServerConfig, Transport};

struct PingHandler;

impl Handler for PingHandler {
    async fn handle<T: Transport>(&self, req: &mut Request, _io: &mut T) -> Served {
        let body = format!("pong {}", req.path);
        Served::Done(Response::text(200, body))
    }
}

fn config(max_requests: u32) -> ServerConfig {
    ServerConfig {
        keepalive: Duration::from_secs(15),
        max_requests,
        max_handshake_attempts: 10_000,
    }
}

/// The web instance program: bind a server, report the port, then
/// alternate between serving connections and draining bus events until a
/// close is requested.
fn web_program(
    addr_tx: mpsc::Sender<std::net::SocketAddr>,
    max_requests: u32,
) -> FakeProgram {
    FakeProgram::Custom(Box::new(move |ctx, engine| {
        let app = Arc::clone(&ctx.app);
        let id = ctx.id;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let local = tokio::task::LocalSet::new();
        local.block_on(&rt, async move {
            let server = Server::bind("127.0.0.1:0", config(max_requests)).await.unwrap();
            addr_tx.send(server.local_addr().unwrap()).unwrap();
            let stop = server.stop_token();
            let waker = Arc::new(tokio::sync::Notify::new());
            assert!(app.register_event_waker(id, Arc::clone(&waker)));

            let serving = tokio::task::spawn_local(server.run(PingHandler));

            // One event pass per wake-up; a close request stops the server
            // and ends the instance.
            loop {
                waker.notified().await;
                app.process_events(id, engine).unwrap();
                if app.close_requested(id) {
                    stop.cancel();
                    break;
                }
            }
            let _ = serving.await;
        });
    }))
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut sock = tokio::net::TcpStream::connect(addr).await.unwrap();
    sock.write_all(format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut out = Vec::new();
    sock.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

#[test]
fn serving_instance_interleaves_requests_and_events() {
    let (addr_tx, addr_rx) = mpsc::channel();
    let factory = Arc::new(
        FakeEngineFactory::new().program("web", web_program(addr_tx, 100)),
    );
    let app: Arc<Application> =
        ApplicationBuilder::new(Arc::clone(&factory) as Arc<dyn EngineFactory>)
            .init_chunk(b"-- web app".to_vec())
            .build();

    let web = app.spawn(SpawnSpec::root("web")).unwrap();
    let addr = addr_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Serve requests from a second runtime while posting bus events.
    let client = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let body = client.block_on(http_get(addr, "/first"));
    assert!(body.contains("pong /first"), "{body}");

    app.post(web, "note", &[EventArg::str("while serving")]);

    let body = client.block_on(http_get(addr, "/second"));
    assert!(body.contains("pong /second"));

    // Event landed between ticks.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while factory.calls_to("note").is_empty() {
        assert!(std::time::Instant::now() < deadline, "event never drained");
        std::thread::sleep(Duration::from_millis(5));
    }
    let calls = factory.calls_to("note");
    assert_eq!(calls[0].args, vec![EventArg::str("while serving")]);

    // Close request tears the whole instance down.
    app.stop_loop(web);
    assert!(app.join(web));
}

#[test]
fn keepalive_counter_enforced_through_the_instance() {
    use std::io::{Read, Write};

    let (addr_tx, addr_rx) = mpsc::channel();
    let factory = Arc::new(
        FakeEngineFactory::new().program("web", web_program(addr_tx, 3)),
    );
    let app: Arc<Application> =
        ApplicationBuilder::new(Arc::clone(&factory) as Arc<dyn EngineFactory>)
            .init_chunk(b"-- web app".to_vec())
            .build();

    let web = app.spawn(SpawnSpec::root("web")).unwrap();
    let addr = addr_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let mut sock = std::net::TcpStream::connect(addr).unwrap();
    for _ in 0..4 {
        sock.write_all(b"GET / HTTP/1.1\r\nHost: t\r\n\r\n").unwrap();
    }
    let mut raw = String::new();
    sock.read_to_string(&mut raw).unwrap();

    // Three responses, the third forced to close; the fourth request got
    // nothing before the socket closed.
    assert_eq!(raw.matches("HTTP/1.1 200 OK").count(), 3, "{raw}");
    assert_eq!(raw.matches("Connection: keep-alive").count(), 2);
    assert_eq!(raw.matches("Connection: close").count(), 1);

    app.stop_loop(web);
    assert!(app.join(web));
}
