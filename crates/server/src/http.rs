// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle and the accept loop.
//!
//! Everything here runs on one instance's cooperative scheduler: the accept
//! loop and each connection are `spawn_local` tasks on a `LocalSet`. Per
//! accepted connection exactly one of close or upgrade happens; keep-alive
//! iterations serve requests strictly in arrival order.

use std::rc::Rc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::env;
use crate::request::{read_request, Request, RequestError};
use crate::response::Response;
use crate::tls::{SessionFactory, TlsTransport};
use crate::transport::{TcpTransport, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Keep-alive timer for the next request line, non-recurring.
    pub keepalive: std::time::Duration,
    /// Requests served per connection before keep-alive is cut off.
    pub max_requests: u32,
    /// TLS handshake step cap.
    pub max_handshake_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            keepalive: env::keepalive(),
            max_requests: env::max_requests(),
            max_handshake_attempts: env::handshake_attempts(),
        }
    }
}

/// How the handler terminated this iteration.
pub enum Served {
    /// Normal response; the loop writes it and applies the keep-alive
    /// decision.
    Done(Response),
    /// The handler hijacked the transport (e.g. a WebSocket session ran to
    /// completion); the loop stops treating the connection as HTTP.
    Upgraded,
}

/// Application request hook. Synchronous from the server's point of view:
/// the iteration ends when this returns.
pub trait Handler {
    async fn handle<T: Transport>(&self, req: &mut Request, io: &mut T) -> Served;
}

/// One bound listener plus its connection tasks.
pub struct Server {
    listener: TcpListener,
    config: Rc<ServerConfig>,
    tls: Option<Rc<dyn SessionFactory>>,
    stop: CancellationToken,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, config: Rc::new(config), tls: None, stop: CancellationToken::new() })
    }

    /// Terminate TLS on accepted connections with sessions from `factory`.
    pub fn with_tls(mut self, factory: impl SessionFactory + 'static) -> Self {
        self.tls = Some(Rc::new(factory));
        self
    }

    /// Token that stops the accept loop and makes every adapter loop abort
    /// with "closed" at its next iteration.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until stopped. Must run inside a `LocalSet`; connections are
    /// cooperative tasks, not threads.
    pub async fn run<H: Handler + 'static>(self, handler: H) {
        let handler = Rc::new(handler);
        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((sock, peer)) => {
                            debug!(%peer, "connection accepted");
                            let handler = Rc::clone(&handler);
                            let config = Rc::clone(&self.config);
                            let tls = self.tls.clone();
                            let stop = self.stop.clone();
                            tokio::task::spawn_local(async move {
                                serve_connection(sock, handler, config, tls, stop).await;
                            });
                        }
                        Err(e) => error!("accept error: {e}"),
                    }
                }
            }
        }
    }
}

async fn serve_connection<H: Handler>(
    sock: tokio::net::TcpStream,
    handler: Rc<H>,
    config: Rc<ServerConfig>,
    tls: Option<Rc<dyn SessionFactory>>,
    stop: CancellationToken,
) {
    match tls {
        Some(factory) => {
            let session = match factory.create() {
                Ok(s) => s,
                Err(e) => {
                    error!("tls session: {e}");
                    return;
                }
            };
            let mut transport = TlsTransport::new(sock, session, stop);
            if let Err(e) = transport.handshake(config.max_handshake_attempts).await {
                debug!("tls handshake: {e}");
                return;
            }
            drive(transport, handler, config).await;
        }
        None => {
            let transport = TcpTransport::new(sock, stop);
            drive(transport, handler, config).await;
        }
    }
}

/// Keep-alive iteration loop for one connection.
async fn drive<T: Transport, H: Handler>(
    mut transport: T,
    handler: Rc<H>,
    config: Rc<ServerConfig>,
) {
    let mut iteration: u32 = 0;
    loop {
        iteration += 1;
        let mut req = match read_request(
            &mut transport,
            config.keepalive,
            iteration,
            config.max_requests,
        )
        .await
        {
            Ok(req) => req,
            Err(RequestError::Timeout) => {
                debug!("keep-alive timer fired");
                break;
            }
            // Peer-closed between requests is the expected end of a
            // keep-alive connection.
            Err(RequestError::Transport(TransportError::Closed)) => break,
            Err(e) => {
                debug!("request ended: {e}");
                break;
            }
        };

        match handler.handle(&mut req, &mut transport).await {
            Served::Upgraded => {
                debug!("connection upgraded");
                break;
            }
            Served::Done(response) => {
                let keepalive = req.keepalive && !req.closed;
                if transport.send(&response.serialize(keepalive)).await.is_err() {
                    break;
                }
                if !keepalive {
                    break;
                }
            }
        }
    }
    transport.close().await;
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
