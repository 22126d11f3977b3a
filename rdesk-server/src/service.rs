//! TCP front end for the remote-control service.
//!
//! Each frame on the wire is a `u32` big-endian length followed by a
//! bincode [`Request`]; the reply is framed the same way and carries a
//! [`Response`]. A connection may issue any number of calls; each
//! connection is served by its own task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rdesk_core::{RemoteControlService, Request};

use crate::config::NetworkConfig;

// ── RemoteServer ─────────────────────────────────────────────────

/// Accepts controller connections and feeds their calls to the
/// [`RemoteControlService`].
pub struct RemoteServer {
    config: NetworkConfig,
    service: Arc<RemoteControlService>,
    /// Set while the accept loop is live.
    serving: AtomicBool,
    /// Fires once; a stop requested before `serve` still holds.
    shutdown: CancellationToken,
}

impl RemoteServer {
    pub fn new(config: NetworkConfig, service: Arc<RemoteControlService>) -> Self {
        Self {
            config,
            service,
            serving: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Obtain a handle that can be used to stop the server from
    /// another task.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signal the server to stop. Takes effect even if the server has
    /// not started listening yet.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Bind the first free port from the configured list.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        let mut last_error = None;

        for &port in &self.config.ports {
            let addr = format!("{}:{port}", self.config.bind_address);
            match TcpListener::bind(&addr).await {
                Ok(listener) => return Ok(listener),
                Err(e) => {
                    warn!("cannot bind {addr}: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no ports configured")
        }))
    }

    /// Bind and serve until stopped.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until stopped.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        if self.shutdown.is_cancelled() {
            info!("stop requested before listening; not serving");
            return Ok(());
        }
        self.serving.store(true, Ordering::SeqCst);
        info!("remote control listening on {}", listener.local_addr()?);

        loop {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = self.shutdown.cancelled() => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            debug!("controller connection from {peer}");
            let service = Arc::clone(&self.service);
            let max_frame = self.config.max_frame_bytes;
            tokio::spawn(async move {
                serve_connection(stream, peer, service, max_frame).await;
            });
        }

        self.serving.store(false, Ordering::SeqCst);
        info!("remote control listener stopped");
        Ok(())
    }
}

/// Framing shared by the server and its clients.
pub fn codec(max_frame_bytes: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_bytes)
        .new_codec()
}

/// Answer calls on one connection until the peer hangs up or sends
/// something undecodable.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: Arc<RemoteControlService>,
    max_frame_bytes: usize,
) {
    let mut framed = Framed::new(stream, codec(max_frame_bytes));

    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("read error from {peer}: {e}");
                break;
            }
        };

        let request = match Request::from_bytes(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("malformed request from {peer}: {e}");
                break;
            }
        };

        let op = request.name();
        let token = request.token();
        let response = service.dispatch(request).await;
        debug!(%peer, op, ?token, ok = response.is_success(), "call served");
        let payload = match response.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{op}: cannot encode response: {e}");
                break;
            }
        };

        if let Err(e) = framed.send(Bytes::from(payload)).await {
            warn!("write error to {peer}: {e}");
            break;
        }
    }

    debug!("connection from {peer} closed");
}

// ── Tests ────────────────────────────────────────────────────────
