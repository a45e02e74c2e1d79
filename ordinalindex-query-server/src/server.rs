//! TCP accept loop for the query/subscription server.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use ordinalindex_core::core::OrdinalIndexCore;
use ordinalindex_core::utils::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::handlers::{handle_request, ChainDataProvider};
use crate::protocol::RequestEnvelope;
use crate::registry::{Registry, OUTBOUND_QUEUE_CAPACITY};

/// A bind failure is retried after a short pause rather than aborting the
/// whole process.
const BIND_RETRY_PAUSE: Duration = Duration::from_millis(200);

/// When the port is 0 the server is disabled; it still polls the config
/// periodically in case of a future reload.
const DISABLED_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct Server {
    core: Arc<OrdinalIndexCore>,
    chain: Arc<dyn ChainDataProvider>,
    registry: Arc<Registry>,
    ctx: Context,
}

impl Server {
    pub fn new(
        core: Arc<OrdinalIndexCore>,
        chain: Arc<dyn ChainDataProvider>,
        registry: Arc<Registry>,
        ctx: Context,
    ) -> Server {
        Server {
            core,
            chain,
            registry,
            ctx,
        }
    }

    /// Runs until `port` is 0 for the whole program lifetime or the process
    /// is shut down; callers typically spawn this as its own task.
    pub async fn run(&self, port: u16) {
        if port == 0 {
            try_info!(self.ctx, "query server disabled (port 0)");
            loop {
                tokio::time::sleep(DISABLED_POLL_INTERVAL).await;
            }
        }

        loop {
            match TcpListener::bind(("0.0.0.0", port)).await {
                Ok(listener) => {
                    try_info!(self.ctx, "query server listening on port {port}");
                    self.accept_loop(listener).await;
                }
                Err(e) => {
                    try_warn!(self.ctx, "query server failed to bind port {port}: {e}");
                    tokio::time::sleep(BIND_RETRY_PAUSE).await;
                }
            }
        }
    }

    async fn accept_loop(&self, listener: TcpListener) {
        loop {
            let (stream, _addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    try_warn!(self.ctx, "query server accept error: {e}");
                    continue;
                }
            };
            let core = self.core.clone();
            let chain = self.chain.clone();
            let registry = self.registry.clone();
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                handle_connection(stream, core, chain, registry, ctx).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    core: Arc<OrdinalIndexCore>,
    chain: Arc<dyn ChainDataProvider>,
    registry: Arc<Registry>,
    ctx: Context,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            try_warn!(ctx, "query server handshake failed: {e}");
            return;
        }
    };
    let (mut outbound, mut inbound) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    let conn_id = registry.register(tx);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if outbound.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = inbound.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(_) => break,
        };
        let text = match frame {
            Message::Text(t) => t,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => continue,
        };
        let response = match serde_json::from_str::<RequestEnvelope>(&text) {
            Ok(request) => handle_request(&request, &core, chain.as_ref(), &registry, conn_id),
            Err(e) => crate::protocol::ResponseEnvelope::error("", format!("malformed request: {e}")),
        };
        if let Ok(payload) = serde_json::to_string(&response) {
            registry.send_direct(conn_id, Message::Text(payload));
        }
    }

    registry.unregister(conn_id);
    writer.abort();
}
