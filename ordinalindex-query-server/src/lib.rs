#[macro_use]
extern crate ordinalindex_core;

pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;

use std::sync::Arc;

use crossbeam_channel::Receiver;
use ordinalindex_core::core::types::Notification;
use ordinalindex_core::core::OrdinalIndexCore;
use ordinalindex_core::utils::Context;

pub use handlers::{ChainDataProvider, NullChainDataProvider};
pub use registry::Registry;
pub use server::Server;

/// Wires the Notification Router and the TCP accept loop together and
/// starts both. Returns once `server.run` does, which in practice is
/// never — callers run this inside its own task.
pub async fn run_query_server(
    port: u16,
    core: Arc<OrdinalIndexCore>,
    chain: Arc<dyn ChainDataProvider>,
    notifications: Receiver<Notification>,
    ctx: Context,
) {
    let registry = Arc::new(Registry::new());
    router::spawn_router(registry.clone(), notifications);
    let server = Server::new(core, chain, registry, ctx);
    server.run(port).await;
}
