use std::fs::File;
use std::io::Write;
use std::process;
use std::sync::Arc;

use clap::Parser;
use commands::{Command, ConfigCommand, IndexCommand, Protocol, ServiceCommand};
use config::generator::generate_toml_config;
use config::Config;
use ordinalindex_bridge::{Bridge, BridgeCommand, BridgeEvent};
use ordinalindex_core::core::resolver::PubkeyResolver;
use ordinalindex_core::core::Block;
use ordinalindex_core::service::Service;
use ordinalindex_core::utils::Context;
use ordinalindex_query_server::{run_query_server, ChainDataProvider, NullChainDataProvider};

mod commands;

/// Treats a base58 address as its own canonical public-key form. A real
/// node supplies a resolver backed by its wallet/keychain; this subsystem
/// never validates cryptography, so the standalone binary's resolver is
/// necessarily a stand-in.
struct Base58Resolver;

impl PubkeyResolver for Base58Resolver {
    fn resolve(&self, address: &str) -> Result<Vec<u8>, String> {
        use base58::FromBase58;
        address
            .from_base58()
            .map_err(|_| format!("invalid base58 address: {address}"))
    }
}

pub fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context {
        logger: Some(logger),
        tracer: false,
    };

    let opts: Protocol = match Protocol::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            println!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = hiro_system_kit::nestable_block_on(handle_command(opts, &ctx)) {
        error!(ctx.expect_logger(), "{e}");
        std::thread::sleep(std::time::Duration::from_millis(500));
        process::exit(1);
    }
}

async fn handle_command(opts: Protocol, ctx: &Context) -> Result<(), String> {
    match opts {
        Protocol::Ordinals(Command::Service(ServiceCommand::Start(cmd))) => {
            start_service(&cmd.config_path, ctx).await
        }
        Protocol::Ordinals(Command::Index(IndexCommand::Status(cmd))) => {
            let config = Config::from_file_path(&cmd.config_path)?;
            let (service, _notifications) =
                Service::new(config, Arc::new(Base58Resolver), ctx.clone())?;
            println!("Index chain tip is at #{}", service.core.last_indexed());
            println!("Names indexed: {}", service.core.total_names());
            println!("Tokens indexed: {}", service.core.total_tokens());
            println!("Inscriptions indexed: {}", service.core.total_inscriptions());
            Ok(())
        }
        Protocol::Ordinals(Command::Index(IndexCommand::Rollback(cmd))) => {
            let config = Config::from_file_path(&cmd.config_path)?;
            let (service, _notifications) =
                Service::new(config, Arc::new(Base58Resolver), ctx.clone())?;
            let bridge = Bridge::new(service.core.clone(), ctx.clone());
            let raw = std::fs::read_to_string(&cmd.blocks_file)
                .map_err(|e| format!("unable to read {}: {e}", cmd.blocks_file))?;
            let blocks: Vec<Block> =
                serde_json::from_str(&raw).map_err(|e| format!("invalid blocks file: {e}"))?;
            for block in &blocks {
                bridge.on_remove_block(block)?;
            }
            println!("{} blocks rolled back", blocks.len());
            Ok(())
        }
        Protocol::Config(ConfigCommand::New(_cmd)) => {
            let config_content = generate_toml_config();
            let file_path = "Indexer.toml";
            let mut file = File::create(file_path)
                .map_err(|e| format!("unable to open file {file_path}\n{e}"))?;
            file.write_all(config_content.as_bytes())
                .map_err(|e| format!("unable to write file {file_path}\n{e}"))?;
            println!("Created file {file_path}");
            Ok(())
        }
    }
}

/// Wires `Service`/`Bridge`/the query server together and blocks until a
/// termination signal arrives. The apply loop's command channel is meant
/// to be driven by the embedding node, which owns block production; this
/// binary only idles it and listens for shutdown.
async fn start_service(config_path: &str, ctx: &Context) -> Result<(), String> {
    let config = Config::from_file_path(config_path)?;
    let port = config.websocket.port;
    let (service, notifications) = Service::new(config, Arc::new(Base58Resolver), ctx.clone())?;
    try_info!(
        ctx,
        "ordinal index chain tip is at #{}",
        service.core.last_indexed()
    );

    let bridge = Bridge::new(service.core.clone(), ctx.clone());
    let (command_tx, command_rx) = crossbeam_channel::unbounded::<BridgeCommand>();
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<BridgeEvent>();
    let apply_loop = bridge.spawn_apply_loop(command_rx, event_tx);

    let shutdown_tx = command_tx.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(BridgeCommand::Terminate);
    })
    .map_err(|e| format!("unable to install signal handler: {e}"))?;

    let chain: Arc<dyn ChainDataProvider> = Arc::new(NullChainDataProvider);
    let query_server = tokio::spawn(run_query_server(
        port,
        service.core.clone(),
        chain,
        notifications,
        ctx.clone(),
    ));

    let outcome = event_rx.recv();
    query_server.abort();
    match outcome {
        Ok(BridgeEvent::Fatal(e)) => {
            let _ = apply_loop.join();
            Err(e)
        }
        Ok(_) => {
            let _ = apply_loop.join();
            Ok(())
        }
        Err(_) => {
            let _ = apply_loop.join();
            Ok(())
        }
    }
}
