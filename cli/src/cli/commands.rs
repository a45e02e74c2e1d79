use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "ordinal-indexer", author, version, about, long_about = None)]
pub enum Protocol {
    /// Maintain and serve the ordinal index
    #[clap(subcommand)]
    Ordinals(Command),
    /// Generate a new configuration file
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
pub enum Command {
    /// Run the index-apply loop and the query server
    #[clap(subcommand)]
    Service(ServiceCommand),
    /// Perform maintenance operations on the local index
    #[clap(subcommand)]
    Index(IndexCommand),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
pub enum ServiceCommand {
    /// Start service
    #[clap(name = "start", bin_name = "start")]
    Start(ServiceStartCommand),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct ServiceStartCommand {
    #[clap(long = "config-path")]
    pub config_path: String,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
pub enum IndexCommand {
    /// Report the last indexed block sequence
    #[clap(name = "status", bin_name = "status")]
    Status(IndexStatusCommand),
    /// Roll back the index by N blocks
    #[clap(name = "rollback", bin_name = "rollback")]
    Rollback(RollbackIndexCommand),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct IndexStatusCommand {
    #[clap(long = "config-path")]
    pub config_path: String,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct RollbackIndexCommand {
    /// Path to a JSON array of blocks to remove, newest first, as supplied
    /// by the node during a reorg
    #[clap(long = "blocks-file")]
    pub blocks_file: String,
    #[clap(long = "config-path")]
    pub config_path: String,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
#[clap(bin_name = "config", aliases = &["config"])]
pub enum ConfigCommand {
    /// Generate a starter config
    #[clap(name = "new", bin_name = "new", aliases = &["generate"])]
    New(NewConfigCommand),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct NewConfigCommand {}
