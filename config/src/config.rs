use std::path::PathBuf;

use crate::toml::ConfigToml;

pub const DEFAULT_WORKING_DIR: &str = "ordinalindex-data";
pub const DEFAULT_ULIMIT: usize = 2048;
pub const DEFAULT_KV_MAP_SIZE_MIB: usize = 1024;

/// Top-level configuration for the ordinal index service, analogous to
/// `ordhook-core::config::Config` but scoped to this subsystem: an
/// embedded KV store, a checkpoint file and a WebSocket query server,
/// with no Bitcoin consensus/RPC configuration of its own.
#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub kv: KvConfig,
    pub websocket: WebSocketConfig,
    pub resources: ResourcesConfig,
    pub logs: LogConfig,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Directory holding the `ordinaldb/` KV store and the
    /// `ordinal_last_indexed` checkpoint file.
    pub working_dir: String,
}

#[derive(Clone, Debug)]
pub struct KvConfig {
    /// Map-size hint passed to the KV backend at open time.
    pub map_size_mib: usize,
}

#[derive(Clone, Debug)]
pub struct WebSocketConfig {
    /// 0 disables the listener.
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResourcesConfig {
    pub ulimit: usize,
    pub cpu_core_available: usize,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub ordinal_internals: bool,
}

impl Config {
    pub fn from_file_path(file_path: &str) -> Result<Config, String> {
        ConfigToml::config_from_file_path(file_path)
    }

    pub fn expected_kv_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        path.push(&self.storage.working_dir);
        path.push("ordinaldb");
        path
    }

    pub fn expected_checkpoint_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        path.push(&self.storage.working_dir);
        path.push("ordinal_last_indexed");
        path
    }

    pub fn devnet_default() -> Config {
        Config {
            storage: StorageConfig {
                working_dir: default_working_dir(),
            },
            kv: KvConfig {
                map_size_mib: DEFAULT_KV_MAP_SIZE_MIB,
            },
            websocket: WebSocketConfig { port: 20456 },
            resources: ResourcesConfig {
                cpu_core_available: num_cpus::get(),
                ulimit: DEFAULT_ULIMIT,
            },
            logs: LogConfig {
                ordinal_internals: true,
            },
        }
    }

    pub fn mainnet_default() -> Config {
        let mut default = Config::devnet_default();
        default.websocket.port = 20456;
        default
    }

    #[cfg(test)]
    pub fn test_default() -> Config {
        let mut config = Self::devnet_default();
        config.storage.working_dir = format!(
            "tmp/ordinalindex-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        config.resources.cpu_core_available = 1;
        config
    }
}

pub fn default_working_dir() -> String {
    let mut path = std::env::current_dir().expect("unable to get current dir");
    path.push("ordinalindex");
    format!("{}", path.display())
}
