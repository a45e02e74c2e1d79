use std::fs::File;
use std::io::{BufReader, Read};

use crate::{
    Config, KvConfig, LogConfig, ResourcesConfig, StorageConfig, WebSocketConfig,
    DEFAULT_KV_MAP_SIZE_MIB, DEFAULT_ULIMIT, DEFAULT_WORKING_DIR,
};

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfigToml {
    pub working_dir: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct KvConfigToml {
    pub map_size_mib: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WebSocketConfigToml {
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResourcesConfigToml {
    pub ulimit: Option<usize>,
    pub cpu_core_available: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogConfigToml {
    pub ordinal_internals: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ConfigToml {
    pub storage: StorageConfigToml,
    pub kv: Option<KvConfigToml>,
    pub websocket: WebSocketConfigToml,
    pub resources: Option<ResourcesConfigToml>,
    pub logs: Option<LogConfigToml>,
}

impl ConfigToml {
    pub fn config_from_file_path(file_path: &str) -> Result<Config, String> {
        let file = File::open(file_path)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;

        let config_file: ConfigToml = match toml::from_slice(&file_buffer) {
            Ok(s) => s,
            Err(e) => {
                return Err(format!("Config file malformatted {}", e));
            }
        };
        ConfigToml::config_from_toml(config_file)
    }

    fn config_from_toml(toml: ConfigToml) -> Result<Config, String> {
        // port == 0 is a valid "disabled" marker; no validation needed here.
        let config = Config {
            storage: StorageConfig {
                working_dir: toml
                    .storage
                    .working_dir
                    .unwrap_or_else(|| DEFAULT_WORKING_DIR.into()),
            },
            kv: KvConfig {
                map_size_mib: toml
                    .kv
                    .and_then(|k| k.map_size_mib)
                    .unwrap_or(DEFAULT_KV_MAP_SIZE_MIB),
            },
            websocket: WebSocketConfig {
                port: toml.websocket.port,
            },
            resources: ResourcesConfig {
                ulimit: toml
                    .resources
                    .as_ref()
                    .and_then(|r| r.ulimit)
                    .unwrap_or(DEFAULT_ULIMIT),
                cpu_core_available: toml
                    .resources
                    .as_ref()
                    .and_then(|r| r.cpu_core_available)
                    .unwrap_or_else(num_cpus::get),
            },
            logs: LogConfig {
                ordinal_internals: toml
                    .logs
                    .and_then(|l| l.ordinal_internals)
                    .unwrap_or(true),
            },
        };
        Ok(config)
    }
}
