pub fn generate_toml_config() -> String {
    r#"[storage]
working_dir = "ordinalindex"

[kv]
map_size_mib = 1024

[websocket]
port = 20456

[resources]
ulimit = 2048
cpu_core_available = 4

[logs]
ordinal_internals = true
"#
    .to_string()
}
