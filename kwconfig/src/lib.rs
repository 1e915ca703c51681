//! # KeepWatch Configuration Module
//!
//! This module provides configuration management for KeepWatch:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides (`KEEPWATCH_CONFIG__SECTION__KEY=value`)
//! - Typed getters and setters for configuration values
//! - Transparent decryption of stored server passwords
//!
//! ## Usage
//!
//! ```no_run
//! use kwconfig::Config;
//!
//! let config = Config::load_config("")?;
//! for server in config.get_servers()? {
//!     println!("{} as {}", server.display_name(), server.username);
//! }
//! let tick = config.get_tick_interval_secs();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{info, warn};
use uuid::Uuid;

pub mod encryption;
pub mod servers;

pub use servers::{ServerEntry, import_legacy_json};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("default.yaml");

const ENV_CONFIG_DIR: &str = "KEEPWATCH_CONFIG";
const ENV_PREFIX: &str = "KEEPWATCH_CONFIG__";
const CONFIG_DIR_NAME: &str = ".keepwatch";

const DEFAULT_LOG_MIN_LEVEL: &str = "info";
const DEFAULT_CLIENT_NAME: &str = "EmbyClient";
const DEFAULT_CLIENT_DEVICE: &str = "Windows";
const DEFAULT_CLIENT_VERSION: &str = "4.8.0";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
const DEFAULT_MIN_WATCH_SECS: u64 = 300;
const DEFAULT_MAX_WATCH_SECS: u64 = 1800;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_FINALIZE_STEP_DELAY_MS: u64 = 500;
const DEFAULT_SHUTDOWN_DRAIN_SECS: u64 = 5;

/// Generates a getter/setter pair for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> u64 {
            let path: &[&str] = $path;
            let parsed = match self.get_value(path) {
                Ok(Value::Number(n)) => n.as_u64(),
                Ok(Value::String(s)) => s.trim().parse().ok(),
                Ok(_) | Err(_) => return $default,
            };
            parsed.unwrap_or_else(|| {
                warn!(key = %path.join("."), "Invalid value, using default {}", $default);
                $default
            })
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Generates a getter/setter pair for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Generates a getter/setter pair for non-empty string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => s,
                Ok(Value::Number(n)) => n.to_string(),
                _ => $default.to_string(),
            }
        }

        pub fn $setter(&self, value: impl Into<String>) -> Result<()> {
            self.set_value($path, Value::String(value.into()))
        }
    };
}

/// Configuration manager for KeepWatch
///
/// The YAML document is kept behind a mutex; every setter writes the whole
/// document back to `config.yaml`.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Creates the directory if needed and checks it is readable and writable
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;
        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `KEEPWATCH_CONFIG` environment variable
    /// 3. `.keepwatch` in the current directory
    /// 4. `.keepwatch` in the user's home directory
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// The embedded defaults are merged with `<dir>/config.yaml` if present,
    /// then environment overrides are applied and the merged document is
    /// written back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let path = Path::new(&config_dir)
            .join("config.yaml")
            .to_string_lossy()
            .to_string();

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                if !external.is_null() {
                    merge_yaml(&mut config_value, &external);
                }
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = lower_keys_value(config_value);
        apply_env_overrides(&mut config_value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Directory holding `config.yaml`
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// `path` is a list of keys, e.g. `&["playback", "min_watch_secs"]`.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut self.data(), path, value)?;
        self.save()
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        get_value_internal(&self.data(), path)
    }

    /// Configured servers, passwords decrypted
    ///
    /// An entry whose password cannot be decrypted (config copied from
    /// another machine) fails the whole call.
    pub fn get_servers(&self) -> Result<Vec<ServerEntry>> {
        let entries: Vec<ServerEntry> = match self.get_value(&["servers"]) {
            Ok(Value::Null) | Err(_) => Vec::new(),
            Ok(value) => serde_yaml::from_value(value)
                .map_err(|e| anyhow!("Invalid servers section: {}", e))?,
        };
        entries.iter().map(ServerEntry::decrypted).collect()
    }

    /// Replaces the configured servers, encrypting plaintext passwords
    ///
    /// Without a machine id the passwords are stored as given.
    pub fn set_servers(&self, servers: &[ServerEntry]) -> Result<()> {
        let stored: Vec<ServerEntry> = servers
            .iter()
            .map(|entry| {
                entry.encrypted().unwrap_or_else(|e| {
                    warn!(server = %entry.display_name(), "Password stored unencrypted: {}", e);
                    entry.clone()
                })
            })
            .collect();
        self.set_value(&["servers"], serde_yaml::to_value(stored)?)
    }

    /// Appends the servers of a legacy `emby.json` file
    ///
    /// Returns the number of imported entries. Entries already present
    /// (same url and username) are skipped.
    pub fn import_legacy_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let imported = import_legacy_json(path)?;
        let mut servers = self.get_servers()?;
        let before = servers.len();
        for entry in imported {
            let known = servers
                .iter()
                .any(|s| s.url == entry.url && s.username == entry.username);
            if !known {
                servers.push(entry);
            }
        }
        let added = servers.len() - before;
        if added > 0 {
            self.set_servers(&servers)?;
            info!(count = added, "Imported servers from legacy file");
        }
        Ok(added)
    }

    /// Device id announced to the servers, generated and persisted on first use
    pub fn get_device_id(&self) -> Result<String> {
        let path = &["client", "device_id"];
        match self.get_value(path) {
            Ok(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            _ => {
                let id = Uuid::new_v4().to_string();
                self.set_value(path, Value::String(id.clone()))?;
                Ok(id)
            }
        }
    }

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_string_config!(
        get_client_name,
        set_client_name,
        &["client", "name"],
        DEFAULT_CLIENT_NAME
    );

    impl_string_config!(
        get_client_device,
        set_client_device,
        &["client", "device"],
        DEFAULT_CLIENT_DEVICE
    );

    impl_string_config!(
        get_client_version,
        set_client_version,
        &["client", "version"],
        DEFAULT_CLIENT_VERSION
    );

    impl_u64_config!(
        get_request_timeout_secs,
        set_request_timeout_secs,
        &["client", "request_timeout_secs"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );

    impl_bool_config!(
        get_accept_invalid_certs,
        set_accept_invalid_certs,
        &["client", "accept_invalid_certs"],
        true
    );

    impl_u64_config!(
        get_tick_interval_secs,
        set_tick_interval_secs,
        &["playback", "tick_interval_secs"],
        DEFAULT_TICK_INTERVAL_SECS
    );

    impl_u64_config!(
        get_min_watch_secs,
        set_min_watch_secs,
        &["playback", "min_watch_secs"],
        DEFAULT_MIN_WATCH_SECS
    );

    impl_u64_config!(
        get_max_watch_secs,
        set_max_watch_secs,
        &["playback", "max_watch_secs"],
        DEFAULT_MAX_WATCH_SECS
    );

    impl_u64_config!(
        get_poll_interval_ms,
        set_poll_interval_ms,
        &["playback", "poll_interval_ms"],
        DEFAULT_POLL_INTERVAL_MS
    );

    impl_u64_config!(
        get_finalize_step_delay_ms,
        set_finalize_step_delay_ms,
        &["playback", "finalize_step_delay_ms"],
        DEFAULT_FINALIZE_STEP_DELAY_MS
    );

    impl_u64_config!(
        get_shutdown_drain_secs,
        set_shutdown_drain_secs,
        &["playback", "shutdown_drain_secs"],
        DEFAULT_SHUTDOWN_DRAIN_SECS
    );

    impl_bool_config!(
        get_verify_saved_position,
        set_verify_saved_position,
        &["playback", "verify_saved_position"],
        false
    );
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Path {} is not a map", path[..i].join(".")));
        };
        current = map
            .get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
    }
    Ok(current.clone())
}

/// Applies `KEEPWATCH_CONFIG__A__B=value` variables to the document
fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path = rest.split("__").collect::<Vec<_>>();
        if let Err(e) = set_value_internal(config, &key_path, convert_env_value(&value)) {
            warn!(variable = %key, "Ignoring environment override: {}", e);
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys_value(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
