//! Configuration for the unicast hub.
//!
//! A TOML file (plus `UNICAST_`-prefixed environment overrides) declaring
//! the hub name, statically known receivers and providers, and discovery
//! settings, translated to `unicast_core::HubConfig`.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use unicast_core::{HubConfig, ProviderConfig, ReceiverConfig, ScanSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Hub name, shown in logs and listings.
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub scan: Scan,

    /// Statically known receivers.
    #[serde(default)]
    pub receivers: Vec<Receiver>,

    /// Statically known media providers.
    #[serde(default)]
    pub providers: Vec<Provider>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            defaults: Defaults::default(),
            scan: Scan::default(),
            receivers: Vec::new(),
            providers: Vec::new(),
        }
    }
}

/// CLI defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Seconds `discover` waits for scans before printing.
    #[serde(default = "default_discover_timeout")]
    pub discover_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            discover_timeout: default_discover_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Scan {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// A `[[receivers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Receiver {
    #[serde(default = "default_receiver_kind")]
    pub kind: String,

    pub name: String,

    /// Host or `host:port` (e.g., "192.168.1.20").
    pub address: String,
}

/// A `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Provider {
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    pub name: String,

    pub address: String,

    #[serde(default = "default_provider_port")]
    pub port: u16,
}

fn default_name() -> String {
    "unicast".into()
}
fn default_output() -> String {
    "table".into()
}
fn default_discover_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    32
}
fn default_receiver_kind() -> String {
    "chromecast".into()
}
fn default_provider_kind() -> String {
    "kodi".into()
}
fn default_provider_port() -> u16 {
    8080
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Check names, kinds and addresses of every entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("name", "must not be empty"));
        }
        if self.scan.channel_capacity == 0 {
            return Err(ConfigError::validation(
                "scan.channel_capacity",
                "must be at least 1",
            ));
        }

        let mut names = HashSet::new();
        for (i, receiver) in self.receivers.iter().enumerate() {
            let field = format!("receivers[{i}]");
            check_entry(&field, &receiver.kind, &receiver.name)?;
            check_address(&field, &receiver.address)?;
            if !names.insert(receiver.name.as_str()) {
                return Err(ConfigError::validation(
                    field,
                    format!("duplicate receiver name '{}'", receiver.name),
                ));
            }
        }

        let mut names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            let field = format!("providers[{i}]");
            check_entry(&field, &provider.kind, &provider.name)?;
            check_address(&field, &provider.address)?;
            if provider.port == 0 {
                return Err(ConfigError::validation(field, "port must not be 0"));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::validation(
                    field,
                    format!("duplicate provider name '{}'", provider.name),
                ));
            }
        }

        Ok(())
    }

    /// Validate, then build the runtime hub configuration.
    pub fn to_hub_config(&self) -> Result<HubConfig, ConfigError> {
        self.validate()?;

        Ok(HubConfig {
            name: self.name.clone(),
            receivers: self
                .receivers
                .iter()
                .map(|r| ReceiverConfig {
                    kind: r.kind.clone(),
                    name: r.name.clone(),
                    address: r.address.clone(),
                })
                .collect(),
            providers: self
                .providers
                .iter()
                .map(|p| ProviderConfig {
                    kind: p.kind.clone(),
                    name: p.name.clone(),
                    address: p.address.clone(),
                    port: p.port,
                })
                .collect(),
            scan: ScanSettings {
                enabled: self.scan.enabled,
                channel_capacity: self.scan.channel_capacity,
            },
        })
    }
}

fn check_entry(field: &str, kind: &str, name: &str) -> Result<(), ConfigError> {
    if kind.trim().is_empty() {
        return Err(ConfigError::validation(field, "kind must not be empty"));
    }
    if name.trim().is_empty() {
        return Err(ConfigError::validation(field, "name must not be empty"));
    }
    Ok(())
}

/// Accepts an IP address, a socket address, or `hostname[:port]`.
fn check_address(field: &str, address: &str) -> Result<(), ConfigError> {
    if address.parse::<IpAddr>().is_ok() || address.parse::<SocketAddr>().is_ok() {
        return Ok(());
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (address, None),
    };

    let valid_host = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    let valid_port = port.is_none_or(|p| p.parse::<u16>().is_ok_and(|p| p != 0));

    if valid_host && valid_port {
        Ok(())
    } else {
        Err(ConfigError::validation(
            field,
            format!("invalid address: '{address}'"),
        ))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "unicast", "unicast").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unicast");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
///
/// Environment variables use the `UNICAST_` prefix with `__` separating
/// nested keys, e.g. `UNICAST_SCAN__ENABLED=false`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNICAST_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
