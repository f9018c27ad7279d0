//! `GlobalOpts`-aware wrappers over `unicast-config`.
//!
//! Core never sees these types -- it receives a pre-built `HubConfig`.

use std::path::PathBuf;

use unicast_core::HubConfig;

pub use unicast_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file path: `--config` / `UNICAST_CONFIG`, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(unicast_config::config_path)
}

/// Load the config file (defaults if absent) plus environment overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(unicast_config::load_config_from(&config_path(global))?)
}

/// Validated hub configuration, with scanning optionally forced off.
pub fn hub_config(cfg: &Config, no_scan: bool) -> Result<HubConfig, CliError> {
    let mut hub = cfg.to_hub_config()?;
    if no_scan {
        hub.scan.enabled = false;
    }
    Ok(hub)
}
