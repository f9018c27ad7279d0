// ── Runtime hub configuration ──
//
// Plain data handed to `Hub::new`. Loading from disk lives in
// `unicast-config`; the core never touches the filesystem.

use serde::{Deserialize, Serialize};

const DEFAULT_HUB_NAME: &str = "unicast";
const DEFAULT_SCAN_CHANNEL_CAPACITY: usize = 32;

/// Everything a [`Hub`](crate::Hub) needs to build its registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub name: String,
    pub receivers: Vec<ReceiverConfig>,
    pub providers: Vec<ProviderConfig>,
    pub scan: ScanSettings,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_HUB_NAME.into(),
            receivers: Vec::new(),
            providers: Vec::new(),
            scan: ScanSettings::default(),
        }
    }
}

impl HubConfig {
    /// Receiver records of the given kind, in declaration order.
    pub fn receivers_of(&self, kind: &str) -> impl Iterator<Item = &ReceiverConfig> {
        self.receivers.iter().filter(move |r| r.kind == kind)
    }

    /// Provider records of the given kind, in declaration order.
    pub fn providers_of(&self, kind: &str) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(move |p| p.kind == kind)
    }
}

/// A statically configured playback device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Factory kind, e.g. `chromecast`.
    pub kind: String,
    pub name: String,
    /// Host or `host:port`.
    pub address: String,
}

/// A statically configured media provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Factory kind, e.g. `kodi`.
    pub kind: String,
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// Background discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Whether factories look for unconfigured resources after building the
    /// configured ones.
    pub enabled: bool,
    /// Bound of the channel between a factory's producer task and its scan.
    pub channel_capacity: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: DEFAULT_SCAN_CHANNEL_CAPACITY,
        }
    }
}
