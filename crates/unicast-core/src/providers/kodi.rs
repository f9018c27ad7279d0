// ── Kodi media providers ──

use std::future::Future;
use std::sync::Arc;

use super::MediaProvider;
use crate::config::{HubConfig, ProviderConfig};
use crate::entity::{Entity, HubSlot};
use crate::error::CoreError;
use crate::factory::{ConfigSource, ConfigurableFactory};

pub const KODI_KIND: &str = "kodi";

const SOURCE_SCHEME: &str = "kodi://";

/// A Kodi instance exposing its library over JSON-RPC.
///
/// Claims media sources of the form `kodi://<name>/<path>`, matching the
/// provider name case-insensitively.
#[derive(Debug)]
pub struct KodiMediaProvider {
    name: String,
    address: String,
    port: u16,
    slot: HubSlot,
}

impl KodiMediaProvider {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            slot: HubSlot::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// JSON-RPC endpoint of the instance.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/jsonrpc", self.address, self.port)
    }
}

impl Entity for KodiMediaProvider {
    fn hub_slot(&self) -> Option<&HubSlot> {
        Some(&self.slot)
    }
}

impl MediaProvider for KodiMediaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        KODI_KIND
    }

    fn matches(&self, source: &str) -> bool {
        source
            .strip_prefix(SOURCE_SCHEME)
            .and_then(|rest| rest.split_once('/'))
            .is_some_and(|(name, _)| name.eq_ignore_ascii_case(&self.name))
    }
}

/// Builds providers from the `kodi` records of a [`HubConfig`].
#[derive(Debug, Clone, Default)]
pub struct KodiConfigSource {
    records: Vec<ProviderConfig>,
}

impl KodiConfigSource {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            records: config.providers_of(KODI_KIND).cloned().collect(),
        }
    }
}

impl ConfigSource<dyn MediaProvider> for KodiConfigSource {
    type Config = ProviderConfig;

    fn entities_config(&self) -> Vec<ProviderConfig> {
        self.records.clone()
    }

    fn create_from_config(
        &self,
        config: ProviderConfig,
    ) -> impl Future<Output = Result<Arc<dyn MediaProvider>, CoreError>> + Send + 'static {
        async move {
            if config.name.trim().is_empty() {
                return Err(CoreError::construction(KODI_KIND, "provider name is empty"));
            }
            if config.address.trim().is_empty() || config.port == 0 {
                return Err(CoreError::construction(
                    KODI_KIND,
                    format!("provider {} needs an address and a port", config.name),
                ));
            }

            let provider: Arc<dyn MediaProvider> = Arc::new(KodiMediaProvider::new(
                config.name,
                config.address,
                config.port,
            ));
            Ok(provider)
        }
    }
}

/// Kodi instances are never scanned for, only configured.
pub type KodiMediaProviderFactory = ConfigurableFactory<KodiConfigSource>;

pub fn kodi_factory(config: &HubConfig) -> KodiMediaProviderFactory {
    ConfigurableFactory::config_only(KODI_KIND, KodiConfigSource::new(config))
        .with_channel_capacity(config.scan.channel_capacity)
}
