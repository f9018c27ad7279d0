// ── Hub context ──
//
// The root object owning every registry. Entities only ever hold a weak
// `HubRef` back to it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::config::HubConfig;
use crate::providers::{ProviderFactoriesManager, ProvidersManager, kodi_factory};
use crate::receivers::{DeviceScanner, ReceiverFactoriesManager, ReceiversManager, chromecast_factory};
use crate::subtitles::SubtitlesProvidersManager;

/// Shared application context.
///
/// Cheaply cloneable via `Arc<HubInner>`. Owns the receiver and provider
/// registries, the factory managers feeding them, and the subtitle
/// providers registry.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    receivers: Arc<ReceiversManager>,
    receiver_factories: ReceiverFactoriesManager,
    providers: Arc<ProvidersManager>,
    provider_factories: ProviderFactoriesManager,
    subtitles: SubtitlesProvidersManager,
    /// Transport for live receiver discovery, if any.
    scanner: Option<Arc<dyn DeviceScanner>>,
    started: AtomicBool,
}

impl Hub {
    /// Build a hub with empty registries. Does NOT start discovery; call
    /// [`start()`](Self::start) from within a Tokio runtime.
    pub fn new(config: HubConfig) -> Self {
        Self::build(config, None)
    }

    /// Like [`new`](Self::new), with a transport for live receiver
    /// discovery.
    pub fn with_device_scanner(config: HubConfig, scanner: Arc<dyn DeviceScanner>) -> Self {
        Self::build(config, Some(scanner))
    }

    fn build(config: HubConfig, scanner: Option<Arc<dyn DeviceScanner>>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<HubInner>| {
            let hub = HubRef {
                inner: weak.clone(),
            };
            let receivers = Arc::new(ReceiversManager::by_name(hub.clone()));
            let providers = Arc::new(ProvidersManager::by_name(hub.clone()));

            HubInner {
                receiver_factories: ReceiverFactoriesManager::by_kind(
                    hub.clone(),
                    Arc::clone(&receivers),
                ),
                provider_factories: ProviderFactoriesManager::by_kind(
                    hub.clone(),
                    Arc::clone(&providers),
                ),
                subtitles: SubtitlesProvidersManager::by_name(hub),
                receivers,
                providers,
                config,
                scanner,
                started: AtomicBool::new(false),
            }
        });

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn receivers(&self) -> &Arc<ReceiversManager> {
        &self.inner.receivers
    }

    pub fn receiver_factories(&self) -> &ReceiverFactoriesManager {
        &self.inner.receiver_factories
    }

    pub fn providers(&self) -> &Arc<ProvidersManager> {
        &self.inner.providers
    }

    pub fn provider_factories(&self) -> &ProviderFactoriesManager {
        &self.inner.provider_factories
    }

    pub fn subtitles(&self) -> &SubtitlesProvidersManager {
        &self.inner.subtitles
    }

    /// Weak handle to this hub, as handed to entities.
    pub fn downgrade(&self) -> HubRef {
        HubRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Register the built-in factories, which starts their scans.
    ///
    /// Idempotent. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!(hub = %self.name(), "hub already started");
            return;
        }

        let config = &self.inner.config;
        self.inner
            .receiver_factories
            .add(Arc::new(chromecast_factory(config, self.inner.scanner.clone())));
        self.inner.provider_factories.add(Arc::new(kodi_factory(config)));

        info!(
            hub = %self.name(),
            receivers = config.receivers.len(),
            providers = config.providers.len(),
            scan = config.scan.enabled,
            "hub started"
        );
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Cancel every in-flight scan. Registries keep their entities.
    pub fn shutdown(&self) {
        self.inner.receiver_factories.cancel_all();
        self.inner.provider_factories.cancel_all();
        info!(hub = %self.name(), "hub shut down");
    }

    /// Whether any factory scan is still running.
    pub fn is_scanning(&self) -> bool {
        self.inner.receiver_factories.scanning_count() + self.inner.provider_factories.scanning_count()
            > 0
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("name", &self.name())
            .field("receivers", &self.inner.receivers.len())
            .field("providers", &self.inner.providers.len())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// Weak back-reference to a [`Hub`].
///
/// A detached reference (see [`detached`](Self::detached)) never upgrades;
/// registries built outside a hub use one.
#[derive(Clone, Default)]
pub struct HubRef {
    inner: Weak<HubInner>,
}

impl HubRef {
    pub fn detached() -> Self {
        Self::default()
    }

    /// The hub, if it is still alive.
    pub fn upgrade(&self) -> Option<Hub> {
        self.inner.upgrade().map(|inner| Hub { inner })
    }
}

impl fmt::Debug for HubRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{ProviderConfig, ReceiverConfig};
    use crate::receivers::{ChromecastReceiver, MediaReceiver};

    fn config() -> HubConfig {
        HubConfig {
            name: "den".into(),
            receivers: vec![ReceiverConfig {
                kind: "chromecast".into(),
                name: "Living Room".into(),
                address: "10.0.0.20".into(),
            }],
            providers: vec![ProviderConfig {
                kind: "kodi".into(),
                name: "Den".into(),
                address: "10.0.0.5".into(),
                port: 8080,
            }],
            ..HubConfig::default()
        }
    }

    async fn wait_idle(hub: &Hub) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.is_scanning() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn start_discovers_configured_entities_once() {
        let hub = Hub::new(config());
        hub.start();
        hub.start();
        wait_idle(&hub).await;

        assert_eq!(hub.receivers().keys(), vec!["Living Room".to_owned()]);
        assert_eq!(hub.providers().keys(), vec!["Den".to_owned()]);
        assert_eq!(hub.receiver_factories().factories().len(), 1);
        assert!(hub.providers().match_source("kodi://den/movies/1").is_some());
    }

    #[tokio::test]
    async fn entities_see_the_hub_they_were_added_to() {
        let hub = Hub::new(config());
        let receiver = Arc::new(ChromecastReceiver::new("Kitchen", "10.0.0.30"));

        hub.receivers().add(Arc::clone(&receiver) as Arc<dyn MediaReceiver>);

        assert_eq!(receiver.hub().unwrap().name(), "den");
    }

    #[test]
    fn hub_ref_upgrades_only_while_hub_lives() {
        let hub = Hub::new(HubConfig::default());
        let weak = hub.downgrade();
        assert!(weak.upgrade().is_some());

        drop(hub);
        assert!(weak.upgrade().is_none());
        assert!(HubRef::detached().upgrade().is_none());
    }
}
