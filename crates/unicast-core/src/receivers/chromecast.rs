// ── Chromecast receivers ──
//
// Receivers built from `kind = "chromecast"` records, plus live discovery
// through an injected device scanner. The scanner is the network transport
// (mDNS, SSDP); this module only filters and converts what it reports.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, trace};

use super::MediaReceiver;
use crate::cancel::CancelToken;
use crate::config::{HubConfig, ReceiverConfig};
use crate::entity::{Entity, HubSlot};
use crate::error::CoreError;
use crate::factory::{ConfigSource, ConfigurableFactory, DiscoveryStream, ScanSource};
use crate::hub::Hub;

pub const CHROMECAST_KIND: &str = "chromecast";

// ── Receiver ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ChromecastReceiver {
    name: String,
    address: String,
    slot: HubSlot,
}

impl ChromecastReceiver {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            slot: HubSlot::new(),
        }
    }

    /// The hub this receiver was registered with, if still alive.
    pub fn hub(&self) -> Option<Hub> {
        self.slot.hub()
    }
}

impl Entity for ChromecastReceiver {
    fn on_entity_init(&self) {
        trace!(receiver = %self.name, address = %self.address, "chromecast receiver registered");
    }

    fn hub_slot(&self) -> Option<&HubSlot> {
        Some(&self.slot)
    }
}

impl MediaReceiver for ChromecastReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        CHROMECAST_KIND
    }

    fn address(&self) -> &str {
        &self.address
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Builds receivers from the `chromecast` records of a [`HubConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChromecastConfigSource {
    records: Vec<ReceiverConfig>,
}

impl ChromecastConfigSource {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            records: config.receivers_of(CHROMECAST_KIND).cloned().collect(),
        }
    }
}

impl ConfigSource<dyn MediaReceiver> for ChromecastConfigSource {
    type Config = ReceiverConfig;

    fn entities_config(&self) -> Vec<ReceiverConfig> {
        self.records.clone()
    }

    fn create_from_config(
        &self,
        config: ReceiverConfig,
    ) -> impl Future<Output = Result<Arc<dyn MediaReceiver>, CoreError>> + Send + 'static {
        async move {
            if config.name.trim().is_empty() {
                return Err(CoreError::construction(CHROMECAST_KIND, "receiver name is empty"));
            }
            if config.address.trim().is_empty() {
                return Err(CoreError::construction(
                    CHROMECAST_KIND,
                    format!("receiver {} has no address", config.name),
                ));
            }

            let receiver: Arc<dyn MediaReceiver> =
                Arc::new(ChromecastReceiver::new(config.name, config.address));
            Ok(receiver)
        }
    }
}

// ── Discovery ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// A device reported by a [`DeviceScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    pub name: String,
    pub address: String,
    pub status: DeviceStatus,
}

/// Network transport discovering cast devices.
///
/// The stream may run until `cancel` is triggered. A device can be
/// reported more than once.
pub trait DeviceScanner: Send + Sync + 'static {
    fn devices(&self, cancel: CancelToken) -> BoxStream<'static, Result<ScannedDevice, CoreError>>;
}

/// Scan half of the chromecast factory.
///
/// Yields one receiver per online device whose address is neither
/// configured nor already reported. Without a scanner it yields nothing.
#[derive(Clone, Default)]
pub struct ChromecastScan {
    scanner: Option<Arc<dyn DeviceScanner>>,
}

impl ChromecastScan {
    pub fn new(scanner: Option<Arc<dyn DeviceScanner>>) -> Self {
        Self { scanner }
    }
}

impl ScanSource<dyn MediaReceiver> for ChromecastScan {
    fn entities_from_scan(
        &self,
        known: Vec<Arc<dyn MediaReceiver>>,
        cancel: CancelToken,
    ) -> DiscoveryStream<dyn MediaReceiver> {
        let Some(scanner) = &self.scanner else {
            return futures::stream::empty().boxed();
        };

        let mut seen: HashSet<String> = known.iter().map(|r| r.address().to_owned()).collect();

        scanner
            .devices(cancel)
            .filter_map(move |item| {
                let receiver = match item {
                    Err(e) => Some(Err(e)),
                    Ok(device) if device.status != DeviceStatus::Online => {
                        trace!(device = %device.name, status = %device.status, "skipping device");
                        None
                    }
                    Ok(device) if !seen.insert(device.address.clone()) => {
                        trace!(device = %device.name, address = %device.address, "device already known");
                        None
                    }
                    Ok(device) => {
                        debug!(device = %device.name, address = %device.address, "discovered chromecast");
                        let receiver: Arc<dyn MediaReceiver> =
                            Arc::new(ChromecastReceiver::new(device.name, device.address));
                        Some(Ok(receiver))
                    }
                };
                futures::future::ready(receiver)
            })
            .boxed()
    }
}

impl std::fmt::Debug for ChromecastScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromecastScan")
            .field("scanner", &self.scanner.is_some())
            .finish()
    }
}

// ── Factory ──────────────────────────────────────────────────────────

pub type ChromecastReceiverFactory = ConfigurableFactory<ChromecastConfigSource, ChromecastScan>;

/// The chromecast factory for `config`. Scanning only happens when it is
/// enabled and a scanner is supplied.
pub fn chromecast_factory(
    config: &HubConfig,
    scanner: Option<Arc<dyn DeviceScanner>>,
) -> ChromecastReceiverFactory {
    let scanner = scanner.filter(|_| config.scan.enabled);

    ConfigurableFactory::new(
        CHROMECAST_KIND,
        ChromecastConfigSource::new(config),
        ChromecastScan::new(scanner),
    )
    .with_channel_capacity(config.scan.channel_capacity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::factory::EntityFactory;

    struct FixedScanner(Vec<ScannedDevice>);

    impl DeviceScanner for FixedScanner {
        fn devices(
            &self,
            _cancel: CancelToken,
        ) -> BoxStream<'static, Result<ScannedDevice, CoreError>> {
            futures::stream::iter(self.0.clone().into_iter().map(Ok)).boxed()
        }
    }

    fn device(name: &str, address: &str, status: DeviceStatus) -> ScannedDevice {
        ScannedDevice {
            name: name.into(),
            address: address.into(),
            status,
        }
    }

    fn config(receivers: &[(&str, &str)]) -> HubConfig {
        HubConfig {
            receivers: receivers
                .iter()
                .map(|(name, address)| ReceiverConfig {
                    kind: CHROMECAST_KIND.into(),
                    name: (*name).into(),
                    address: (*address).into(),
                })
                .collect(),
            ..HubConfig::default()
        }
    }

    async fn discovered(factory: &ChromecastReceiverFactory) -> Vec<Result<String, String>> {
        EntityFactory::<dyn MediaReceiver>::entities(factory, CancelToken::new())
            .map(|item| item.map(|r| r.name().to_owned()).map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn scan_skips_configured_duplicate_and_offline_devices() {
        let scanner = FixedScanner(vec![
            device("Configured Again", "10.0.0.20", DeviceStatus::Online),
            device("Kitchen", "10.0.0.30", DeviceStatus::Online),
            device("Kitchen (echo)", "10.0.0.30", DeviceStatus::Online),
            device("Garage", "10.0.0.40", DeviceStatus::Offline),
        ]);
        let factory = chromecast_factory(
            &config(&[("Living Room", "10.0.0.20")]),
            Some(Arc::new(scanner)),
        );

        assert_eq!(
            discovered(&factory).await,
            vec![Ok("Living Room".to_owned()), Ok("Kitchen".to_owned())]
        );
    }

    #[tokio::test]
    async fn disabled_scanning_yields_configured_receivers_only() {
        let mut config = config(&[("Living Room", "10.0.0.20")]);
        config.scan.enabled = false;
        let scanner = FixedScanner(vec![device("Kitchen", "10.0.0.30", DeviceStatus::Online)]);

        let factory = chromecast_factory(&config, Some(Arc::new(scanner)));

        assert_eq!(discovered(&factory).await, vec![Ok("Living Room".to_owned())]);
    }

    #[tokio::test]
    async fn invalid_record_is_an_isolated_error() {
        let source = ChromecastConfigSource::new(&config(&[("Bedroom", " ")]));
        let record = source.entities_config().remove(0);

        let err = source.create_from_config(record).await.err().unwrap();

        assert!(err.is_isolated());
        assert_eq!(
            err.to_string(),
            "Could not build chromecast entity: receiver Bedroom has no address"
        );
    }

    #[test]
    fn other_receiver_kinds_are_ignored() {
        let mut config = config(&[("Living Room", "10.0.0.20")]);
        config.receivers.push(ReceiverConfig {
            kind: "dlna".into(),
            name: "Bedroom".into(),
            address: "10.0.0.21".into(),
        });

        assert_eq!(ChromecastConfigSource::new(&config).entities_config().len(), 1);
    }
}
