// ── Media receivers ──
//
// Playback devices the hub can cast to, and the registries holding them.

mod chromecast;

use serde::Serialize;

pub use chromecast::{
    CHROMECAST_KIND, ChromecastConfigSource, ChromecastReceiver, ChromecastReceiverFactory,
    ChromecastScan, DeviceScanner, DeviceStatus, ScannedDevice, chromecast_factory,
};

use crate::entity::Entity;
use crate::factory::EntityFactoryManager;
use crate::hub::HubRef;
use crate::store::EntityManager;

/// A device able to play media sent by the hub.
pub trait MediaReceiver: Entity {
    /// Display name, unique among receivers by convention.
    fn name(&self) -> &str;

    /// Kind of the factory that produced this receiver.
    fn kind(&self) -> &str;

    fn address(&self) -> &str;

    fn summary(&self) -> ReceiverSummary {
        ReceiverSummary {
            name: self.name().to_owned(),
            kind: self.kind().to_owned(),
            address: self.address().to_owned(),
        }
    }
}

/// Serializable view of a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverSummary {
    pub name: String,
    pub kind: String,
    pub address: String,
}

/// Receivers keyed by name.
pub type ReceiversManager = EntityManager<dyn MediaReceiver, String>;

/// Receiver factories keyed by kind, forwarding into a [`ReceiversManager`].
pub type ReceiverFactoriesManager = EntityFactoryManager<dyn MediaReceiver, String, String>;

fn receiver_name(receiver: &(dyn MediaReceiver + 'static)) -> String {
    receiver.name().to_owned()
}

impl EntityManager<dyn MediaReceiver, String> {
    pub fn by_name(hub: HubRef) -> Self {
        Self::new(hub, receiver_name)
    }

    /// Summaries of every registered receiver, in insertion order.
    pub fn summaries(&self) -> Vec<ReceiverSummary> {
        self.iter().map(|receiver| receiver.summary()).collect()
    }
}
