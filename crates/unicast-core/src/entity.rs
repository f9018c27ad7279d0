// ── Managed entity contract ──
//
// Anything an `EntityManager` tracks: receivers, providers, factories.
// The manager, not the entity, wires up the back-reference to the hub.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::hub::{Hub, HubRef};

/// A runtime object representing a discovered or configured resource.
///
/// Both hooks are optional. Identity is not part of the trait: each
/// manager derives keys with its own key function.
pub trait Entity: Send + Sync + 'static {
    /// Called exactly once, synchronously, when the entity is added to a
    /// manager. Runs after the hub back-reference has been assigned and
    /// before listeners are notified.
    fn on_entity_init(&self) {}

    /// Storage for the hub back-reference. Entities that want access to
    /// the owning hub return their slot here.
    fn hub_slot(&self) -> Option<&HubSlot> {
        None
    }
}

/// Back-reference to the owning [`Hub`], filled in by the manager on add.
///
/// Holds a weak reference, so an entity never keeps its hub alive.
#[derive(Default)]
pub struct HubSlot {
    hub: ArcSwapOption<HubRef>,
}

impl HubSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, hub: &HubRef) {
        self.hub.store(Some(Arc::new(hub.clone())));
    }

    /// Whether a manager has assigned a hub reference.
    pub fn is_attached(&self) -> bool {
        self.hub.load().is_some()
    }

    /// The owning hub, if attached and still alive.
    pub fn hub(&self) -> Option<Hub> {
        self.hub.load().as_ref().and_then(|hub| hub.upgrade())
    }
}

impl fmt::Debug for HubSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HubConfig;

    #[test]
    fn slot_starts_detached() {
        let slot = HubSlot::new();
        assert!(!slot.is_attached());
        assert!(slot.hub().is_none());
    }

    #[test]
    fn attached_slot_resolves_live_hub() {
        let hub = Hub::new(HubConfig::default());
        let slot = HubSlot::new();
        slot.attach(&hub.downgrade());

        assert!(slot.is_attached());
        assert_eq!(slot.hub().unwrap().name(), hub.name());
    }

    #[test]
    fn slot_does_not_keep_hub_alive() {
        let hub = Hub::new(HubConfig::default());
        let slot = HubSlot::new();
        slot.attach(&hub.downgrade());
        drop(hub);

        assert!(slot.is_attached());
        assert!(slot.hub().is_none());
    }
}
