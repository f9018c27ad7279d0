// ── Entity factories ──
//
// Producers of lazy entity sequences, and the manager that scans them
// into a target registry.

mod configurable;
mod manager;

use std::sync::Arc;

use futures::stream::BoxStream;

pub use configurable::{ConfigSource, ConfigurableFactory, NoScan, ScanSource, configured_then_scanned};
pub use manager::{EntityFactoryManager, ScanEvent, ScanOutcome};

use crate::cancel::CancelToken;
use crate::entity::Entity;
use crate::error::CoreError;

/// Lazy sequence of discovered entities.
///
/// An `Err` item either affects that item alone (see
/// [`CoreError::is_isolated`]) or reports a failure of the whole sequence.
pub type DiscoveryStream<E> = BoxStream<'static, Result<Arc<E>, CoreError>>;

/// Trait object of a factory producing `E`, as stored by managers.
pub type DynEntityFactory<E> = dyn EntityFactory<E>;

/// A component producing entities of type `E`.
///
/// Factories are entities themselves, so they can be tracked by an
/// [`EntityFactoryManager`].
pub trait EntityFactory<E: ?Sized>: Entity {
    /// Short identifier of the factory, e.g. `chromecast`.
    fn kind(&self) -> &str;

    /// Produce entities as they become available. The sequence may be
    /// finite or run until `cancel` is triggered; implementations should
    /// stop soon after cancellation, but are not required to.
    fn entities(&self, cancel: CancelToken) -> DiscoveryStream<E>;
}
