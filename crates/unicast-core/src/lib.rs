//! Entity registries and discovery engine for the unicast media hub.
//!
//! The hub tracks runtime resources (playback receivers, media providers,
//! subtitle providers) in keyed registries and keeps them populated by
//! running background discovery:
//!
//! - **[`Hub`]**: cheaply cloneable root context owning every registry.
//!   [`start()`](Hub::start) registers the built-in factories, which kicks
//!   off their scans; [`shutdown()`](Hub::shutdown) cancels them.
//!
//! - **[`EntityManager`]**: insertion-ordered registry with key derivation
//!   and change notification through synchronous listeners, a `broadcast`
//!   channel of [`EntityEvent`]s, and a [`SnapshotStream`].
//!
//! - **[`EntityFactory`]**: producer of a lazy [`DiscoveryStream`].
//!   [`ConfigurableFactory`] combines a [`ConfigSource`] with a
//!   [`ScanSource`] so configured entities always precede scanned ones.
//!
//! - **[`EntityFactoryManager`]**: registry of factories. Adding one spawns
//!   a cancellable scan forwarding its entities into a target registry.
//!
//! - **[`in_completion_order`]** and **[`CancelToken`]**: the concurrency
//!   primitives the factories are built on.

pub mod cancel;
pub mod config;
pub mod entity;
pub mod error;
pub mod factory;
pub mod hub;
pub mod merge;
pub mod providers;
pub mod receivers;
pub mod store;
pub mod stream;
pub mod subtitles;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cancel::CancelToken;
pub use config::{HubConfig, ProviderConfig, ReceiverConfig, ScanSettings};
pub use entity::{Entity, HubSlot};
pub use error::CoreError;
pub use factory::{
    ConfigSource, ConfigurableFactory, DiscoveryStream, DynEntityFactory, EntityFactory,
    EntityFactoryManager, NoScan, ScanEvent, ScanOutcome, ScanSource,
};
pub use hub::{Hub, HubRef};
pub use merge::{CompletionOrder, in_completion_order};
pub use store::{EntityEvent, EntityManager, ListenerId};
pub use stream::SnapshotStream;

pub use providers::{
    KodiMediaProvider, MediaProvider, ProviderFactoriesManager, ProviderSummary, ProvidersManager,
};
pub use receivers::{
    ChromecastReceiver, DeviceScanner, DeviceStatus, MediaReceiver, ReceiverFactoriesManager,
    ReceiverSummary, ReceiversManager, ScannedDevice,
};
pub use subtitles::{MediaKind, MediaRecord, Subtitle, SubtitlesProvider, SubtitlesProvidersManager};
