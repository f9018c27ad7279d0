// ── Entity registries ──
//
// Keyed, insertion-ordered storage with push-based change notification.

mod event;
mod manager;

pub use event::{EntityEvent, ListenerId};
pub use manager::EntityManager;
