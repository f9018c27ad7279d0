// ── Registry change notifications ──

use std::fmt;
use std::sync::Arc;

/// Change notification emitted by an `EntityManager`.
///
/// Carries the affected entity together with its derived key.
pub enum EntityEvent<E: ?Sized, K> {
    Added { entity: Arc<E>, key: K },
    Removed { entity: Arc<E>, key: K },
}

impl<E: ?Sized, K> EntityEvent<E, K> {
    pub fn entity(&self) -> &Arc<E> {
        match self {
            Self::Added { entity, .. } | Self::Removed { entity, .. } => entity,
        }
    }

    pub fn key(&self) -> &K {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } => key,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }

    /// Wire name of the event (`entity-added` / `entity-removed`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added { .. } => "entity-added",
            Self::Removed { .. } => "entity-removed",
        }
    }
}

// Manual impls: derives would demand `E: Clone` / `E: Debug`.

impl<E: ?Sized, K: Clone> Clone for EntityEvent<E, K> {
    fn clone(&self) -> Self {
        match self {
            Self::Added { entity, key } => Self::Added {
                entity: Arc::clone(entity),
                key: key.clone(),
            },
            Self::Removed { entity, key } => Self::Removed {
                entity: Arc::clone(entity),
                key: key.clone(),
            },
        }
    }
}

impl<E: ?Sized, K: fmt::Debug> fmt::Debug for EntityEvent<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityEvent")
            .field("name", &self.name())
            .field("key", self.key())
            .finish_non_exhaustive()
    }
}

/// Handle returned by `EntityManager::on_change`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
