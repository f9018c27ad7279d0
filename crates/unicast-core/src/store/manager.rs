// ── Generic keyed entity registry ──
//
// Insertion-ordered storage with change notification. Keys are derived
// from entities by a manager-supplied function and are not unique: two
// entities with the same key coexist, lookups and deletes act on the
// first match.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use super::event::{EntityEvent, ListenerId};
use crate::entity::Entity;
use crate::hub::HubRef;
use crate::stream::SnapshotStream;

const EVENT_CHANNEL_SIZE: usize = 256;

type KeyFn<E, K> = Box<dyn Fn(&E) -> K + Send + Sync>;
type Listener<E, K> = Arc<dyn Fn(&EntityEvent<E, K>) + Send + Sync>;

/// Keyed registry of live entities.
///
/// Every mutation is announced three ways, all from within the mutating
/// call: synchronous listeners registered with [`on_change`](Self::on_change),
/// a `broadcast` channel of [`EntityEvent`]s, and a `watch` channel carrying
/// the full snapshot.
pub struct EntityManager<E: ?Sized + Entity, K> {
    hub: HubRef,
    key_fn: KeyFn<E, K>,
    entities: RwLock<Vec<Arc<E>>>,
    listeners: RwLock<Vec<(ListenerId, Listener<E, K>)>>,
    next_listener: AtomicU64,
    events: broadcast::Sender<EntityEvent<E, K>>,
    snapshot: watch::Sender<Arc<Vec<Arc<E>>>>,
}

impl<E, K> EntityManager<E, K>
where
    E: ?Sized + Entity,
    K: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an empty registry owned by `hub`, deriving keys with `key_fn`.
    pub fn new(hub: HubRef, key_fn: impl Fn(&E) -> K + Send + Sync + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            hub,
            key_fn: Box::new(key_fn),
            entities: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            events,
            snapshot,
        }
    }

    /// Derive the key of `entity` with this manager's key function.
    pub fn key_of(&self, entity: &E) -> K {
        (self.key_fn)(entity)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Attach the hub, run the init hook, append `entity`, then notify.
    ///
    /// Other tasks never observe an entity whose init hook has not run.
    /// Never rejects an entity, even if its key is already present.
    pub fn add(&self, entity: Arc<E>) -> &Self {
        if let Some(slot) = entity.hub_slot() {
            slot.attach(&self.hub);
        }
        entity.on_entity_init();

        let key = self.key_of(&entity);
        {
            let mut entities = self.entities.write();
            entities.push(Arc::clone(&entity));
            self.publish_snapshot(&entities);
        }

        self.notify(&EntityEvent::Added { entity, key });
        self
    }

    /// Remove the first entity whose key matches the key of `entity`.
    ///
    /// Both the return value and the `entity-removed` event carry the
    /// stored entity, not `entity`. The two share a key but may differ
    /// otherwise.
    pub fn delete(&self, entity: &E) -> Option<Arc<E>> {
        let key = self.key_of(entity);
        self.delete_keyed(&key)
    }

    /// Remove the first entity with the given key.
    ///
    /// Returns the removed entity, which is also what the `entity-removed`
    /// event carries. Nothing is emitted on a miss.
    pub fn delete_keyed(&self, key: &K) -> Option<Arc<E>> {
        let removed = {
            let mut entities = self.entities.write();
            let index = entities.iter().position(|e| self.key_of(e) == *key)?;
            let removed = entities.remove(index);
            self.publish_snapshot(&entities);
            removed
        };

        self.notify(&EntityEvent::Removed {
            entity: Arc::clone(&removed),
            key: key.clone(),
        });
        Some(removed)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn has_keyed(&self, key: &K) -> bool {
        self.entities.read().iter().any(|e| self.key_of(e) == *key)
    }

    pub fn has(&self, entity: &E) -> bool {
        self.has_keyed(&self.key_of(entity))
    }

    /// First entity with the given key.
    pub fn get(&self, key: &K) -> Option<Arc<E>> {
        self.entities
            .read()
            .iter()
            .find(|e| self.key_of(e) == *key)
            .map(Arc::clone)
    }

    /// Keys of every registered entity, in insertion order.
    pub fn keys(&self) -> Vec<K> {
        self.entities.read().iter().map(|e| self.key_of(e)).collect()
    }

    /// `(key, entity)` pairs in insertion order.
    pub fn entries(&self) -> Vec<(K, Arc<E>)> {
        self.entities
            .read()
            .iter()
            .map(|e| (self.key_of(e), Arc::clone(e)))
            .collect()
    }

    /// Iterate over the entities registered when the call is made.
    pub fn iter(&self) -> std::vec::IntoIter<Arc<E>> {
        self.entities.read().clone().into_iter()
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<E>>> {
        self.snapshot.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a listener invoked synchronously for every change.
    ///
    /// Listeners run outside the registry lock and may query or mutate
    /// the manager.
    pub fn on_change(
        &self,
        listener: impl Fn(&EntityEvent<E, K>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Subscribe to change events on a `broadcast` channel.
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent<E, K>> {
        self.events.subscribe()
    }

    /// Subscribe to full snapshots, re-published on every mutation.
    pub fn watch(&self) -> SnapshotStream<E> {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish_snapshot(&self, entities: &[Arc<E>]) {
        let values = entities.to_vec();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn notify(&self, event: &EntityEvent<E, K>) {
        let listeners: Vec<Listener<E, K>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(event);
        }

        if self.events.send(event.clone()).is_err() {
            trace!(event = event.name(), "no broadcast subscribers");
        }
    }
}

impl<'a, E, K> IntoIterator for &'a EntityManager<E, K>
where
    E: ?Sized + Entity,
    K: Clone + PartialEq + Send + Sync + 'static,
{
    type Item = Arc<E>;
    type IntoIter = std::vec::IntoIter<Arc<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: ?Sized + Entity, K> fmt::Debug for EntityManager<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("len", &self.entities.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}
