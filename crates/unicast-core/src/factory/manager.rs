// ── Factory registry + scan orchestration ──
//
// A registry whose entities are factories. Adding a factory starts a
// background scan forwarding what it discovers into a target registry;
// deleting it cancels that scan.

use std::fmt;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::DynEntityFactory;
use crate::cancel::CancelToken;
use crate::entity::Entity;
use crate::hub::HubRef;
use crate::store::EntityManager;

const SCAN_EVENT_CHANNEL_SIZE: usize = 64;

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScanOutcome {
    /// The factory's sequence was exhausted.
    Completed,
    /// Cancellation was requested before the sequence ended.
    Cancelled,
    /// The sequence reported a failure, or the scan panicked.
    Failed(String),
}

/// Emitted once per scan, when it terminates.
#[derive(Debug, Clone)]
pub struct ScanEvent<T> {
    pub key: T,
    pub outcome: ScanOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Cancellation table entry. `id` tells apart successive scans that
/// share a factory key.
struct ActiveScan {
    id: u64,
    cancel: CancelToken,
}

/// Registry of factories producing `E`, forwarding discovered entities
/// into a target `EntityManager<E, K>`. Factories are keyed by `T`.
///
/// Invariant: at most one in-flight scan, and one cancellation-table
/// entry, per factory key.
pub struct EntityFactoryManager<E: ?Sized + Entity, K, T: Eq + Hash> {
    factories: EntityManager<DynEntityFactory<E>, T>,
    target: Arc<EntityManager<E, K>>,
    cancellations: Arc<DashMap<T, ActiveScan>>,
    next_scan: AtomicU64,
    scan_events: broadcast::Sender<ScanEvent<T>>,
}

impl<E, K> EntityFactoryManager<E, K, String>
where
    E: ?Sized + Entity,
    K: Clone + PartialEq + Send + Sync + 'static,
{
    /// Manager keying factories by [`kind`](super::EntityFactory::kind).
    pub fn by_kind(hub: HubRef, target: Arc<EntityManager<E, K>>) -> Self {
        Self::new(hub, target, |factory| factory.kind().to_owned())
    }
}

impl<E, K, T> EntityFactoryManager<E, K, T>
where
    E: ?Sized + Entity,
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(
        hub: HubRef,
        target: Arc<EntityManager<E, K>>,
        key_fn: impl Fn(&DynEntityFactory<E>) -> T + Send + Sync + 'static,
    ) -> Self {
        let (scan_events, _) = broadcast::channel(SCAN_EVENT_CHANNEL_SIZE);

        Self {
            factories: EntityManager::new(hub, key_fn),
            target,
            cancellations: Arc::new(DashMap::new()),
            next_scan: AtomicU64::new(0),
            scan_events,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Register `factory` and start scanning it in the background.
    ///
    /// Returns without waiting for discovery. A scan already in flight for
    /// the same key is cancelled first. Must be called from within a
    /// Tokio runtime.
    pub fn add(&self, factory: Arc<DynEntityFactory<E>>) -> &Self {
        self.factories.add(Arc::clone(&factory));
        self.spawn_scan(factory);
        self
    }

    /// Unregister the first factory sharing `factory`'s key and cancel its
    /// scan. Entities already forwarded stay in the target registry.
    pub fn delete(&self, factory: &DynEntityFactory<E>) -> Option<Arc<DynEntityFactory<E>>> {
        let key = self.factories.key_of(factory);
        self.delete_keyed(&key)
    }

    pub fn delete_keyed(&self, key: &T) -> Option<Arc<DynEntityFactory<E>>> {
        let removed = self.factories.delete_keyed(key);

        if let Some((_, scan)) = self.cancellations.remove(key) {
            debug!(factory = ?key, scan = scan.id, "cancelling scan of deleted factory");
            scan.cancel.cancel();
        }

        removed
    }

    /// Cancel every in-flight scan. Registered factories stay registered.
    pub fn cancel_all(&self) {
        self.cancellations.retain(|key, scan| {
            debug!(factory = ?key, scan = scan.id, "cancelling scan");
            scan.cancel.cancel();
            false
        });
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The registry of factories themselves.
    pub fn factories(&self) -> &EntityManager<DynEntityFactory<E>, T> {
        &self.factories
    }

    /// The registry discovered entities are forwarded to.
    pub fn target(&self) -> &Arc<EntityManager<E, K>> {
        &self.target
    }

    /// Whether a scan is in flight for the given factory key.
    pub fn is_scanning(&self, key: &T) -> bool {
        self.cancellations.contains_key(key)
    }

    pub fn scanning_count(&self) -> usize {
        self.cancellations.len()
    }

    /// Subscribe to scan termination events.
    pub fn subscribe_scans(&self) -> broadcast::Receiver<ScanEvent<T>> {
        self.scan_events.subscribe()
    }

    // ── Scan tasks ───────────────────────────────────────────────────

    fn spawn_scan(&self, factory: Arc<DynEntityFactory<E>>) {
        let key = self.factories.key_of(&*factory);
        let id = self.next_scan.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelToken::new();

        let previous = self.cancellations.insert(
            key.clone(),
            ActiveScan {
                id,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(factory = ?key, scan = previous.id, "superseding in-flight scan");
            previous.cancel.cancel();
        }

        let target = Arc::clone(&self.target);
        let cancellations = Arc::clone(&self.cancellations);
        let scan_events = self.scan_events.clone();

        tokio::spawn(async move {
            debug!(factory = ?key, scan = id, "scan started");

            let outcome = AssertUnwindSafe(scan_factory(&*factory, &target, &cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| ScanOutcome::Failed("scan task panicked".into()));

            cancellations.remove_if(&key, |_, scan| scan.id == id);

            match &outcome {
                ScanOutcome::Failed(reason) => {
                    error!(factory = ?key, scan = id, %reason, "scan failed");
                }
                outcome => debug!(factory = ?key, scan = id, %outcome, "scan finished"),
            }

            let _ = scan_events.send(ScanEvent {
                key,
                outcome,
                finished_at: Utc::now(),
            });
        });
    }
}

/// Forward everything `factory` discovers into `target` until the
/// sequence ends, fails, or `cancel` is triggered.
async fn scan_factory<E, K>(
    factory: &DynEntityFactory<E>,
    target: &EntityManager<E, K>,
    cancel: &CancelToken,
) -> ScanOutcome
where
    E: ?Sized + Entity,
    K: Clone + PartialEq + Send + Sync + 'static,
{
    let mut entities = factory.entities(cancel.clone());

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return ScanOutcome::Cancelled,
            item = entities.next() => match item {
                None => return ScanOutcome::Completed,
                Some(Ok(entity)) => {
                    if cancel.cancellation_requested() {
                        return ScanOutcome::Cancelled;
                    }
                    debug!(factory = factory.kind(), "forwarding discovered entity");
                    target.add(entity);
                }
                Some(Err(e)) if e.is_isolated() => {
                    warn!(factory = factory.kind(), error = %e, "skipping entity");
                }
                Some(Err(e)) => return ScanOutcome::Failed(e.to_string()),
            },
        }
    }
}

impl<E: ?Sized + Entity, K, T: Eq + Hash> Drop for EntityFactoryManager<E, K, T> {
    fn drop(&mut self) {
        for scan in self.cancellations.iter() {
            scan.cancel.cancel();
        }
    }
}

impl<E: ?Sized + Entity, K, T: Eq + Hash> fmt::Debug for EntityFactoryManager<E, K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactoryManager")
            .field("factories", &self.factories)
            .field("scanning", &self.cancellations.len())
            .finish_non_exhaustive()
    }
}
