// ── Config + scan combinator ──
//
// The standard factory shape: entities built from static configuration
// records first, live discovery afterwards. A producer task drives both
// phases and feeds a bounded channel.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, trace};

use super::{DiscoveryStream, EntityFactory};
use crate::cancel::CancelToken;
use crate::entity::{Entity, HubSlot};
use crate::error::CoreError;
use crate::merge::in_completion_order;

const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Static configuration half of a configurable factory.
pub trait ConfigSource<E: ?Sized>: Send + Sync + 'static {
    type Config: Send + 'static;

    /// The configuration records to build entities from.
    fn entities_config(&self) -> Vec<Self::Config>;

    /// Build one entity from a configuration record.
    fn create_from_config(
        &self,
        config: Self::Config,
    ) -> impl Future<Output = Result<Arc<E>, CoreError>> + Send + 'static;
}

/// Live discovery half of a configurable factory.
pub trait ScanSource<E: ?Sized>: Send + Sync + 'static {
    /// Discover entities. `known` holds every config-derived entity so the
    /// scanner can skip resources that are already configured.
    fn entities_from_scan(&self, known: Vec<Arc<E>>, cancel: CancelToken) -> DiscoveryStream<E>;
}

/// Scan source that discovers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScan;

impl<E: ?Sized + Send + Sync + 'static> ScanSource<E> for NoScan {
    fn entities_from_scan(&self, _known: Vec<Arc<E>>, _cancel: CancelToken) -> DiscoveryStream<E> {
        futures::stream::empty().boxed()
    }
}

/// Combine a config source and a scan source into one sequence.
///
/// Config-derived entities are yielded in completion order. The scan is
/// not started until every config-derived entity has been yielded, so
/// none of its entities can overtake them. Construction failures are
/// passed through as isolated errors. A panic in either phase ends the
/// sequence with a [`CoreError::Discovery`] for `kind`.
///
/// Must be called from within a Tokio runtime.
pub fn configured_then_scanned<E, C, S>(
    kind: impl Into<String>,
    config: Arc<C>,
    scan: Arc<S>,
    cancel: CancelToken,
    capacity: usize,
) -> DiscoveryStream<E>
where
    E: ?Sized + Send + Sync + 'static,
    C: ConfigSource<E>,
    S: ScanSource<E>,
{
    let kind = kind.into();
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let produced = AssertUnwindSafe(produce(config, scan, cancel, tx.clone()))
            .catch_unwind()
            .await;

        if let Err(panic) = produced {
            let reason = panic_reason(panic.as_ref());
            error!(factory = %kind, %reason, "discovery producer panicked");
            let _ = tx
                .send(Err(CoreError::Discovery {
                    factory: kind,
                    reason,
                }))
                .await;
        }
    });

    ReceiverStream::new(rx).boxed()
}

type Sender<E> = mpsc::Sender<Result<Arc<E>, CoreError>>;

async fn produce<E, C, S>(config: Arc<C>, scan: Arc<S>, cancel: CancelToken, tx: Sender<E>)
where
    E: ?Sized + Send + Sync + 'static,
    C: ConfigSource<E>,
    S: ScanSource<E>,
{
    let pending: Vec<_> = config
        .entities_config()
        .into_iter()
        .map(|record| config.create_from_config(record))
        .collect();

    let mut known = Vec::with_capacity(pending.len());
    let mut configured = in_completion_order(pending);
    while let Some(item) = configured.next().await {
        if let Ok(entity) = &item {
            known.push(Arc::clone(entity));
        }
        if tx.send(item).await.is_err() {
            trace!("discovery consumer dropped during config phase");
            return;
        }
    }

    if cancel.cancellation_requested() {
        return;
    }

    let mut scanned = scan.entities_from_scan(known, cancel);
    while let Some(item) = scanned.next().await {
        if tx.send(item).await.is_err() {
            trace!("discovery consumer dropped during scan phase");
            return;
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .map_or_else(|| "producer panicked".to_owned(), |msg| format!("producer panicked: {msg}"))
}

/// [`EntityFactory`] built from a [`ConfigSource`] and a [`ScanSource`].
pub struct ConfigurableFactory<C, S = NoScan> {
    kind: String,
    config: Arc<C>,
    scan: Arc<S>,
    capacity: usize,
    slot: HubSlot,
}

impl<C> ConfigurableFactory<C, NoScan> {
    /// Factory that only yields config-derived entities.
    pub fn config_only(kind: impl Into<String>, config: C) -> Self {
        Self::new(kind, config, NoScan)
    }
}

impl<C, S> ConfigurableFactory<C, S> {
    pub fn new(kind: impl Into<String>, config: C, scan: S) -> Self {
        Self {
            kind: kind.into(),
            config: Arc::new(config),
            scan: Arc::new(scan),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            slot: HubSlot::new(),
        }
    }

    /// Bound of the channel between the producer task and the consumer.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn config_source(&self) -> &C {
        &self.config
    }

    pub fn scan_source(&self) -> &S {
        &self.scan
    }
}

impl<C, S> Entity for ConfigurableFactory<C, S>
where
    C: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    fn hub_slot(&self) -> Option<&HubSlot> {
        Some(&self.slot)
    }
}

impl<E, C, S> EntityFactory<E> for ConfigurableFactory<C, S>
where
    E: ?Sized + Send + Sync + 'static,
    C: ConfigSource<E>,
    S: ScanSource<E>,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn entities(&self, cancel: CancelToken) -> DiscoveryStream<E> {
        configured_then_scanned(
            self.kind.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.scan),
            cancel,
            self.capacity,
        )
    }
}

impl<C, S> fmt::Debug for ConfigurableFactory<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableFactory")
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
