//! Cache-first synchronization engine
//!
//! The [`SyncEngine`] binds a [`BoundResource`] (a live store query plus a
//! remote refresh) to a stream of [`Resource`] snapshots.
//!
//! ## Cycle
//!
//! ```text
//! Init ──▶ emit Loading(None)
//!   │
//!   ▼ first store value c
//! should_fetch(c)? ── no ──▶ CacheTerminal: SuccessFromCache(c), then every store value
//!   │ yes
//!   ▼
//! Fetching: emit Loading(c), drop the store query, wait fetch_delay, call_remote
//!   ├─ Success(body) ─▶ save_result(body), new store query ─▶ SuccessFromNetwork(..)
//!   ├─ Empty ─────────▶ new store query ─▶ SuccessFromCache(..)
//!   └─ Error(f) ──────▶ on_fetch_failed(), new store query ─▶ Error(f, ..)
//! ```
//!
//! Each cycle issues at most one remote call. Consecutive snapshots that are
//! equal are emitted once.
//!
//! ## Cancellation
//!
//! A cycle runs on its own task and stops when its [`Observation`] is
//! dropped (or when [`LiveResource::retry`] replaces it). Cancellation aborts
//! the delay and the in-flight remote call; a result that lands after
//! cancellation is never saved. A save that already started runs to commit
//! so the store is never left mid-transaction, but nothing is emitted after.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn, Instrument};

use coinfolio_core::config::SyncConfig;
use coinfolio_core::domain::{Resource, SyncFailure};
use coinfolio_core::ports::{ApiResponse, LiveQuery};

// ============================================================================
// BoundResource
// ============================================================================

/// A piece of cached data together with the way to refresh it
///
/// Implementations carry whatever session state their predicates need; the
/// engine holds no global state.
#[async_trait::async_trait]
pub trait BoundResource: Send + Sync + 'static {
    /// Value read from the local store
    type Cached: Clone + PartialEq + Send + Sync + 'static;
    /// Body returned by the remote source
    type Body: Send + 'static;

    /// Name used in log spans
    fn name(&self) -> &'static str;

    /// Opens a live query over the local store
    fn load_from_store(&self) -> LiveQuery<Self::Cached>;

    /// Decides from the first cached value whether to refresh
    ///
    /// Empty collections are passed as-is and should answer true when the
    /// data must be populated.
    fn should_fetch(&self, cached: &Self::Cached) -> bool;

    /// Pause before the remote call, for perceived responsiveness only
    fn fetch_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Performs the remote call
    async fn call_remote(&self) -> ApiResponse<Self::Body>;

    /// Persists a successful body in one store transaction
    async fn save_result(&self, body: Self::Body) -> anyhow::Result<()>;

    /// Called once when the fetch or its save failed
    fn on_fetch_failed(&self) {}
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Capacity used when no configuration is given
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Spawns synchronization cycles
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    channel_capacity: usize,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SyncEngine {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    /// Runs one cycle of `resource` and returns its snapshots
    pub fn observe<R: BoundResource>(&self, resource: Arc<R>) -> Observation<R::Cached> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cycle = spawn_cycle(resource, tx);
        Observation { rx, _cycle: cycle }
    }

    /// Binds `resource` to a consumer that can start new cycles
    ///
    /// The first cycle starts immediately.
    pub fn bind<R: BoundResource>(&self, resource: Arc<R>) -> LiveResource<R> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cycle = spawn_cycle(resource.clone(), tx.clone());
        LiveResource {
            resource,
            tx,
            rx,
            cycle: Some(cycle),
        }
    }
}

fn spawn_cycle<R: BoundResource>(
    resource: Arc<R>,
    tx: mpsc::Sender<Resource<R::Cached>>,
) -> DropGuard {
    let cancel = CancellationToken::new();
    let span = tracing::debug_span!("sync_cycle", resource = resource.name());
    let emitter = Emitter {
        tx,
        cancel: cancel.clone(),
        last: None,
    };
    tokio::spawn(run_cycle(resource, emitter, cancel.clone()).instrument(span));
    cancel.drop_guard()
}

// ============================================================================
// Observation / LiveResource
// ============================================================================

/// Snapshots of one synchronization cycle
///
/// Dropping the observation cancels the cycle.
pub struct Observation<T> {
    rx: mpsc::Receiver<Resource<T>>,
    _cycle: DropGuard,
}

impl<T> Observation<T> {
    /// Waits for the next snapshot; `None` once the cycle ended
    pub async fn next(&mut self) -> Option<Resource<T>> {
        self.rx.recv().await
    }
}

impl<T> Stream for Observation<T> {
    type Item = Resource<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Consumer handle of a bound resource: `next` to read, `retry` to refresh
pub struct LiveResource<R: BoundResource> {
    resource: Arc<R>,
    tx: mpsc::Sender<Resource<R::Cached>>,
    rx: mpsc::Receiver<Resource<R::Cached>>,
    cycle: Option<DropGuard>,
}

impl<R: BoundResource> LiveResource<R> {
    /// Waits for the next snapshot of the current cycle
    pub async fn next(&mut self) -> Option<Resource<R::Cached>> {
        self.rx.recv().await
    }

    /// Cancels the current cycle and starts a new one on the same output
    pub fn retry(&mut self) {
        info!(resource = self.resource.name(), "Retry requested");
        self.cycle.take();
        self.cycle = Some(spawn_cycle(self.resource.clone(), self.tx.clone()));
    }

    pub fn resource(&self) -> &Arc<R> {
        &self.resource
    }
}

impl<R: BoundResource> Stream for LiveResource<R> {
    type Item = Resource<R::Cached>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Cycle state machine
// ============================================================================

/// Sends snapshots, dropping ones equal to the previous emission
struct Emitter<T> {
    tx: mpsc::Sender<Resource<T>>,
    cancel: CancellationToken,
    last: Option<Resource<T>>,
}

impl<T: Clone + PartialEq> Emitter<T> {
    /// Returns false once the cycle is cancelled or the consumer is gone
    async fn emit(&mut self, resource: Resource<T>) -> bool {
        if self.last.as_ref() == Some(&resource) {
            return true;
        }
        self.last = Some(resource.clone());
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(resource) => sent.is_ok(),
        }
    }
}

/// How store values are labelled after the fetch decision
enum Phase {
    FromCache,
    FromNetwork,
    Failed(String),
}

impl Phase {
    fn wrap<T>(&self, data: T) -> Resource<T> {
        match self {
            Phase::FromCache => Resource::from_cache(data),
            Phase::FromNetwork => Resource::from_network(data),
            Phase::Failed(message) => Resource::error(message.clone(), Some(data)),
        }
    }
}

async fn run_cycle<R: BoundResource>(
    resource: Arc<R>,
    mut out: Emitter<R::Cached>,
    cancel: CancellationToken,
) {
    debug!("Init");
    if !out.emit(Resource::loading(None)).await {
        return;
    }

    let mut cache = resource.load_from_store();
    let first = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        item = cache.next() => item,
    };
    let first = match first {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            error!(error = %e, "Initial store read failed");
            let failure = SyncFailure::PersistenceFailure(e.to_string());
            out.emit(Resource::error(failure.to_string(), None)).await;
            return;
        }
        None => {
            warn!("Store query ended before its first value");
            return;
        }
    };

    if !resource.should_fetch(&first) {
        debug!("CacheTerminal");
        if out.emit(Resource::from_cache(first.clone())).await {
            forward(cache, &mut out, &cancel, Phase::FromCache, Some(first)).await;
        }
        return;
    }

    debug!("Fetching");
    if !out.emit(Resource::loading(Some(first.clone()))).await {
        return;
    }
    drop(cache);

    let delay = resource.fetch_delay();
    if !delay.is_zero() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled during fetch delay");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let remote = {
        let resource = resource.clone();
        tokio::spawn(async move { resource.call_remote().await }.in_current_span())
    };
    let abort = remote.abort_handle();
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            abort.abort();
            debug!("Cancelled during remote call");
            return;
        }
        joined = remote => joined.unwrap_or_else(|e| {
            ApiResponse::Error(SyncFailure::NetworkFailure(format!("Remote call aborted: {e}")))
        }),
    };

    if cancel.is_cancelled() {
        debug!("Cancelled before save, dropping result");
        return;
    }

    let phase = match response {
        ApiResponse::Success(body) => {
            let saver = resource.clone();
            let saved = tokio::spawn(async move { saver.save_result(body).await }.in_current_span())
                .await
                .unwrap_or_else(|e| Err(anyhow::anyhow!("Save task failed: {e}")));
            match saved {
                Ok(()) => {
                    info!("Fetch saved");
                    Phase::FromNetwork
                }
                Err(e) => {
                    error!(error = %e, "Saving fetched data failed");
                    resource.on_fetch_failed();
                    Phase::Failed(SyncFailure::PersistenceFailure(e.to_string()).to_string())
                }
            }
        }
        ApiResponse::Empty => {
            info!("Remote returned no content");
            Phase::FromCache
        }
        ApiResponse::Error(failure) => {
            warn!(error = %failure, "Fetch failed");
            resource.on_fetch_failed();
            Phase::Failed(failure.to_string())
        }
    };

    if cancel.is_cancelled() {
        return;
    }

    // A fresh query observes the rows as committed by the save
    let cache = resource.load_from_store();
    forward(cache, &mut out, &cancel, phase, Some(first)).await;
}

/// Emits every store value under `phase` until cancelled or the query ends
async fn forward<T: Clone + PartialEq>(
    mut cache: LiveQuery<T>,
    out: &mut Emitter<T>,
    cancel: &CancellationToken,
    phase: Phase,
    mut last_known: Option<T>,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            item = cache.next() => item,
        };
        let resource = match item {
            Some(Ok(value)) => {
                last_known = Some(value.clone());
                phase.wrap(value)
            }
            Some(Err(e)) => {
                error!(error = %e, "Store query failed");
                let failure = SyncFailure::PersistenceFailure(e.to_string());
                Resource::error(failure.to_string(), last_known.clone())
            }
            None => {
                debug!("Store query ended");
                return;
            }
        };
        if !out.emit(resource).await {
            return;
        }
    }
}
