// ── Store ──
//
// Composes the status poller, coordinate loader, topology cache, rule
// engine and selection submitter into one observable state object. The
// store is the only integration point for the presentation layer.

mod admin;
mod loader;
mod poller;
mod selection;
mod topology;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use boundfix_api::{ApiClient, TransportConfig};

use crate::config::StoreConfig;
use crate::error::CoreError;
use crate::model::FeatureRef;
use crate::state::graph::{self, Effect};
use crate::state::{Fields, StoreState};
use crate::stream::StateStream;

use self::topology::TopologyCache;

const FAILURE_CHANNEL_SIZE: usize = 64;

// ── BackgroundFailure ──────────────────────────────────────────────

/// An error from work the store started on its own (automatic loads,
/// topology fetches), where no caller exists to receive it.
#[derive(Debug)]
pub struct BackgroundFailure {
    pub operation: &'static str,
    /// Feature whose topology fetch failed, if any.
    pub feature: Option<FeatureRef>,
    pub error: CoreError,
}

// ── Store ──────────────────────────────────────────────────────────

/// The reactive store.
///
/// Cheaply cloneable via `Arc<StoreInner>`. Does nothing until
/// [`start()`](Self::start) spawns the status poller.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    api: ApiClient,
    state: watch::Sender<StoreState>,
    topology: TopologyCache,
    failures: broadcast::Sender<Arc<BackgroundFailure>>,
    /// Sequence number handed to the next status poll.
    poll_seq: AtomicU64,
    cancel: CancellationToken,
    tasks: TaskTracker,
    started: AtomicBool,
}

impl Store {
    /// Build a store and its HTTP client. Does not touch the network.
    pub fn new(config: StoreConfig) -> Result<Self, CoreError> {
        let mut transport = TransportConfig::default();
        if let Some(timeout) = config.timeout {
            transport = transport.with_timeout(timeout);
        }
        if !config.cookies {
            transport = transport.without_cookies();
        }
        let api = ApiClient::new(config.base_url.clone(), &transport)?;
        Ok(Self::with_api(api, config))
    }

    /// Build a store around a pre-configured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: StoreConfig) -> Result<Self, CoreError> {
        let api = ApiClient::with_client(http, config.base_url.clone())?;
        Ok(Self::with_api(api, config))
    }

    fn with_api(api: ApiClient, config: StoreConfig) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_SIZE);
        Self {
            inner: Arc::new(StoreInner {
                config,
                api,
                state,
                topology: TopologyCache::new(),
                failures,
                poll_seq: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                tasks: TaskTracker::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the status poller. The first poll is issued immediately.
    ///
    /// Must be called within a Tokio runtime. Calling this more than once
    /// is a no-op.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!("store already started");
            return;
        }
        let store = self.clone();
        let cancel = self.inner.cancel.clone();
        let interval = self.inner.config.poll_interval;
        self.inner
            .tasks
            .spawn(poller::status_poll_task(store, interval, cancel));
        info!(url = %self.inner.config.base_url, ?interval, "store started");
    }

    /// Cancel the poller and every background fetch, then wait for them.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        debug!("store shut down");
    }

    // ── Observation ──────────────────────────────────────────────

    /// Current snapshot.
    pub fn state(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.state.subscribe())
    }

    /// Errors from background work (automatic coordinate loads, topology
    /// fetches).
    pub fn failures(&self) -> broadcast::Receiver<Arc<BackgroundFailure>> {
        self.inner.failures.subscribe()
    }

    /// Time since the last applied status poll.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.inner
            .state
            .borrow()
            .last_status_at
            .map(|at| Utc::now() - at)
    }

    // ── Internals ────────────────────────────────────────────────

    /// Apply one atomic mutation.
    ///
    /// `mutate` returns the fields it touched; dependent derivations run
    /// before the snapshot is published. Effects are dispatched after the
    /// channel lock is released. Returns every changed field.
    pub(crate) fn commit<F>(&self, mutate: F) -> Fields
    where
        F: FnOnce(&mut StoreState, &mut Vec<Effect>) -> Fields,
    {
        let mut effects = Vec::new();
        let mut changed = Fields::NONE;
        self.inner.state.send_if_modified(|state| {
            let touched = mutate(state, &mut effects);
            if touched.is_empty() {
                return false;
            }
            changed = graph::propagate(state, touched, &mut effects);
            state.revision += 1;
            state.changed = changed;
            debug!(revision = state.revision, %changed, "state committed");
            true
        });
        for effect in effects {
            self.dispatch(effect);
        }
        changed
    }

    fn dispatch(&self, effect: Effect) {
        let store = self.clone();
        let cancel = self.inner.cancel.clone();
        match effect {
            Effect::LoadCoordinate { epoch } => {
                let busy = BusyGuard::adopt(self);
                self.inner.tasks.spawn(async move {
                    let _busy = busy;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {}
                        result = store.fetch_coordinate(epoch) => {
                            if let Err(error) = result {
                                store.report("load coordinate", None, error);
                            }
                        }
                    }
                });
            }
            Effect::EnsureTopology { feature, epoch } => {
                self.inner.tasks.spawn(async move {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {}
                        result = store.ensure_topology_at(&feature, epoch) => {
                            if let Err(error) = result {
                                store.report("load topology", Some(feature.clone()), error);
                            }
                        }
                    }
                });
            }
        }
    }

    pub(crate) fn report(
        &self,
        operation: &'static str,
        feature: Option<FeatureRef>,
        error: CoreError,
    ) {
        warn!(operation, feature = ?feature, error = %error, "background operation failed");
        let _ = self.inner.failures.send(Arc::new(BackgroundFailure {
            operation,
            feature,
            error,
        }));
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub(crate) fn topology_cache(&self) -> &TopologyCache {
        &self.inner.topology
    }
}

// ── BusyGuard ──────────────────────────────────────────────────────

/// Holds one busy slot; `loading` stays true while any guard is alive.
///
/// Dropping the guard releases the slot on success, error and
/// cancellation alike.
pub(crate) struct BusyGuard {
    store: Store,
}

impl BusyGuard {
    pub(crate) fn acquire(store: &Store) -> Self {
        store.commit(|state, _| state.enter_busy());
        Self::adopt(store)
    }

    /// Take ownership of a slot already counted by the committing closure.
    pub(crate) fn adopt(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.store.commit(|state, _| state.leave_busy());
    }
}
