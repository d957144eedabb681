// ── Topology cache ──
//
// Lazily filled geometry per `(layer, feature)` pair, scoped to the epoch
// of the current work item. Loading a new work item resets the cache; fetch
// results tagged with an older epoch are dropped instead of inserted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::{FeatureRef, Topology};
use crate::state::Epoch;

#[derive(Debug, Clone)]
enum Slot {
    /// A fetch is in flight.
    Pending(Epoch),
    Ready(Epoch, Arc<Topology>),
}

impl Slot {
    fn epoch(&self) -> Epoch {
        match self {
            Self::Pending(epoch) | Self::Ready(epoch, _) => *epoch,
        }
    }
}

pub(crate) struct TopologyCache {
    slots: DashMap<FeatureRef, Slot>,
    epoch: AtomicU64,
    version: watch::Sender<u64>,
}

impl TopologyCache {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            slots: DashMap::new(),
            epoch: AtomicU64::new(Epoch::ZERO.value()),
            version,
        }
    }

    pub(crate) fn epoch(&self) -> Epoch {
        Epoch(self.epoch.load(Ordering::Acquire))
    }

    /// Claim `key` for fetching under `epoch`.
    ///
    /// Returns `false` if the key is already cached or in flight for the
    /// current epoch, or if `epoch` is no longer current.
    pub(crate) fn reserve(&self, key: FeatureRef, epoch: Epoch) -> bool {
        if epoch != self.epoch() {
            return false;
        }
        match self.slots.entry(key) {
            Entry::Occupied(mut slot) => {
                if slot.get().epoch() == epoch {
                    false
                } else {
                    slot.insert(Slot::Pending(epoch));
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Pending(epoch));
                true
            }
        }
    }

    /// Store a fetched topology. Returns `false` if `epoch` was superseded.
    pub(crate) fn fill(&self, key: FeatureRef, epoch: Epoch, topology: Topology) -> bool {
        if epoch != self.epoch() {
            self.release(&key, epoch);
            return false;
        }
        self.slots
            .insert(key, Slot::Ready(epoch, Arc::new(topology)));
        self.bump();
        true
    }

    /// Drop an in-flight marker so a later call can retry.
    pub(crate) fn release(&self, key: &FeatureRef, epoch: Epoch) {
        self.slots
            .remove_if(key, |_, slot| matches!(slot, Slot::Pending(e) if *e == epoch));
    }

    /// Start a new epoch, discarding every entry of older ones.
    pub(crate) fn reset(&self, epoch: Epoch) {
        self.epoch.store(epoch.value(), Ordering::Release);
        self.slots.clear();
        self.bump();
    }

    pub(crate) fn get(&self, key: &FeatureRef) -> Option<Arc<Topology>> {
        let current = self.epoch();
        self.slots.get(key).and_then(|slot| match slot.value() {
            Slot::Ready(epoch, topology) if *epoch == current => Some(Arc::clone(topology)),
            _ => None,
        })
    }

    /// Number of cached (not in-flight) topologies.
    pub(crate) fn len(&self) -> usize {
        let current = self.epoch();
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(epoch, _) if *epoch == current))
            .count()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
