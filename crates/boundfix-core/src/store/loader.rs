// ── Coordinate loader and topology access ──

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{BusyGuard, Store};
use crate::error::CoreError;
use crate::model::{FeatureId, FeatureRef, MissingCoordinate, Topology};
use crate::state::graph::Effect;
use crate::state::{Epoch, Fields};

impl Store {
    /// Fetch the next work item now.
    ///
    /// Any load already in flight is superseded: its response is dropped.
    /// `loading` is held for the duration of the fetch.
    pub async fn load_coordinate(&self) -> Result<(), CoreError> {
        let mut epoch = Epoch::ZERO;
        self.commit(|state, _| {
            let (next, touched) = state.begin_load();
            epoch = next;
            touched
        });
        let _busy = BusyGuard::adopt(self);
        self.fetch_coordinate(epoch).await
    }

    /// Fetch and apply the work item for load `epoch`.
    ///
    /// A new item resets the topology cache to `epoch` and schedules one
    /// topology fetch per suggestion.
    pub(crate) async fn fetch_coordinate(&self, epoch: Epoch) -> Result<(), CoreError> {
        let item = self.api().coordinate().await?.map(MissingCoordinate::from);
        let cache = self.topology_cache();

        self.commit(|state, effects| {
            if state.load_epoch != epoch {
                debug!(
                    epoch = epoch.value(),
                    latest = state.load_epoch.value(),
                    "dropping superseded coordinate"
                );
                return Fields::NONE;
            }
            if item.is_none() && state.coordinate.is_none() {
                debug!("no missing coordinate available");
                return Fields::NONE;
            }

            state.coordinate_epoch = epoch;
            cache.reset(epoch);
            if let Some(item) = &item {
                debug!(
                    lat = item.coordinate.lat,
                    lon = item.coordinate.lon,
                    suggestions = item.suggestions.values().map(Vec::len).sum::<usize>(),
                    "coordinate loaded"
                );
                effects.extend(
                    item.features()
                        .map(|feature| Effect::EnsureTopology { feature, epoch }),
                );
            }
            state.coordinate = item.map(Arc::new);

            let mut touched = Fields::COORDINATE;
            if state.hovered.take().is_some() {
                touched |= Fields::HOVER;
            }
            touched
        });
        Ok(())
    }

    // ── Topology ─────────────────────────────────────────────────

    /// Cache the topology of `layer/id` for the current work item.
    ///
    /// Does nothing if it is already cached or being fetched.
    pub async fn ensure_topology(&self, layer: &str, id: FeatureId) -> Result<(), CoreError> {
        let epoch = self.topology_cache().epoch();
        self.ensure_topology_at(&FeatureRef::new(layer, id), epoch)
            .await
    }

    pub(crate) async fn ensure_topology_at(
        &self,
        feature: &FeatureRef,
        epoch: Epoch,
    ) -> Result<(), CoreError> {
        let cache = self.topology_cache();
        if !cache.reserve(feature.clone(), epoch) {
            return Ok(());
        }

        match self.api().topology(&feature.layer, feature.id).await {
            Ok(raw) => {
                if !cache.fill(feature.clone(), epoch, Topology::from(raw)) {
                    debug!(%feature, "dropping topology for superseded coordinate");
                }
                Ok(())
            }
            Err(e) => {
                cache.release(feature, epoch);
                Err(e.into())
            }
        }
    }

    /// Cached topology of `feature` for the current work item.
    pub fn topology(&self, feature: &FeatureRef) -> Option<Arc<Topology>> {
        self.topology_cache().get(feature)
    }

    pub fn topology_count(&self) -> usize {
        self.topology_cache().len()
    }

    /// Version counter bumped whenever a topology is cached or the cache is
    /// reset.
    pub fn subscribe_topologies(&self) -> watch::Receiver<u64> {
        self.topology_cache().subscribe()
    }
}
