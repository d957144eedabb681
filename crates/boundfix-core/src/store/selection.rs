// ── Selection submitter ──
//
// Operator gestures: per-layer picks, hover, save and delete. Write
// operations hold a busy slot until the follow-up reload finishes.

use boundfix_api::types::CoordinatePoint;
use tracing::{debug, info};

use super::{BusyGuard, Store};
use crate::error::CoreError;
use crate::model::{FeatureId, FeatureRef};
use crate::state::Fields;
use crate::state::graph::Effect;

impl Store {
    /// Pick `id` for `layer`, replacing any earlier pick.
    ///
    /// Fails with [`CoreError::UnknownLayer`] if the config has no such
    /// layer.
    pub fn select(&self, layer: &str, id: FeatureId) -> Result<(), CoreError> {
        let mut result = Ok(());
        self.commit(|state, _| {
            if !state.status.config.has_layer(layer) {
                result = Err(CoreError::UnknownLayer {
                    layer: layer.to_owned(),
                });
                return Fields::NONE;
            }
            if state.selected.insert(layer, id) == Some(id) {
                return Fields::NONE;
            }
            Fields::SELECTION
        });
        result
    }

    /// Drop the pick for `layer`. Returns `true` if there was one.
    pub fn deselect(&self, layer: &str) -> bool {
        let mut removed = false;
        self.commit(|state, _| {
            removed = state.selected.remove(layer).is_some();
            if removed { Fields::SELECTION } else { Fields::NONE }
        });
        removed
    }

    /// Number of layers with a pick.
    pub fn selection_count(&self) -> usize {
        self.inner.state.borrow().selection_count()
    }

    /// Mark `feature` as hovered, or clear the hover with `None`.
    ///
    /// Hovering a feature of the current work item also caches its
    /// topology.
    pub fn hover_feature(&self, feature: Option<FeatureRef>) {
        self.commit(|state, effects| {
            if state.hovered == feature {
                return Fields::NONE;
            }
            if let Some(feature) = feature.as_ref().filter(|_| state.coordinate.is_some()) {
                effects.push(Effect::EnsureTopology {
                    feature: feature.clone(),
                    epoch: state.coordinate_epoch,
                });
            }
            state.hovered = feature;
            Fields::HOVER
        });
    }

    /// Submit the picks, then load the next work item.
    ///
    /// With nothing picked this does nothing. On failure the picks are
    /// kept so the operator can retry.
    pub async fn save(&self) -> Result<(), CoreError> {
        let selected = self.inner.state.borrow().selected.clone();
        if selected.is_empty() {
            debug!("nothing selected, skipping save");
            return Ok(());
        }

        let _busy = BusyGuard::acquire(self);
        self.api().add(selected.as_map()).await?;
        info!(layers = selected.len(), "selection saved");

        self.clear_selection();
        self.load_coordinate().await
    }

    /// Drop the current work item from the queue, then load the next one.
    ///
    /// Does nothing if no work item is loaded. The picks are cleared too,
    /// since they belonged to the deleted item.
    pub async fn delete_current(&self) -> Result<(), CoreError> {
        let current = self.inner.state.borrow().coordinate.clone();
        let Some(item) = current else {
            debug!("no coordinate loaded, nothing to delete");
            return Ok(());
        };

        let _busy = BusyGuard::acquire(self);
        self.api()
            .delete(&CoordinatePoint::from(&item.coordinate))
            .await?;
        info!(lat = item.coordinate.lat, lon = item.coordinate.lon, "coordinate deleted");

        self.clear_selection();
        self.load_coordinate().await
    }

    fn clear_selection(&self) {
        self.commit(|state, _| {
            if state.selected.is_empty() {
                return Fields::NONE;
            }
            state.selected.clear();
            Fields::SELECTION
        });
    }
}
