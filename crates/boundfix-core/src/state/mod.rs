// ── Observable store state ──
//
// One immutable snapshot published through a `watch` channel. The store
// mutates it only inside a commit, so subscribers always see a consistent
// status, work item, selection and busy flag together.

mod fields;
pub(crate) mod graph;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::{FeatureRef, MissingCoordinate, SelectionMap, Status};

pub use fields::Fields;

// ── Epoch ──────────────────────────────────────────────────────────

/// Monotonic generation counter for coordinate loads.
///
/// Responses tagged with a superseded epoch are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

impl Epoch {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

// ── StoreState ─────────────────────────────────────────────────────

/// Snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// Last applied status poll. Defaults to an uninitialized status.
    pub status: Arc<Status>,
    /// Current work item, `None` while none is loaded.
    pub coordinate: Option<Arc<MissingCoordinate>>,
    pub selected: SelectionMap,
    /// A coordinate load, save or delete is in flight.
    pub loading: bool,
    /// Suggestion the operator is pointing at.
    pub hovered: Option<FeatureRef>,
    pub last_status_at: Option<DateTime<Utc>>,
    /// Bumped on every published change.
    pub revision: u64,
    /// Fields touched by the commit that produced this snapshot.
    pub changed: Fields,

    pub(crate) busy: usize,
    pub(crate) status_seq: u64,
    pub(crate) load_epoch: Epoch,
    pub(crate) coordinate_epoch: Epoch,
}

impl StoreState {
    /// Number of layers with a selection.
    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// Epoch of the load that produced the current work item.
    pub fn coordinate_epoch(&self) -> Epoch {
        self.coordinate_epoch
    }

    /// Work is pending and nothing is loaded or loading.
    pub fn should_load(&self) -> bool {
        self.status.initialized
            && self.status.missing > 0
            && self.coordinate.is_none()
            && !self.loading
    }

    /// Start a coordinate load: takes the next epoch and a busy slot.
    pub(crate) fn begin_load(&mut self) -> (Epoch, Fields) {
        self.load_epoch = self.load_epoch.next();
        (self.load_epoch, self.enter_busy())
    }

    pub(crate) fn enter_busy(&mut self) -> Fields {
        self.busy += 1;
        self.sync_loading()
    }

    pub(crate) fn leave_busy(&mut self) -> Fields {
        self.busy = self.busy.saturating_sub(1);
        self.sync_loading()
    }

    fn sync_loading(&mut self) -> Fields {
        let loading = self.busy > 0;
        if self.loading == loading {
            Fields::NONE
        } else {
            self.loading = loading;
            Fields::LOADING
        }
    }
}
