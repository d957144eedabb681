use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::coordinate::FeatureId;

/// Latest server snapshot.
///
/// Replaced wholesale on every applied poll, never patched in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    /// The service is refreshing its geometry data.
    pub running: bool,
    /// The service finished its first data load.
    pub initialized: bool,
    /// Number of unresolved work items.
    pub missing: i64,
    pub export: ExportStatus,
    pub config: Arc<Config>,
}

impl Status {
    /// `true` when anything besides the config differs.
    pub(crate) fn progress_differs(&self, other: &Status) -> bool {
        self.running != other.running
            || self.initialized != other.initialized
            || self.missing != other.missing
            || self.export != other.export
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStatus {
    pub running: bool,
    /// Error of the last export, `None` if it succeeded.
    pub error: Option<String>,
}

/// Server configuration: ordered layers and ordered rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub layers: Vec<Layer>,
    /// Evaluated in list order.
    pub rules: Vec<MatchRule>,
}

impl Config {
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }
}

/// One administrative boundary type (country, region, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub admin_levels: Vec<i32>,
}

/// Declarative constraint on suggestions.
///
/// When every `matches` entry holds for the current work item, suggestions
/// of each `restrict` layer outside the allowed admin levels are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRule {
    pub matches: BTreeMap<String, FeatureId>,
    pub restrict: BTreeMap<String, BTreeSet<i32>>,
}
