use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::Serialize;

pub use boundfix_api::types::FeatureId;

/// Effective value of a layer with neither a match nor a selection.
pub const UNSET: FeatureId = 0;

// ── FeatureRef ──────────────────────────────────────────────────────

/// A `(layer, feature)` pair. Renders as `layer/id`.
///
/// Used as the topology cache key: keying on the typed pair rather than the
/// rendered string means two distinct pairs can never alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureRef {
    pub layer: String,
    pub id: FeatureId,
}

impl FeatureRef {
    pub fn new(layer: impl Into<String>, id: FeatureId) -> Self {
        Self {
            layer: layer.into(),
            id,
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.id)
    }
}

// ── Work item ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// A candidate boundary feature for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: FeatureId,
    pub name: String,
    pub admin_level: i32,
    /// Derived by the rule engine; the only field mutated after creation.
    pub disabled: bool,
}

/// The current work item.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingCoordinate {
    pub coordinate: Coordinate,
    pub suggestions: BTreeMap<String, Vec<Suggestion>>,
    pub matched: BTreeMap<String, bool>,
    pub match_names: BTreeMap<String, String>,
    pub match_ids: BTreeMap<String, FeatureId>,
}

impl MissingCoordinate {
    pub fn suggestions_for(&self, layer: &str) -> &[Suggestion] {
        self.suggestions.get(layer).map_or(&[], Vec::as_slice)
    }

    pub fn suggestion(&self, feature: &FeatureRef) -> Option<&Suggestion> {
        self.suggestions_for(&feature.layer)
            .iter()
            .find(|s| s.id == feature.id)
    }

    /// The service already resolved this layer for the coordinate.
    pub fn is_matched(&self, layer: &str) -> bool {
        self.matched.get(layer).copied().unwrap_or(false)
    }

    pub fn matched_id(&self, layer: &str) -> Option<FeatureId> {
        if self.is_matched(layer) {
            self.match_ids.get(layer).copied()
        } else {
            None
        }
    }

    /// Every suggested feature across all layers.
    pub fn features(&self) -> impl Iterator<Item = FeatureRef> + '_ {
        self.suggestions
            .iter()
            .flat_map(|(layer, list)| list.iter().map(|s| FeatureRef::new(layer.clone(), s.id)))
    }
}

// ── SelectionMap ────────────────────────────────────────────────────

/// The operator's in-progress picks: layer id -> chosen feature id.
///
/// Serializes as the `{layer: featureId}` object the service expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionMap(BTreeMap<String, FeatureId>);

impl SelectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pick for `layer`, returning the previous one.
    pub fn insert(&mut self, layer: impl Into<String>, id: FeatureId) -> Option<FeatureId> {
        self.0.insert(layer.into(), id)
    }

    pub fn remove(&mut self, layer: &str) -> Option<FeatureId> {
        self.0.remove(layer)
    }

    pub fn get(&self, layer: &str) -> Option<FeatureId> {
        self.0.get(layer).copied()
    }

    /// Number of layers with a pick.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Keep only picks whose layer satisfies `keep`. Returns `true` if any
    /// pick was dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> bool {
        let before = self.0.len();
        self.0.retain(|layer, _| keep(layer.as_str()));
        self.0.len() != before
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FeatureId> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, FeatureId> {
        &self.0
    }
}

impl<'a> IntoIterator for &'a SelectionMap {
    type Item = (&'a String, &'a FeatureId);
    type IntoIter = btree_map::Iter<'a, String, FeatureId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FeatureId)> for SelectionMap {
    fn from_iter<I: IntoIterator<Item = (K, FeatureId)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_ref_renders_composite_key() {
        assert_eq!(FeatureRef::new("region", 53134).to_string(), "region/53134");
    }

    #[test]
    fn feature_refs_never_alias() {
        // Both render as "a/1/2" would with naive string keys.
        let slash_layer = FeatureRef::new("a/1", 2);
        let plain = FeatureRef::new("a", 12);
        assert_ne!(slash_layer, plain);
    }

    #[test]
    fn selection_count_tracks_distinct_layers() {
        let mut selected = SelectionMap::new();
        assert_eq!(selected.len(), 0);

        selected.insert("country", 1);
        selected.insert("region", 4);
        assert_eq!(selected.len(), 2);

        // Overwriting a layer does not add a key.
        assert_eq!(selected.insert("country", 2), Some(1));
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.get("country"), Some(2));

        selected.remove("region");
        assert_eq!(selected.len(), 1);

        selected.clear();
        assert!(selected.is_empty());
    }

    #[test]
    fn selection_serializes_as_plain_object() {
        let selected: SelectionMap = [("country", 5)].into_iter().collect();
        assert_eq!(
            serde_json::to_value(&selected).unwrap_or_default(),
            serde_json::json!({ "country": 5 })
        );
    }
}
