//! Wire types for the boundary service `/api/` endpoints.
//!
//! Field names follow the service's JSON exactly. The service is written
//! in a language that encodes empty maps and lists as `null`, so collection
//! fields decode `null` into an empty collection.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// OSM relation id of a boundary feature.
pub type FeatureId = i64;

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Status ───────────────────────────────────────────────────────────

/// Server snapshot — from `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub initialized: bool,
    #[serde(default)]
    pub missing: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub export: ExportStatusResponse,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ConfigResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportStatusResponse {
    #[serde(default)]
    pub running: bool,
    /// Empty when the last export succeeded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}

/// Service configuration. Fields the client does not use (sources, water,
/// blacklist, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<LayerResponse>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<RuleResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResponse {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_levels: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleResponse {
    /// Layer id -> feature id that must be selected or matched.
    #[serde(rename = "match", default, deserialize_with = "null_as_default")]
    pub matches: BTreeMap<String, FeatureId>,
    /// Layer id -> admin levels that stay selectable when the rule matches.
    #[serde(default, deserialize_with = "null_as_default")]
    pub restrict: BTreeMap<String, Vec<i32>>,
}

// ── Coordinate ───────────────────────────────────────────────────────

/// Current work item — from `GET /api/coordinate` (`null` when none remain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateResponse {
    pub coordinate: CoordinatePoint,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: BTreeMap<String, Vec<SuggestionResponse>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched: BTreeMap<String, bool>,
    #[serde(rename = "matchnames", default, deserialize_with = "null_as_default")]
    pub match_names: BTreeMap<String, String>,
    #[serde(rename = "matchids", default, deserialize_with = "null_as_default")]
    pub match_ids: BTreeMap<String, FeatureId>,
}

/// A missing coordinate. Also the body of `POST /api/delete` and the
/// element type of `POST /api/missing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub id: FeatureId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub admin_level: i32,
}

// ── Topology ─────────────────────────────────────────────────────────

/// TopoJSON document for one feature — from `GET /api/topo/{layer}/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyResponse {
    /// `[minLon, minLat, maxLon, maxLat]`.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub objects: BTreeMap<String, Value>,
    /// Remaining TopoJSON members (`type`, `arcs`, `transform`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn status_tolerates_null_collections() {
        let raw = json!({
            "running": false,
            "initialized": true,
            "missing": 3,
            "export": null,
            "config": { "layers": null, "sources": { "planet": {} } }
        });
        let status: StatusResponse = serde_json::from_value(raw).unwrap();
        assert!(status.initialized);
        assert_eq!(status.missing, 3);
        assert_eq!(status.export, ExportStatusResponse::default());
        assert!(status.config.layers.is_empty());
        assert!(status.config.rules.is_empty());
    }

    #[test]
    fn rule_reads_match_keyword() {
        let raw = json!({ "match": { "country": 1 }, "restrict": { "region": [4, 6] } });
        let rule: RuleResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(rule.matches.get("country"), Some(&1));
        assert_eq!(rule.restrict.get("region"), Some(&vec![4, 6]));
    }

    #[test]
    fn coordinate_point_omits_missing_id() {
        let point = CoordinatePoint {
            id: None,
            lat: 50.5,
            lon: 4.25,
        };
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({ "lat": 50.5, "lon": 4.25 })
        );
    }

    #[test]
    fn topology_keeps_unmodelled_members() {
        let raw = json!({
            "type": "Topology",
            "bbox": [2.5, 49.5, 6.4, 51.5],
            "objects": { "52411": { "type": "MultiPolygon", "arcs": [[[0]]] } },
            "arcs": [[[0, 0], [1, 1]]],
            "transform": { "scale": [1, 1], "translate": [0, 0] }
        });
        let topo: TopologyResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(topo.bbox, Some([2.5, 49.5, 6.4, 51.5]));
        assert!(topo.objects.contains_key("52411"));
        assert!(topo.extra.contains_key("arcs"));
        assert!(topo.extra.contains_key("transform"));
        assert_eq!(topo.extra.get("type"), Some(&json!("Topology")));
    }
}
