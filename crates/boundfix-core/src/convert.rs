// ── API-to-domain type conversions ──
//
// Bridges raw `boundfix_api::types` responses into canonical
// `boundfix_core::model` types. Wire quirks (empty error strings, admin
// level lists, flattened TopoJSON members) are normalized here so the rest
// of the crate never sees them.

use std::sync::Arc;

use boundfix_api::types::{
    ConfigResponse, CoordinatePoint, CoordinateResponse, ExportStatusResponse, LayerResponse,
    RuleResponse, StatusResponse, SuggestionResponse, TopologyResponse,
};

use crate::model::{
    BoundingBox, Config, Coordinate, ExportStatus, Layer, MatchRule, MissingCoordinate, Status,
    Suggestion, Topology,
};

// ── Status ─────────────────────────────────────────────────────────

impl From<StatusResponse> for Status {
    fn from(raw: StatusResponse) -> Self {
        Self {
            running: raw.running,
            initialized: raw.initialized,
            missing: raw.missing,
            export: raw.export.into(),
            config: Arc::new(raw.config.into()),
        }
    }
}

impl From<ExportStatusResponse> for ExportStatus {
    fn from(raw: ExportStatusResponse) -> Self {
        Self {
            running: raw.running,
            error: Some(raw.error).filter(|e| !e.is_empty()),
        }
    }
}

impl From<ConfigResponse> for Config {
    fn from(raw: ConfigResponse) -> Self {
        Self {
            layers: raw.layers.into_iter().map(Layer::from).collect(),
            rules: raw.rules.into_iter().map(MatchRule::from).collect(),
        }
    }
}

impl From<LayerResponse> for Layer {
    fn from(raw: LayerResponse) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            admin_levels: raw.admin_levels,
        }
    }
}

impl From<RuleResponse> for MatchRule {
    fn from(raw: RuleResponse) -> Self {
        Self {
            matches: raw.matches,
            restrict: raw
                .restrict
                .into_iter()
                .map(|(layer, levels)| (layer, levels.into_iter().collect()))
                .collect(),
        }
    }
}

// ── Coordinate ─────────────────────────────────────────────────────

impl From<CoordinateResponse> for MissingCoordinate {
    fn from(raw: CoordinateResponse) -> Self {
        Self {
            coordinate: raw.coordinate.into(),
            suggestions: raw
                .suggestions
                .into_iter()
                .map(|(layer, list)| (layer, list.into_iter().map(Suggestion::from).collect()))
                .collect(),
            matched: raw.matched,
            match_names: raw.match_names,
            match_ids: raw.match_ids,
        }
    }
}

impl From<CoordinatePoint> for Coordinate {
    fn from(raw: CoordinatePoint) -> Self {
        Self {
            id: raw.id,
            lat: raw.lat,
            lon: raw.lon,
        }
    }
}

impl From<&Coordinate> for CoordinatePoint {
    fn from(c: &Coordinate) -> Self {
        Self {
            id: c.id.clone(),
            lat: c.lat,
            lon: c.lon,
        }
    }
}

impl From<SuggestionResponse> for Suggestion {
    fn from(raw: SuggestionResponse) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            admin_level: raw.admin_level,
            disabled: false,
        }
    }
}

// ── Topology ───────────────────────────────────────────────────────

impl From<TopologyResponse> for Topology {
    fn from(raw: TopologyResponse) -> Self {
        Self {
            bbox: raw.bbox.map(BoundingBox::from_array),
            objects: raw.objects,
            extra: raw.extra,
        }
    }
}
