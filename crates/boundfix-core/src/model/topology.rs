use std::collections::BTreeMap;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// From the TopoJSON `[minLon, minLat, maxLon, maxLat]` order.
    pub fn from_array([min_lon, min_lat, max_lon, max_lat]: [f64; 4]) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Cached geometry for one `(layer, feature)` pair.
///
/// Geometry objects are kept as opaque TopoJSON; drawing them is the
/// renderer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub bbox: Option<BoundingBox>,
    pub objects: BTreeMap<String, Value>,
    /// Remaining TopoJSON members (`arcs`, `transform`, ...).
    pub extra: BTreeMap<String, Value>,
}

impl Topology {
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}
