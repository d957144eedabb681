// ── Domain model ──
//
// Canonical types consumed by the store and the presentation layer.
// Wire types from `boundfix-api` are converted into these in `convert`.

pub mod coordinate;
pub mod status;
pub mod topology;

pub use coordinate::{
    Coordinate, FeatureId, FeatureRef, MissingCoordinate, SelectionMap, Suggestion, UNSET,
};
pub use status::{Config, ExportStatus, Layer, MatchRule, Status};
pub use topology::{BoundingBox, Topology};
