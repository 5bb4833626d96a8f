//! Geometry primitives, query validation, and GeoJSON ingestion.

pub mod geojson;
pub mod geometry;
pub mod validation;

pub use geometry::{AreaGeometry, bounding_box, point_to_area_distance_km};
