//! GeoJSON ingestion for area collections.
//!
//! Features are read one at a time so that a single broken geometry does not
//! reject the whole collection: it is logged and replaced by an empty shape,
//! keeping its position (and therefore its ID) in the sequence.

use crate::compute::geometry::AreaGeometry;
use crate::error::{NearpolyError, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Geometry, Value};
use nearpoly_types::attributes::AttributeRecord;
use serde_json::Map;

/// One source area: its shape plus display attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaFeature {
    pub geometry: AreaGeometry,
    pub attributes: AttributeRecord,
}

impl AreaFeature {
    pub fn new(geometry: AreaGeometry, attributes: AttributeRecord) -> Self {
        Self {
            geometry,
            attributes,
        }
    }
}

/// Parses a GeoJSON FeatureCollection into ordered area features.
///
/// Feature `i` becomes ID `i`. Missing `properties` yield an empty record.
pub fn features_from_geojson(geojson: &str) -> Result<Vec<AreaFeature>> {
    let features = feature_values(geojson)?;

    Ok(features
        .into_iter()
        .enumerate()
        .map(|(idx, mut feature)| {
            let attributes = match feature.get_mut("properties").map(serde_json::Value::take) {
                Some(serde_json::Value::Object(props)) => AttributeRecord::from_properties(props),
                _ => AttributeRecord::new(),
            };
            let geometry = geometry_or_empty(idx, feature.remove("geometry"));
            AreaFeature::new(geometry, attributes)
        })
        .collect())
}

/// Parses only the geometries of a FeatureCollection, in feature order.
pub fn geometries_from_geojson(geojson: &str) -> Result<Vec<AreaGeometry>> {
    let features = feature_values(geojson)?;

    Ok(features
        .into_iter()
        .enumerate()
        .map(|(idx, mut feature)| geometry_or_empty(idx, feature.remove("geometry")))
        .collect())
}

/// Converts a GeoJSON geometry value into an area shape.
///
/// Accepts `Polygon` and `MultiPolygon`; anything else, including missing or
/// non-finite coordinates, is a [`NearpolyError::MalformedGeometry`].
pub fn parse_geometry(id: u32, geometry: Option<&Geometry>) -> Result<AreaGeometry> {
    let malformed = |reason: &str| NearpolyError::MalformedGeometry {
        id,
        reason: reason.to_string(),
    };

    let geometry = geometry.ok_or_else(|| malformed("feature has no geometry"))?;
    let polygons = match &geometry.value {
        Value::Polygon(rings) => vec![parse_polygon(rings).map_err(|r| malformed(&r))?],
        Value::MultiPolygon(parts) => {
            if parts.is_empty() {
                return Err(malformed("MultiPolygon has no parts"));
            }
            parts
                .iter()
                .map(|rings| parse_polygon(rings))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|r| malformed(&r))?
        }
        other => {
            return Err(malformed(&format!(
                "unsupported geometry type {}",
                type_name(other)
            )));
        }
    };

    Ok(MultiPolygon::new(polygons))
}

/// Converts an area shape to a GeoJSON `MultiPolygon` geometry.
pub fn area_to_geojson(geometry: &AreaGeometry) -> Geometry {
    let ring_positions = |ring: &LineString<f64>| -> Vec<Vec<f64>> {
        ring.coords().map(|c| vec![c.x, c.y]).collect()
    };

    let parts: Vec<Vec<Vec<Vec<f64>>>> = geometry
        .iter()
        .map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(ring_positions)
                .collect::<Vec<_>>()
        })
        .collect();

    Geometry::new(Value::MultiPolygon(parts))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn feature_values(geojson: &str) -> Result<Vec<Map<String, serde_json::Value>>> {
    let mut root: serde_json::Value = serde_json::from_str(geojson)
        .map_err(|e| NearpolyError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;

    if root.get("type").and_then(|t| t.as_str()) != Some("FeatureCollection") {
        return Err(NearpolyError::InvalidInput(
            "GeoJSON root is not a FeatureCollection".to_string(),
        ));
    }

    let features = root.get_mut("features").map(serde_json::Value::take);
    let Some(serde_json::Value::Array(features)) = features else {
        return Err(NearpolyError::InvalidInput(
            "FeatureCollection has no features array".to_string(),
        ));
    };

    Ok(features
        .into_iter()
        .map(|feature| match feature {
            serde_json::Value::Object(map) => map,
            _ => Map::new(),
        })
        .collect())
}

fn geometry_or_empty(idx: usize, value: Option<serde_json::Value>) -> AreaGeometry {
    let id = idx as u32;
    let parsed = match value {
        None | Some(serde_json::Value::Null) => parse_geometry(id, None),
        Some(value) => match Geometry::from_json_value(value) {
            Ok(geometry) => parse_geometry(id, Some(&geometry)),
            Err(e) => Err(NearpolyError::MalformedGeometry {
                id,
                reason: e.to_string(),
            }),
        },
    };

    parsed.unwrap_or_else(|e| {
        log::warn!("{}; keeping an empty shape", e);
        MultiPolygon::new(vec![])
    })
}

fn parse_polygon(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(|ring| parse_ring(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon has no rings".to_string())??;
    if exterior.0.is_empty() {
        return Err("exterior ring has no coordinates".to_string());
    }
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(positions: &[Vec<f64>]) -> std::result::Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|position| {
            if position.len() < 2 {
                return Err("coordinate must have at least 2 values".to_string());
            }
            let (x, y) = (position[0], position[1]);
            if !x.is_finite() || !y.is_finite() {
                return Err(format!("coordinate ({}, {}) is not finite", x, y));
            }
            Ok(Coord { x, y })
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}
