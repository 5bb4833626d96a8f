//! Bounding boxes and point-to-area distances over polygon shapes.
//!
//! Every shape is handled as a `MultiPolygon`; a single polygon is a
//! one-element multipolygon. Coordinates are (longitude, latitude) degrees.

use geo::{
    BoundingRect, Closest, Contains, CoordsIter, Distance, Haversine, HaversineClosestPoint,
    LineString, MultiPolygon, Point, Polygon,
};
use nearpoly_types::bbox::BoundingBox;

/// Shape of one indexed area.
pub type AreaGeometry = MultiPolygon<f64>;

const METERS_PER_KM: f64 = 1000.0;

/// Wrap a single polygon as an area shape.
pub fn area_from_polygon(polygon: Polygon<f64>) -> AreaGeometry {
    MultiPolygon::new(vec![polygon])
}

/// Bounding box over every polygon part.
///
/// Returns [`BoundingBox::ZERO`] when the shape has no coordinates or any
/// coordinate is not finite.
///
/// # Examples
///
/// ```
/// use geo::polygon;
/// use nearpoly::compute::geometry::{area_from_polygon, bounding_box};
///
/// let square = area_from_polygon(polygon![
///     (x: 0.0, y: 0.0),
///     (x: 2.0, y: 0.0),
///     (x: 2.0, y: 1.0),
///     (x: 0.0, y: 1.0),
/// ]);
/// let bbox = bounding_box(&square);
/// assert_eq!((bbox.max_x, bbox.max_y), (2.0, 1.0));
/// ```
pub fn bounding_box(geometry: &AreaGeometry) -> BoundingBox {
    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return BoundingBox::ZERO;
    }
    geometry
        .bounding_rect()
        .map(BoundingBox::from)
        .unwrap_or(BoundingBox::ZERO)
}

/// Whether the point lies inside any polygon part (holes excluded).
pub fn contains_point(geometry: &AreaGeometry, point: &Point<f64>) -> bool {
    geometry.contains(point)
}

/// Distance in kilometers from `point` to the area's boundary, or `0.0` when
/// the point lies inside it or on its boundary.
///
/// Edges are great-circle arcs between consecutive ring coordinates. An
/// empty shape is infinitely far away.
pub fn point_to_area_distance_km(point: &Point<f64>, geometry: &AreaGeometry) -> f64 {
    if geometry.0.is_empty() {
        return f64::INFINITY;
    }
    if contains_point(geometry, point) {
        return 0.0;
    }

    geometry
        .iter()
        .flat_map(rings)
        .map(|ring| ring_distance_km(point, ring))
        .fold(f64::INFINITY, f64::min)
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

/// Great-circle distance from `point` to the closest position on `ring`.
fn ring_distance_km(point: &Point<f64>, ring: &LineString<f64>) -> f64 {
    match ring.haversine_closest_point(point) {
        Closest::Intersection(_) => 0.0,
        Closest::SinglePoint(closest) => haversine_km(point, closest),
        // A ring without segments: a lone coordinate or nothing at all.
        Closest::Indeterminate => ring
            .points()
            .next()
            .map_or(f64::INFINITY, |only| haversine_km(point, only)),
    }
}

fn haversine_km(from: &Point<f64>, to: Point<f64>) -> f64 {
    Haversine.distance(*from, to) / METERS_PER_KM
}
