use geo::Point;
use serde::{Deserialize, Serialize};

/// A geographic query location as resolved by a geocoder or a map click.
///
/// Field order follows the `{lat, lon}` convention of geocoding services;
/// conversion to `geo::Point` swaps to `(x = lon, y = lat)`.
///
/// # Examples
///
/// ```
/// use nearpoly_types::point::QueryPoint;
///
/// let point = QueryPoint::new(54.2, 9.8);
/// let geo_point = point.to_geo();
/// assert_eq!(geo_point.x(), 9.8);
/// assert_eq!(geo_point.y(), 54.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl QueryPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert to a `geo::Point` with longitude as x.
    pub fn to_geo(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl From<Point<f64>> for QueryPoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}
