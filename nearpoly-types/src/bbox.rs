use geo::Rect;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in (longitude, latitude) degrees.
///
/// The all-zero box is a sentinel: it marks a geometry without usable
/// coordinates and never describes a real location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum longitude/x coordinate
    pub min_x: f64,
    /// Minimum latitude/y coordinate
    pub min_y: f64,
    /// Maximum longitude/x coordinate
    pub max_x: f64,
    /// Maximum latitude/y coordinate
    pub max_y: f64,
}

impl BoundingBox {
    /// The sentinel box assigned to malformed or empty geometries.
    pub const ZERO: BoundingBox = BoundingBox {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
    };

    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearpoly_types::bbox::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(-74.0, 40.7, -73.9, 40.8);
    /// assert!(!bbox.is_sentinel());
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether this is the zero sentinel.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::ZERO
    }

    /// The smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Check if a coordinate is contained within this bounding box.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if this bounding box intersects with another (edges touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    /// Expand the bounding box by a given amount in all directions.
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}
