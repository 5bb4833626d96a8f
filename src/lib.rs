//! Nearest-area search over a static polygon dataset.
//!
//! An offline [`IndexBuilder`] packs the bounding boxes of every area into a
//! Hilbert-sorted R-tree and writes it next to an attribute table and the
//! geometries. At runtime a [`DatasetLoader`] loads those artifacts once, and
//! each query pulls box-nearest candidates from the tree, scores them by exact
//! great-circle distance to the polygon, and returns the closest few.
//!
//! ```rust
//! use geo::polygon;
//! use nearpoly::prelude::*;
//!
//! let square = |cx: f64, cy: f64| {
//!     area_from_polygon(polygon![
//!         (x: cx - 0.5, y: cy - 0.5),
//!         (x: cx + 0.5, y: cy - 0.5),
//!         (x: cx + 0.5, y: cy + 0.5),
//!         (x: cx - 0.5, y: cy + 0.5),
//!     ])
//! };
//! let features: Vec<AreaFeature> = [(0.0, 0.0), (1.0, 1.0), (10.0, 10.0)]
//!     .into_iter()
//!     .map(|(x, y)| AreaFeature::new(square(x, y), AttributeRecord::new()))
//!     .collect();
//!
//! let output = IndexBuilder::new().build(&features)?;
//! let (geometries, attributes): (Vec<_>, Vec<_>) = features
//!     .into_iter()
//!     .map(|f| (f.geometry, f.attributes))
//!     .unzip();
//! let config = Config::default();
//! let dataset = Dataset::from_parts(output.index, attributes, geometries, &config)?;
//!
//! let outcome = dataset.search(&QueryPoint::new(0.5, 0.5), None)?;
//! assert_eq!(outcome.ids(), vec![0, 1, 2]);
//! assert_eq!(outcome.results[0].distance_km, 0.0);
//! # Ok::<(), nearpoly::NearpolyError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod index;
pub mod scorer;

pub use builder::{ArtifactPaths, BuildOutput, BuildReport, IndexBuilder};
pub use config::{Config, IndexConfig, QueryConfig};
pub use dataset::{Dataset, DatasetLoader, LoadStatus};
pub use engine::{AreaView, DegradedReason, QueryEngine, QueryResult, ResultQuality, SearchOutcome};
pub use error::{NearpolyError, Result};
pub use index::PackedIndex;
pub use scorer::{DistanceScorer, HaversineScorer, ScoredCandidate};

pub use compute::geojson::AreaFeature;
pub use compute::{AreaGeometry, bounding_box, point_to_area_distance_km};

pub use nearpoly_types::attributes::{AttributeRecord, AttributeValue};
pub use nearpoly_types::bbox::BoundingBox;
pub use nearpoly_types::point::QueryPoint;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{NearpolyError, Result};

    pub use crate::{ArtifactPaths, Config, Dataset, DatasetLoader, IndexBuilder};

    pub use crate::{QueryResult, ResultQuality, SearchOutcome};

    pub use crate::compute::geometry::area_from_polygon;
    pub use crate::{AreaFeature, AreaGeometry};

    pub use crate::{AttributeRecord, BoundingBox, QueryPoint};
}
