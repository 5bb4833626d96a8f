//! Loaded artifacts and the shared, load-once handle around them.
//!
//! A [`Dataset`] is immutable once constructed and can be queried from any
//! number of threads. Geometries are only needed for exact scoring, so a
//! file-backed dataset reads them on the first search rather than at open.
//!
//! [`DatasetLoader`] is the single-flight cache: the first caller of
//! [`DatasetLoader::load`] performs the I/O, concurrent callers block on that
//! same load, and everyone afterwards gets the cached dataset.
//!
//! # Examples
//!
//! ```rust
//! use nearpoly::{ArtifactPaths, DatasetLoader, IndexBuilder, QueryPoint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let geojson = r#"{"type": "FeatureCollection", "features": [
//!     {"type": "Feature", "properties": {"name": "Kiel"},
//!      "geometry": {"type": "Polygon",
//!                   "coordinates": [[[10,54],[10.3,54],[10.3,54.4],[10,54.4],[10,54]]]}}
//! ]}"#;
//!
//! let dir = tempfile::tempdir()?;
//! let paths = ArtifactPaths::in_dir(dir.path());
//! IndexBuilder::new().build_from_geojson(geojson)?.write_artifacts(&paths)?;
//!
//! let loader = DatasetLoader::new(paths);
//! let loader_clone = loader.clone();
//! let handle = std::thread::spawn(move || loader_clone.load().map(|d| d.len()));
//!
//! let outcome = loader.search(&QueryPoint::new(54.2, 10.1), None)?;
//! assert_eq!(outcome.results[0].distance_km, 0.0);
//! assert_eq!(handle.join().unwrap()?, 1);
//! # Ok(())
//! # }
//! ```

use crate::builder::ArtifactPaths;
use crate::compute::geojson::geometries_from_geojson;
use crate::compute::geometry::AreaGeometry;
use crate::config::Config;
use crate::engine::{AreaView, QueryEngine, SearchOutcome, check_alignment};
use crate::error::{NearpolyError, Result};
use crate::index::{PackedIndex, codec};
use log::{debug, info};
use nearpoly_types::attributes::AttributeRecord;
use nearpoly_types::bbox::BoundingBox;
use nearpoly_types::point::QueryPoint;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// An index with its ID-aligned attribute and geometry tables.
#[derive(Debug)]
pub struct Dataset {
    index: PackedIndex,
    attributes: Vec<AttributeRecord>,
    geometries: OnceCell<Vec<AreaGeometry>>,
    geometry_path: Option<PathBuf>,
    engine: QueryEngine,
}

impl Dataset {
    /// Assemble a dataset from in-memory parts.
    pub fn from_parts(
        index: PackedIndex,
        attributes: Vec<AttributeRecord>,
        geometries: Vec<AreaGeometry>,
        config: &Config,
    ) -> Result<Self> {
        AreaView::new(&index, &geometries, &attributes)?;

        let cell = OnceCell::new();
        let _ = cell.set(geometries);
        Ok(Self {
            index,
            attributes,
            geometries: cell,
            geometry_path: None,
            engine: QueryEngine::new(config.query.clone()),
        })
    }

    /// Read the index and attribute table from disk. The geometry file is
    /// read on first use.
    pub fn open(paths: &ArtifactPaths, config: &Config) -> Result<Self> {
        config.validate().map_err(NearpolyError::InvalidConfig)?;

        let bytes = fs::read(&paths.index)?;
        if let Some(limit) = config.index.max_index_bytes
            && bytes.len() as u64 > limit
        {
            return Err(NearpolyError::IndexTooLarge {
                size: bytes.len() as u64,
                limit,
            });
        }
        let index = codec::decode(&bytes)?;

        let attributes: Vec<AttributeRecord> =
            serde_json::from_slice(&fs::read(&paths.attributes)?).map_err(|e| {
                NearpolyError::CorruptIndex(format!("attribute table is unreadable: {}", e))
            })?;
        check_alignment("attribute", attributes.len(), index.len())?;

        let bounds = index.bounds();
        info!(
            "Loaded index of {} areas from {}; bounds [{}, {}] - [{}, {}]",
            index.len(),
            paths.index.display(),
            bounds.min_x,
            bounds.min_y,
            bounds.max_x,
            bounds.max_y
        );

        Ok(Self {
            index,
            attributes,
            geometries: OnceCell::new(),
            geometry_path: Some(paths.geometries.clone()),
            engine: QueryEngine::new(config.query.clone()),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Coverage of all areas with usable coordinates.
    pub fn bounds(&self) -> BoundingBox {
        self.index.bounds()
    }

    pub fn index(&self) -> &PackedIndex {
        &self.index
    }

    pub fn attributes(&self) -> &[AttributeRecord] {
        &self.attributes
    }

    pub fn attribute(&self, id: u32) -> Option<&AttributeRecord> {
        self.attributes.get(id as usize)
    }

    /// Whether the geometry table is in memory.
    pub fn geometries_loaded(&self) -> bool {
        self.geometries.get().is_some()
    }

    /// The geometry table, reading it on first call.
    pub fn geometries(&self) -> Result<&[AreaGeometry]> {
        let geometries = self.geometries.get_or_try_init(|| {
            // Only file-backed datasets start without geometries.
            let Some(path) = self.geometry_path.as_ref() else {
                return Err(NearpolyError::CorruptIndex(
                    "dataset has neither geometries nor a geometry file".to_string(),
                ));
            };
            debug!("Reading geometries from {}", path.display());
            let geometries = geometries_from_geojson(&fs::read_to_string(path)?)?;
            check_alignment("geometry", geometries.len(), self.index.len())?;
            info!("Loaded {} geometries", geometries.len());
            Ok(geometries)
        })?;
        Ok(geometries)
    }

    /// Up to `k` IDs whose boxes are nearest to the point, closest first.
    pub fn nearest_candidates(&self, point: &QueryPoint, k: usize) -> Result<Vec<u32>> {
        self.index.nearest(point.lon, point.lat, k)
    }

    /// IDs whose boxes intersect `query`, ascending.
    pub fn range(&self, query: &BoundingBox) -> Result<Vec<u32>> {
        self.index.range(query)
    }

    /// The `limit` nearest areas (default from config).
    pub fn search(&self, point: &QueryPoint, limit: Option<usize>) -> Result<SearchOutcome> {
        let view = AreaView::new(&self.index, self.geometries()?, &self.attributes)?;
        self.engine.find_nearest(view, point, limit)
    }
}

/// Progress of a [`DatasetLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

struct LoaderInner {
    paths: ArtifactPaths,
    config: Config,
    dataset: OnceCell<Dataset>,
    status: RwLock<LoadStatus>,
}

/// Cloneable, thread-safe handle that loads a dataset at most once.
///
/// A failed load is not cached: the next call to [`load`](Self::load) tries
/// again.
#[derive(Clone)]
pub struct DatasetLoader {
    inner: Arc<LoaderInner>,
}

impl DatasetLoader {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self::with_config(paths, Config::default())
    }

    pub fn with_config(paths: ArtifactPaths, config: Config) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                paths,
                config,
                dataset: OnceCell::new(),
                status: RwLock::new(LoadStatus::Idle),
            }),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.inner.paths
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.status.read().clone()
    }

    /// The loaded dataset, loading it (index, attributes, and geometries) if
    /// this is the first call. Concurrent callers wait for the same load.
    pub fn load(&self) -> Result<&Dataset> {
        let inner = &*self.inner;
        let dataset = inner.dataset.get_or_try_init(|| {
            *inner.status.write() = LoadStatus::Loading;
            let result = Dataset::open(&inner.paths, &inner.config).and_then(|dataset| {
                dataset.geometries()?;
                Ok(dataset)
            });
            *inner.status.write() = match &result {
                Ok(_) => LoadStatus::Ready,
                Err(e) => LoadStatus::Failed(e.to_string()),
            };
            result
        })?;
        Ok(dataset)
    }

    /// The dataset if it is already loaded, else [`NearpolyError::IndexNotReady`].
    /// Never blocks and never starts a load.
    pub fn get(&self) -> Result<&Dataset> {
        self.inner.dataset.get().ok_or(NearpolyError::IndexNotReady)
    }

    /// Search, waiting for the load if needed.
    pub fn search(&self, point: &QueryPoint, limit: Option<usize>) -> Result<SearchOutcome> {
        self.load()?.search(point, limit)
    }

    /// Search only if the dataset is already loaded.
    pub fn try_search(&self, point: &QueryPoint, limit: Option<usize>) -> Result<SearchOutcome> {
        self.get()?.search(point, limit)
    }
}

impl std::fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("paths", &self.inner.paths)
            .field("status", &self.status())
            .finish()
    }
}
