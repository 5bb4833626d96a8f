//! Offline index builder.
//!
//! Turns an ordered collection of areas into the three artifacts a
//! [`Dataset`](crate::dataset::Dataset) loads: the packed index, the
//! attribute table, and the geometry collection. Area `i` is ID `i` in all
//! three.

use crate::compute::geojson::{AreaFeature, area_to_geojson, features_from_geojson};
use crate::compute::geometry::bounding_box;
use crate::config::Config;
use crate::error::{NearpolyError, Result};
use crate::index::{PackedIndex, codec};
use bytes::Bytes;
use geojson::{Feature, FeatureCollection};
use log::{info, warn};
use nearpoly_types::attributes::AttributeRecord;
use nearpoly_types::bbox::BoundingBox;
use std::fs;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "areas.idx";
pub const ATTRIBUTES_FILE: &str = "attributes.json";
pub const GEOMETRIES_FILE: &str = "areas.geojson";

/// Locations of the three artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub index: PathBuf,
    pub attributes: PathBuf,
    pub geometries: PathBuf,
}

impl ArtifactPaths {
    pub fn new(
        index: impl Into<PathBuf>,
        attributes: impl Into<PathBuf>,
        geometries: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index: index.into(),
            attributes: attributes.into(),
            geometries: geometries.into(),
        }
    }

    /// Standard file names inside one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join(INDEX_FILE),
            dir.join(ATTRIBUTES_FILE),
            dir.join(GEOMETRIES_FILE),
        )
    }
}

/// Summary of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub items: usize,
    /// IDs whose geometry had no usable coordinates and got the zero box.
    pub sentinel_ids: Vec<u32>,
    pub total_nodes: usize,
    pub index_bytes: usize,
}

/// Everything a build produces, ready to be written out.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub index: PackedIndex,
    pub index_bytes: Bytes,
    pub attributes_json: String,
    pub geometries_json: String,
    pub report: BuildReport,
}

impl BuildOutput {
    /// Write all three artifacts, creating parent directories as needed.
    pub fn write_artifacts(&self, paths: &ArtifactPaths) -> Result<()> {
        write_file(&paths.index, &self.index_bytes)?;
        write_file(&paths.attributes, self.attributes_json.as_bytes())?;
        write_file(&paths.geometries, self.geometries_json.as_bytes())?;

        info!(
            "Wrote index artifacts: {}, {}, {}",
            paths.index.display(),
            paths.attributes.display(),
            paths.geometries.display()
        );
        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Builds packed indexes from area collections.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    config: Config,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn node_size(mut self, node_size: u16) -> Self {
        self.config.index.node_size = node_size;
        self
    }

    /// Build from a GeoJSON FeatureCollection.
    pub fn build_from_geojson(&self, geojson: &str) -> Result<BuildOutput> {
        let features = features_from_geojson(geojson)?;
        self.build(&features)
    }

    /// Build from features in ID order.
    ///
    /// A feature with an empty shape is kept as a leaf with the zero box so
    /// that IDs stay aligned with the attribute table.
    pub fn build(&self, features: &[AreaFeature]) -> Result<BuildOutput> {
        self.config
            .validate()
            .map_err(NearpolyError::InvalidConfig)?;

        if features.is_empty() {
            return Err(NearpolyError::EmptyDataset);
        }

        let boxes: Vec<BoundingBox> = features.iter().map(|f| bounding_box(&f.geometry)).collect();
        let sentinel_ids: Vec<u32> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_sentinel())
            .map(|(id, _)| id as u32)
            .collect();
        if !sentinel_ids.is_empty() {
            warn!(
                "{} area(s) without usable coordinates were indexed with the zero box: {:?}",
                sentinel_ids.len(),
                sentinel_ids
            );
        }

        let index = PackedIndex::build(&boxes, self.config.index.node_size)?;
        let index_bytes = codec::encode(&index);

        if let Some(limit) = self.config.index.max_index_bytes
            && index_bytes.len() as u64 > limit
        {
            return Err(NearpolyError::IndexTooLarge {
                size: index_bytes.len() as u64,
                limit,
            });
        }

        let attributes: Vec<&AttributeRecord> = features.iter().map(|f| &f.attributes).collect();
        let attributes_json = serde_json::to_string(&attributes)?;
        let geometries_json = geometries_json(features)?;

        let report = BuildReport {
            items: index.len(),
            sentinel_ids,
            total_nodes: index.num_nodes(),
            index_bytes: index_bytes.len(),
        };
        info!(
            "Built index over {} areas: {} nodes, {} bytes",
            report.items, report.total_nodes, report.index_bytes
        );

        Ok(BuildOutput {
            index,
            index_bytes,
            attributes_json,
            geometries_json,
            report,
        })
    }
}

fn geometries_json(features: &[AreaFeature]) -> Result<String> {
    let features = features
        .iter()
        .map(|f| Feature {
            bbox: None,
            geometry: (!f.geometry.0.is_empty()).then(|| area_to_geojson(&f.geometry)),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string(&collection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::geojson::geometries_from_geojson;
    use crate::compute::geometry::area_from_polygon;
    use geo::{MultiPolygon, polygon};

    fn square(cx: f64, cy: f64, name: &str) -> AreaFeature {
        let mut attributes = AttributeRecord::new();
        attributes.insert("name", name);
        AreaFeature::new(
            area_from_polygon(polygon![
                (x: cx - 0.5, y: cy - 0.5),
                (x: cx + 0.5, y: cy - 0.5),
                (x: cx + 0.5, y: cy + 0.5),
                (x: cx - 0.5, y: cy + 0.5),
                (x: cx - 0.5, y: cy - 0.5),
            ]),
            attributes,
        )
    }

    #[test]
    fn test_build_rejects_empty() {
        let result = IndexBuilder::new().build(&[]);
        assert!(matches!(result, Err(NearpolyError::EmptyDataset)));
    }

    #[test]
    fn test_build_report_and_alignment() {
        let mut features = vec![square(0.0, 0.0, "a"), square(3.0, 3.0, "b")];
        features.insert(
            1,
            AreaFeature::new(MultiPolygon::new(vec![]), AttributeRecord::new()),
        );

        let output = IndexBuilder::new().build(&features).unwrap();
        assert_eq!(output.report.items, 3);
        assert_eq!(output.report.sentinel_ids, vec![1]);
        assert_eq!(output.report.index_bytes, output.index_bytes.len());
        assert!(output.index.leaf_box(1).unwrap().is_sentinel());

        let attributes: Vec<AttributeRecord> =
            serde_json::from_str(&output.attributes_json).unwrap();
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[2].get("name").and_then(|v| v.as_str()), Some("b"));

        let geometries = geometries_from_geojson(&output.geometries_json).unwrap();
        assert_eq!(geometries.len(), 3);
        assert!(geometries[1].0.is_empty());
        assert_eq!(geometries[2], features[2].geometry);
    }

    #[test]
    fn test_build_is_byte_identical() {
        let features: Vec<_> = (0..50)
            .map(|i| square((i % 7) as f64 * 2.0, (i / 7) as f64 * 2.0, "x"))
            .collect();
        let a = IndexBuilder::new().build(&features).unwrap();
        let b = IndexBuilder::new().build(&features).unwrap();
        assert_eq!(a.index_bytes, b.index_bytes);
    }

    #[test]
    fn test_size_limit() {
        let config = Config::default().with_max_index_bytes(16);
        let result = IndexBuilder::new()
            .config(config)
            .build(&[square(0.0, 0.0, "a")]);
        assert!(matches!(
            result,
            Err(NearpolyError::IndexTooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_invalid_node_size() {
        let result = IndexBuilder::new().node_size(1).build(&[square(0.0, 0.0, "a")]);
        assert!(matches!(result, Err(NearpolyError::InvalidConfig(_))));
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path().join("out"));
        let output = IndexBuilder::new()
            .build(&[square(0.0, 0.0, "a"), square(1.0, 1.0, "b")])
            .unwrap();
        output.write_artifacts(&paths).unwrap();

        let bytes = fs::read(&paths.index).unwrap();
        assert_eq!(codec::decode(&bytes).unwrap(), output.index);
        assert!(paths.attributes.exists());
        assert!(paths.geometries.exists());
    }
}
