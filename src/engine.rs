//! Nearest-area query engine.
//!
//! The index only knows bounding boxes, so a query over-samples candidates
//! from it, scores each one exactly against its shape, and keeps the best
//! `n`. Retrieval widens step by step while too few usable candidates come
//! back; if nothing
//! spatial is left to try, the engine still answers with a fixed slice of
//! the dataset and flags the outcome as degraded.

use crate::compute::geojson::area_to_geojson;
use crate::compute::geometry::AreaGeometry;
use crate::compute::validation::validate_query_point;
use crate::config::QueryConfig;
use crate::error::{NearpolyError, Result};
use crate::index::PackedIndex;
use crate::scorer::{DistanceScorer, HaversineScorer, score_candidates};
use log::{debug, warn};
use nearpoly_types::attributes::AttributeRecord;
use nearpoly_types::point::QueryPoint;
use serde::{Serialize, Serializer};

/// Borrowed, ID-aligned view of a loaded dataset.
#[derive(Debug, Clone, Copy)]
pub struct AreaView<'a> {
    index: &'a PackedIndex,
    geometries: &'a [AreaGeometry],
    attributes: &'a [AttributeRecord],
}

impl<'a> AreaView<'a> {
    /// Fails with [`NearpolyError::CorruptIndex`] unless the geometry and
    /// attribute tables have exactly one entry per index leaf.
    pub fn new(
        index: &'a PackedIndex,
        geometries: &'a [AreaGeometry],
        attributes: &'a [AttributeRecord],
    ) -> Result<Self> {
        check_alignment("geometry", geometries.len(), index.len())?;
        check_alignment("attribute", attributes.len(), index.len())?;
        Ok(Self {
            index,
            geometries,
            attributes,
        })
    }

    pub fn index(&self) -> &'a PackedIndex {
        self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub(crate) fn check_alignment(table: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(NearpolyError::CorruptIndex(format!(
            "{} table has {} entries but the index has {} leaves",
            table, actual, expected
        )));
    }
    Ok(())
}

/// Why an outcome is not a plain nearest-match answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The query point lies outside the dataset's coverage; results are the
    /// nearest areas but may be far away.
    OutsideCoverage,
    /// No spatial candidates could be found; results are the first IDs of the
    /// dataset, not ranked by proximity to anything.
    FixedSlice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultQuality {
    Exact,
    Degraded(DegradedReason),
}

impl ResultQuality {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ResultQuality::Degraded(_))
    }
}

/// One ranked area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: u32,
    pub distance_km: f64,
    pub attributes: AttributeRecord,
    #[serde(serialize_with = "serialize_area")]
    pub geometry: AreaGeometry,
}

fn serialize_area<S: Serializer>(
    geometry: &AreaGeometry,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    area_to_geojson(geometry).serialize(serializer)
}

/// Ranked results plus how much they can be trusted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<QueryResult>,
    pub quality: ResultQuality,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        self.quality.is_degraded()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.results.iter().map(|r| r.id).collect()
    }
}

/// Runs nearest-area searches against a read-only [`AreaView`].
///
/// Holds no per-query state; one engine can serve any number of threads.
#[derive(Debug, Clone)]
pub struct QueryEngine<S = HaversineScorer> {
    config: QueryConfig,
    scorer: S,
}

impl QueryEngine<HaversineScorer> {
    pub fn new(config: QueryConfig) -> Self {
        Self::with_scorer(config, HaversineScorer)
    }
}

impl Default for QueryEngine<HaversineScorer> {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl<S: DistanceScorer> QueryEngine<S> {
    pub fn with_scorer(config: QueryConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// The `limit` nearest areas to `point` (default limit from config),
    /// ordered by ascending distance then ascending ID.
    ///
    /// Never returns an empty list for a non-empty dataset.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::polygon;
    /// use nearpoly::compute::geojson::AreaFeature;
    /// use nearpoly::compute::geometry::area_from_polygon;
    /// use nearpoly::engine::{AreaView, QueryEngine};
    /// use nearpoly::{AttributeRecord, IndexBuilder, QueryPoint};
    ///
    /// let square = area_from_polygon(polygon![
    ///     (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
    /// ]);
    /// let features = vec![AreaFeature::new(square.clone(), AttributeRecord::new())];
    /// let output = IndexBuilder::new().build(&features)?;
    ///
    /// let geometries = vec![square];
    /// let attributes = vec![AttributeRecord::new()];
    /// let view = AreaView::new(&output.index, &geometries, &attributes)?;
    ///
    /// let engine = QueryEngine::default();
    /// let outcome = engine.find_nearest(view, &QueryPoint::new(0.5, 0.5), None)?;
    /// assert_eq!(outcome.results[0].distance_km, 0.0);
    /// assert!(!outcome.is_degraded());
    /// # Ok::<(), nearpoly::NearpolyError>(())
    /// ```
    pub fn find_nearest(
        &self,
        view: AreaView<'_>,
        point: &QueryPoint,
        limit: Option<usize>,
    ) -> Result<SearchOutcome> {
        validate_query_point(point)?;
        let n = limit.unwrap_or(self.config.default_limit);

        let mut quality = if self.within_coverage(view.index, point) {
            ResultQuality::Exact
        } else {
            warn!(
                "Query point ({}, {}) lies outside dataset coverage",
                point.lat, point.lon
            );
            ResultQuality::Degraded(DegradedReason::OutsideCoverage)
        };

        if n == 0 {
            return Ok(SearchOutcome {
                results: Vec::new(),
                quality,
            });
        }

        let candidates = self
            .nearest_candidates(view.index, point, n)
            .unwrap_or_else(|e| {
                warn!(
                    "Candidate retrieval failed for ({}, {}): {}",
                    point.lat, point.lon, e
                );
                None
            });
        let ids = match candidates {
            Some(ids) => ids,
            None => {
                let slice = self.config.fallback_slice_len.max(n).min(view.len());
                warn!(
                    "No spatial candidates for ({}, {}); answering with the first {} areas",
                    point.lat, point.lon, slice
                );
                quality = ResultQuality::Degraded(DegradedReason::FixedSlice);
                (0..slice as u32).collect()
            }
        };

        let mut scored = score_candidates(&self.scorer, point, &ids, view.geometries);
        scored.truncate(n);

        let results = scored
            .into_iter()
            .map(|candidate| QueryResult {
                id: candidate.id,
                distance_km: candidate.distance_km,
                attributes: view.attributes[candidate.id as usize].clone(),
                geometry: view.geometries[candidate.id as usize].clone(),
            })
            .collect();

        Ok(SearchOutcome { results, quality })
    }

    /// Candidate IDs from the index, excluding areas without a usable box.
    ///
    /// Starts at `initial_candidates(n)`, retries once at `retry_candidates`,
    /// then doubles until at least `min(n, usable areas)` candidates survive
    /// or the whole index has been seen. `None` means no usable area exists
    /// at all.
    fn nearest_candidates(
        &self,
        index: &PackedIndex,
        point: &QueryPoint,
        n: usize,
    ) -> Result<Option<Vec<u32>>> {
        let len = index.len();
        let wanted = n.min(index.usable_len());
        if wanted == 0 {
            return Ok(None);
        }

        let mut k = self.config.initial_candidates(n).min(len);
        let mut retried = false;

        loop {
            let ids: Vec<u32> = index
                .nearest(point.lon, point.lat, k)?
                .into_iter()
                .filter(|&id| index.leaf_box(id).is_some_and(|b| !b.is_sentinel()))
                .collect();

            if ids.len() >= wanted || k >= len {
                debug!("Found {} candidates with k = {}", ids.len(), k);
                return Ok(Some(ids));
            }

            let next = if retried {
                k.saturating_mul(2)
            } else {
                retried = true;
                self.config.retry_candidates.max(k.saturating_mul(2))
            };
            k = next.min(len);
            debug!(
                "Only {} of {} usable candidates, widening to k = {}",
                ids.len(),
                wanted,
                k
            );
        }
    }

    fn within_coverage(&self, index: &PackedIndex, point: &QueryPoint) -> bool {
        let bounds = index.bounds();
        !bounds.is_sentinel()
            && bounds
                .expand(self.config.coverage_margin_deg)
                .contains_point(point.lon, point.lat)
    }
}
