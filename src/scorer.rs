//! Exact distance scoring for index candidates.

use crate::compute::geometry::{AreaGeometry, point_to_area_distance_km};
use nearpoly_types::point::QueryPoint;
use std::cmp::Ordering;

/// A candidate ID with its exact distance to the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub id: u32,
    pub distance_km: f64,
}

impl ScoredCandidate {
    /// Ascending distance, then ascending ID.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance_km
            .total_cmp(&other.distance_km)
            .then(self.id.cmp(&other.id))
    }
}

/// Distance from a query point to one area, in kilometers.
pub trait DistanceScorer {
    fn distance_km(&self, point: &QueryPoint, geometry: &AreaGeometry) -> f64;
}

/// Great-circle distance to the nearest boundary point; zero inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineScorer;

impl DistanceScorer for HaversineScorer {
    fn distance_km(&self, point: &QueryPoint, geometry: &AreaGeometry) -> f64 {
        point_to_area_distance_km(&point.to_geo(), geometry)
    }
}

/// Score each candidate against its geometry and return them in rank order.
///
/// IDs with no geometry in `geometries` are skipped.
pub fn score_candidates<S: DistanceScorer + ?Sized>(
    scorer: &S,
    point: &QueryPoint,
    ids: &[u32],
    geometries: &[AreaGeometry],
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = ids
        .iter()
        .filter_map(|&id| {
            geometries.get(id as usize).map(|geometry| ScoredCandidate {
                id,
                distance_km: scorer.distance_km(point, geometry),
            })
        })
        .collect();

    scored.sort_by(ScoredCandidate::rank_cmp);
    scored
}
