//! Validation for query coordinates.

use crate::error::{NearpolyError, Result};
use nearpoly_types::point::QueryPoint;

/// Validates a query point has a finite, in-range longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use nearpoly::compute::validation::validate_query_point;
/// use nearpoly::QueryPoint;
///
/// assert!(validate_query_point(&QueryPoint::new(54.32, 10.13)).is_ok());
/// assert!(validate_query_point(&QueryPoint::new(95.0, 10.0)).is_err());
/// assert!(validate_query_point(&QueryPoint::new(54.0, f64::NAN)).is_err());
/// ```
pub fn validate_query_point(point: &QueryPoint) -> Result<()> {
    let (lon, lat) = (point.lon, point.lat);

    if !lon.is_finite() {
        return Err(NearpolyError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            lon
        )));
    }

    if !lat.is_finite() {
        return Err(NearpolyError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lon) {
        return Err(NearpolyError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lon
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(NearpolyError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_points() {
        assert!(validate_query_point(&QueryPoint::new(40.7128, -74.0060)).is_ok());
        assert!(validate_query_point(&QueryPoint::new(90.0, 180.0)).is_ok());
        assert!(validate_query_point(&QueryPoint::new(-90.0, -180.0)).is_ok());
    }

    #[test]
    fn test_out_of_range() {
        assert!(validate_query_point(&QueryPoint::new(0.0, 180.1)).is_err());
        assert!(validate_query_point(&QueryPoint::new(-90.5, 0.0)).is_err());
    }

    #[test]
    fn test_non_finite() {
        let err = validate_query_point(&QueryPoint::new(f64::INFINITY, 0.0)).unwrap_err();
        assert!(matches!(err, NearpolyError::InvalidInput(_)));
    }
}
