use crate::models::Proximity;

/// Miles per meter, as used by the routing conversion
pub const METERS_TO_MILES: f64 = 0.00062137;

/// Default drive-distance threshold in miles
pub const DEFAULT_THRESHOLD_MILES: f64 = 75.0;

/// Convert a distance in meters to miles
#[inline]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

/// Convert a provider distance row from meters to miles
///
/// `None` stays `None`. Non-finite or negative values are not real routes and
/// become `None` as well.
pub fn convert_distances(meters: &[Option<f64>]) -> Vec<Option<f64>> {
    meters
        .iter()
        .map(|d| match d {
            Some(m) if m.is_finite() && *m >= 0.0 => Some(meters_to_miles(*m)),
            _ => None,
        })
        .collect()
}

/// Select the indices of every distance that is present and within the threshold
///
/// This is the proximity filter: unreachable and too-far sites are both
/// dropped. Indices are returned in ascending order.
///
/// # Arguments
/// * `distances` - Distances in miles, positionally aligned with the roster
/// * `threshold_miles` - Inclusive upper bound
#[inline]
pub fn select_within_threshold(distances: &[Option<f64>], threshold_miles: f64) -> Vec<usize> {
    distances
        .iter()
        .enumerate()
        .filter_map(|(idx, d)| match d {
            Some(miles) if *miles <= threshold_miles => Some(idx),
            _ => None,
        })
        .collect()
}

/// Label a single distance relative to the threshold
#[inline]
pub fn classify_proximity(distance_miles: Option<f64>, threshold_miles: f64) -> Proximity {
    match distance_miles {
        None => Proximity::Unreachable,
        Some(miles) if miles <= threshold_miles => Proximity::Within,
        Some(_) => Proximity::TooFar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_miles() {
        // 160934 m is roughly 100 miles
        let miles = meters_to_miles(160_934.0);
        assert!((miles - 100.0).abs() < 0.01, "Expected ~100mi, got {}", miles);
    }

    #[test]
    fn test_convert_distances_keeps_nulls() {
        let converted = convert_distances(&[Some(0.0), None, Some(f64::NAN), Some(-5.0)]);
        assert_eq!(converted, vec![Some(0.0), None, None, None]);
    }

    #[test]
    fn test_select_within_threshold() {
        let selected = select_within_threshold(&[Some(10.0), None, Some(80.0), Some(75.0)], 75.0);
        assert_eq!(selected, vec![0, 3]);
    }

    #[test]
    fn test_select_within_threshold_empty() {
        assert!(select_within_threshold(&[], 75.0).is_empty());
        assert!(select_within_threshold(&[None, None], 75.0).is_empty());
    }

    #[test]
    fn test_classify_proximity() {
        assert_eq!(classify_proximity(None, 75.0), Proximity::Unreachable);
        assert_eq!(classify_proximity(Some(75.0), 75.0), Proximity::Within);
        assert_eq!(classify_proximity(Some(75.1), 75.0), Proximity::TooFar);
    }
}
