use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in meters, matching the value used by the mobile client.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    #[schema(example = 17.87)]
    pub lat: f64,
    #[schema(example = 120.46)]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in [-90, 90], longitude in [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two coordinates in meters (Haversine).
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Coordinate::new(17.87, 120.46);
        assert_eq!(haversine_distance(p, p), 0.0);

        let q = Coordinate::new(-33.8688, 151.2093);
        assert_eq!(haversine_distance(q, q), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(17.87, 120.46);
        let b = Coordinate::new(17.88, 120.47);
        let ab = haversine_distance(a, b);
        let ba = haversine_distance(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn matches_reference_values() {
        // One degree of latitude at the equator is ~111.19 km for R = 6371 km.
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = haversine_distance(a, b);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");

        // Manila to Vigan, roughly 330 km.
        let manila = Coordinate::new(14.5995, 120.9842);
        let vigan = Coordinate::new(17.5747, 120.3869);
        let d = haversine_distance(manila, vigan);
        assert!((330_000.0..340_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn small_perturbation_gives_small_distance() {
        // ~1e-5 degrees is about a meter; the output must stay in that range
        // rather than jump.
        let a = Coordinate::new(17.87, 120.46);
        let b = Coordinate::new(17.87 + 1e-5, 120.46);
        let d = haversine_distance(a, b);
        assert!(d > 0.0 && d < 2.0, "got {d}");
    }

    #[test]
    fn coordinate_range_validation() {
        assert!(Coordinate::new(17.87, 120.46).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
