//! Query and mesh vertices in the Earth-centred Cartesian frame

use crate::config::DisplacementParams;
use crate::error::{PlanetError, Result};
use crate::geo::spherical_to_ecef;
use crate::seeds::{mutate_seed, DEFAULT_SEED};

/// Resolution assigned to query points when none is given (meters).
pub const DEFAULT_RESOLUTION_METERS: u32 = 10;

/// A point in the Earth-centred frame.
///
/// Mesh vertices use `seed` as the provenance of their displacement; query
/// points use `resolution` as the edge length at which descent may stop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub seed: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub resolution: u32,
}

impl Point {
    /// Create a point directly from Cartesian coordinates.
    pub fn new(x: f64, y: f64, z: f64, seed: f64, alt: f64) -> Self {
        Self {
            x,
            y,
            z,
            seed,
            lat: 0.0,
            lon: 0.0,
            alt,
            resolution: DEFAULT_RESOLUTION_METERS,
        }
    }

    /// Create a query point at `lat`/`lon` on the ellipsoid surface.
    pub fn query(lat: f64, lon: f64, resolution: u32) -> Result<Self> {
        Self::from_spherical(lat, lon, 0.0, DEFAULT_SEED, 0.0, resolution)
    }

    /// Create a point from geodetic coordinates.
    ///
    /// `height` positions the point relative to the ellipsoid, while `alt` is
    /// the terrain altitude carried by the point.
    pub fn from_spherical(lat: f64, lon: f64, height: f64, seed: f64, alt: f64, resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(PlanetError::InvalidResolution(resolution));
        }
        let (x, y, z) = spherical_to_ecef(lat, lon, height)?;
        Ok(Self {
            x,
            y,
            z,
            seed,
            lat,
            lon,
            alt,
            resolution,
        })
    }

    pub fn with_alt(&self, alt: f64) -> Self {
        Self { alt, ..*self }
    }

    /// Euclidean distance in the Cartesian frame.
    pub fn distance(&self, other: &Point) -> f64 {
        let x_squared = (self.x - other.x).powi(2);
        let y_squared = (self.y - other.y).powi(2);
        let z_squared = (self.z - other.z).powi(2);
        (x_squared + y_squared + z_squared).sqrt()
    }

    /// Displaced midpoint of the edge from `self` to `other`.
    ///
    /// The cut is weighted toward the endpoint with the smaller seed, and the
    /// altitude is perturbed by the endpoints' altitude difference and the
    /// edge `length`. The result carries the mutated seed.
    pub fn midpoint(&self, other: &Point, length: f64, params: &DisplacementParams) -> Point {
        let new_seed = mutate_seed(self.seed, other.seed);
        let seed_two = mutate_seed(new_seed, new_seed);

        let cut_one = 0.5 + 0.1 * mutate_seed(seed_two, seed_two);
        let cut_two = 1.0 - cut_one;

        let (x, y, z) = if self.seed < other.seed {
            (
                cut_one * self.x + cut_two * other.x,
                cut_one * self.y + cut_two * other.y,
                cut_one * self.z + cut_two * other.z,
            )
        } else if self.seed > other.seed {
            (
                cut_two * self.x + cut_one * other.x,
                cut_two * self.y + cut_one * other.y,
                cut_two * self.z + cut_one * other.z,
            )
        } else {
            // No ordering between equal seeds, so split evenly.
            (
                (self.x + other.x) / 2.0,
                (self.y + other.y) / 2.0,
                (self.z + other.z) / 2.0,
            )
        };

        let alt = (self.alt + other.alt) / 2.0
            + new_seed * params.alt_weight * (self.alt - other.alt).abs().powf(params.alt_pow)
            + new_seed * params.length_weight * length.powf(params.length_pow);
        Point::new(x, y, z, new_seed, alt)
    }

    pub fn rotate_around_x_axis(&self, degrees: f64) -> Point {
        let radians = degrees.to_radians();
        let (sin_rad, cos_rad) = radians.sin_cos();
        let y = self.y * cos_rad - self.z * sin_rad;
        let z = self.z * cos_rad + self.y * sin_rad;
        Point::new(self.x, y, z, self.seed, self.alt)
    }

    pub fn rotate_around_y_axis(&self, degrees: f64) -> Point {
        let radians = degrees.to_radians();
        let (sin_rad, cos_rad) = radians.sin_cos();
        let x = self.x * cos_rad + self.z * sin_rad;
        let z = -sin_rad * self.x + self.z * cos_rad;
        Point::new(x, self.y, z, self.seed, self.alt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn test_query_point_keeps_spherical_origin() {
        let point = Point::query(45.0, 23.0, 50).unwrap();
        assert_eq!(point.lat, 45.0);
        assert_eq!(point.lon, 23.0);
        assert_eq!(point.resolution, 50);
        assert_eq!(point.alt, 0.0);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        assert_eq!(Point::query(0.0, 0.0, 0), Err(PlanetError::InvalidResolution(0)));
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        assert!(matches!(Point::query(100.0, 0.0, 10), Err(PlanetError::Coordinate { .. })));
    }

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0, 0.0, 1.0, 0.0);
        let b = Point::new(3.0, 4.0, 12.0, 1.0, 0.0);
        assert_eq!(a.distance(&b), 13.0);
        assert_eq!(b.distance(&a), 13.0);
    }

    #[test]
    fn test_midpoint_is_deterministic() {
        let params = DisplacementParams::default();
        let a = Point::new(0.0, 0.0, 0.0, 0.25, 100.0);
        let b = Point::new(10.0, 0.0, 0.0, -0.5, -50.0);
        let m1 = a.midpoint(&b, 10.0, &params);
        let m2 = a.midpoint(&b, 10.0, &params);
        assert_eq!(m1, m2);
        assert_eq!(m1.seed, mutate_seed(0.25, -0.5));
    }

    #[test]
    fn test_midpoint_cut_stays_near_center() {
        let params = DisplacementParams::default();
        let a = Point::new(0.0, 0.0, 0.0, 0.25, 0.0);
        let b = Point::new(10.0, 0.0, 0.0, -0.5, 0.0);
        let m = a.midpoint(&b, 10.0, &params);
        assert!(m.x >= 4.0 && m.x <= 6.0, "cut at {}", m.x);
        assert_eq!(m.y, 0.0);
    }

    #[test]
    fn test_equal_seeds_split_evenly() {
        let params = DisplacementParams::default();
        let a = Point::new(0.0, 2.0, 4.0, 0.3, 0.0);
        let b = Point::new(10.0, 4.0, 8.0, 0.3, 0.0);
        let m = a.midpoint(&b, 10.0, &params);
        assert_eq!((m.x, m.y, m.z), (5.0, 3.0, 6.0));
    }

    #[test]
    fn test_midpoint_altitude_formula() {
        let params = DisplacementParams::default();
        let a = Point::new(0.0, 0.0, 0.0, 0.1, 200.0);
        let b = Point::new(1.0, 0.0, 0.0, 0.7, 100.0);
        let m = a.midpoint(&b, 400.0, &params);
        let s = mutate_seed(0.1, 0.7);
        let expected = 150.0 + s * 0.45 * 100.0 + s * 0.65 * 400f64.powf(0.47);
        assert_close(m.alt, expected);
    }

    #[test]
    fn test_rotation_preserves_distance_from_origin() {
        let origin = Point::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let p = Point::new(1.0, 2.0, 3.0, 0.0, 7.0);
        let rx = p.rotate_around_x_axis(33.0);
        let ry = p.rotate_around_y_axis(-71.0);
        assert_close(origin.distance(&rx), origin.distance(&p));
        assert_close(origin.distance(&ry), origin.distance(&p));
        assert_eq!(rx.alt, 7.0);
        assert_close(p.rotate_around_x_axis(90.0).z, 2.0);
    }
}
