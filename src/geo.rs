//! Coordinate conversions on the WGS84 ellipsoid and great-circle distances.
//!
//! Spherical input is validated here; everything downstream works in the
//! Cartesian, Earth-centred frame.

use crate::error::{PlanetError, Result};

/// World Geodetic System 1984 semi-major axis (meters).
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const FLATTENING: f64 = 1.0 / 298.257223563;
/// WGS84 semi-minor axis (meters).
pub const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

/// Mean Earth radius used by the haversine formula (meters).
pub const MEAN_EARTH_RADIUS: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Reject latitudes outside [-90, 90] and longitudes outside [-180, 180].
pub fn validate_spherical(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(PlanetError::Coordinate { lat, lon });
    }
    Ok(())
}

/// Convert geodetic latitude/longitude (degrees) and ellipsoidal height (meters)
/// into Earth-centred Cartesian coordinates.
pub fn spherical_to_ecef(lat: f64, lon: f64, alt: f64) -> Result<(f64, f64, f64)> {
    validate_spherical(lat, lon)?;

    let rad_lat = lat * DEG_TO_RAD;
    let rad_lon = lon * DEG_TO_RAD;
    let cos_lat = rad_lat.cos();
    let sin_lat = rad_lat.sin();
    let cos_lon = rad_lon.cos();
    let sin_lon = rad_lon.sin();
    let major_squared = SEMI_MAJOR_AXIS.powi(2);
    let minor_squared = SEMI_MINOR_AXIS.powi(2);
    let prime_vertical_radius =
        major_squared / (major_squared * cos_lat.powi(2) + minor_squared * sin_lat.powi(2)).sqrt();

    let x = (prime_vertical_radius + alt) * cos_lat * cos_lon;
    let y = (prime_vertical_radius + alt) * cos_lat * sin_lon;
    let z = ((minor_squared / major_squared) * prime_vertical_radius + alt) * sin_lat;
    Ok((x, y, z))
}

/// Great-circle distance between two lat/lon pairs (degrees), in meters.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().asin();
    MEAN_EARTH_RADIUS * c
}

/// Physical width of one pixel spanning `pixel_lon_width` degrees of longitude at `pixel_lat`.
pub fn longitudinal_width_of_pixel_meters(pixel_lat: f64, pixel_lon_width: f64) -> f64 {
    haversine_distance_meters(pixel_lat, 0.0, pixel_lat, pixel_lon_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_prime_meridian() {
        let (x, y, z) = spherical_to_ecef(0.0, 0.0, 0.0).unwrap();
        assert!((x - SEMI_MAJOR_AXIS).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
        assert!(z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole_uses_semi_minor_axis() {
        let (x, y, z) = spherical_to_ecef(90.0, 0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
        assert!((z - SEMI_MINOR_AXIS).abs() < 1e-6);
    }

    #[test]
    fn test_altitude_extends_radius() {
        let (x, _, _) = spherical_to_ecef(0.0, 0.0, 1000.0).unwrap();
        assert!((x - SEMI_MAJOR_AXIS - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(spherical_to_ecef(90.1, 0.0, 0.0), Err(PlanetError::Coordinate { .. })));
        assert!(matches!(spherical_to_ecef(-90.1, 0.0, 0.0), Err(PlanetError::Coordinate { .. })));
        assert!(matches!(spherical_to_ecef(0.0, 180.5, 0.0), Err(PlanetError::Coordinate { .. })));
        assert!(matches!(spherical_to_ecef(0.0, -181.0, 0.0), Err(PlanetError::Coordinate { .. })));
        assert!(spherical_to_ecef(f64::NAN, 0.0, 0.0).is_err());
        assert!(spherical_to_ecef(-90.0, 180.0, 0.0).is_ok());
    }

    #[test]
    fn test_longitudinal_width_of_pixel() {
        let actual = longitudinal_width_of_pixel_meters(0.0, 0.1);
        assert!((actual - 11119.492664455875).abs() < 1e-6, "got {}", actual);
    }

    #[test]
    fn test_pixel_width_shrinks_toward_poles() {
        let equator = longitudinal_width_of_pixel_meters(0.0, 1.0);
        let sixty = longitudinal_width_of_pixel_meters(60.0, 1.0);
        assert!((sixty / equator - 0.5).abs() < 1e-3);
    }
}
