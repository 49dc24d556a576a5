//! Strategies that turn a tile address into elevation-bearing pixels
//!
//! The planet does not care where query points come from. A sampler decides
//! which points to query, runs one batched descent, and hands back one point
//! per pixel in image order.

use std::collections::{HashMap, HashSet};

use crate::config::SamplerKind;
use crate::error::Result;
use crate::geo::longitudinal_width_of_pixel_meters;
use crate::planet::Planet;
use crate::point::Point;

use super::bounds::MapTileBounds;
use super::key::MapTileKey;
use super::TILE_SIZE;

/// Meters spanned by one degree of latitude on the mean sphere.
pub const METERS_PER_DEGREE: f64 = 111_319.49;

/// Produces the elevation grid of a tile.
pub trait TileSampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// `TILE_SIZE²` points with elevations, north-to-south then west-to-east.
    fn sample(&self, planet: &Planet, key: &MapTileKey) -> Result<Vec<Point>>;
}

/// Build the sampler named by configuration.
pub fn sampler_for(kind: SamplerKind, resolution_safety_factor: f64) -> Box<dyn TileSampler> {
    match kind {
        SamplerKind::Geographic => Box::new(GeographicSampler::new(resolution_safety_factor)),
        SamplerKind::Hex { cell_size_meters } => Box::new(HexCellSampler::new(cell_size_meters)),
    }
}

/// Latitude and longitude of every pixel's north-west corner, row by row.
fn pixel_grid(bounds: &MapTileBounds) -> impl Iterator<Item = (f64, f64)> + '_ {
    let lon_delta = bounds.width() / TILE_SIZE as f64;
    let lat_delta = bounds.height() / TILE_SIZE as f64;
    (0..TILE_SIZE).flat_map(move |row| {
        let lat = bounds.north - row as f64 * lat_delta;
        (0..TILE_SIZE).map(move |col| (lat, bounds.west + col as f64 * lon_delta))
    })
}

/// Order points north-to-south, then west-to-east.
pub fn sort_row_major(points: &mut [Point]) {
    points.sort_by(|a, b| (-a.lat).total_cmp(&-b.lat).then(a.lon.total_cmp(&b.lon)));
}

/// One query point per pixel.
///
/// Resolution is recomputed for every row because a degree of longitude
/// narrows toward the poles.
#[derive(Clone, Copy, Debug)]
pub struct GeographicSampler {
    safety_factor: f64,
}

impl GeographicSampler {
    pub fn new(safety_factor: f64) -> Self {
        Self { safety_factor }
    }

    /// Sampling resolution for a row at `lat` whose pixels span `lon_delta` degrees.
    pub fn row_resolution(&self, lat: f64, lon_delta: f64) -> u32 {
        let width_of_pixel_meters = longitudinal_width_of_pixel_meters(lat, lon_delta);
        ((width_of_pixel_meters * self.safety_factor).ceil() as u32).max(1)
    }

    /// Query points for `key` without elevations.
    pub fn query_points(&self, key: &MapTileKey) -> Result<Vec<Point>> {
        let bounds = key.bounds();
        let lon_delta = bounds.width() / TILE_SIZE as f64;
        let mut points = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
        let mut row_lat = f64::NAN;
        let mut resolution = 1;
        for (lat, lon) in pixel_grid(&bounds) {
            if lat != row_lat {
                row_lat = lat;
                resolution = self.row_resolution(lat, lon_delta);
            }
            points.push(Point::query(lat, lon, resolution)?);
        }
        Ok(points)
    }
}

impl Default for GeographicSampler {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl TileSampler for GeographicSampler {
    fn name(&self) -> &'static str {
        "geographic"
    }

    fn sample(&self, planet: &Planet, key: &MapTileKey) -> Result<Vec<Point>> {
        let mut points = self.query_points(key)?;
        planet.multiple_elevations(&mut points);
        sort_row_major(&mut points);
        Ok(points)
    }
}

/// Pixels take the elevation of the hexagonal cell they fall in.
///
/// Cells are pointy-top hexagons laid out in degree space. Each distinct cell
/// centre is queried once at a resolution equal to the cell size.
#[derive(Clone, Copy, Debug)]
pub struct HexCellSampler {
    cell_size_meters: u32,
}

impl HexCellSampler {
    pub fn new(cell_size_meters: u32) -> Self {
        Self {
            cell_size_meters: cell_size_meters.max(1),
        }
    }

    pub fn cell_size_meters(&self) -> u32 {
        self.cell_size_meters
    }

    /// Centre (lat, lon) of the cell containing `lat`/`lon`.
    pub fn cell_center(&self, lat: f64, lon: f64) -> (f64, f64) {
        let size = self.cell_size_meters as f64 / METERS_PER_DEGREE;
        let sqrt3 = 3f64.sqrt();

        // Fractional axial coordinates.
        let q = (sqrt3 / 3.0 * lon - lat / 3.0) / size;
        let r = (2.0 / 3.0 * lat) / size;

        // Cube rounding.
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();
        let dq = (rq - q).abs();
        let dr = (rr - r).abs();
        let ds = (rs - s).abs();
        if dq > dr && dq > ds {
            rq = -rr - rs;
        } else if dr > ds {
            rr = -rq - rs;
        }

        let center_lon = size * (sqrt3 * rq + sqrt3 / 2.0 * rr);
        let center_lat = size * (1.5 * rr);
        (center_lat.clamp(-90.0, 90.0), center_lon.clamp(-180.0, 180.0))
    }
}

impl TileSampler for HexCellSampler {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn sample(&self, planet: &Planet, key: &MapTileKey) -> Result<Vec<Point>> {
        let bounds = key.bounds();
        let mut pixels = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
        let mut centers = Vec::new();
        let mut seen = HashSet::new();

        for (lat, lon) in pixel_grid(&bounds) {
            let (center_lat, center_lon) = self.cell_center(lat, lon);
            let cell = (center_lat.to_bits(), center_lon.to_bits());
            if seen.insert(cell) {
                centers.push(Point::query(center_lat, center_lon, self.cell_size_meters)?);
            }
            pixels.push((Point::query(lat, lon, self.cell_size_meters)?, cell));
        }

        planet.multiple_elevations(&mut centers);
        let elevations: HashMap<(u64, u64), f64> = centers
            .iter()
            .map(|c| ((c.lat.to_bits(), c.lon.to_bits()), c.alt))
            .collect();

        Ok(pixels
            .into_iter()
            .map(|(pixel, cell)| pixel.with_alt(elevations.get(&cell).copied().unwrap_or(pixel.alt)))
            .collect())
    }
}
