//! Elevation queries against the fractal tetrahedral mesh of one seed
//!
//! The mesh is never stored beyond its root: every query re-derives the
//! subdivisions it needs, which is cheap and fully determined by the seed.

use tracing::info;

use crate::config::DisplacementParams;
use crate::error::{PlanetError, Result};
use crate::point::Point;
use crate::seeds::squish_seed;
use crate::tetrahedron::Tetrahedron;

/// A procedurally generated planet.
///
/// Immutable after construction, so a shared reference can serve any number
/// of concurrent queries.
#[derive(Clone, Debug)]
pub struct Planet {
    seed: f64,
    squished_seed: f64,
    params: DisplacementParams,
    root: Tetrahedron,
}

impl Planet {
    pub fn new(seed: f64) -> Result<Self> {
        Self::with_params(seed, DisplacementParams::default())
    }

    pub fn with_params(seed: f64, params: DisplacementParams) -> Result<Self> {
        if !seed.is_finite() {
            return Err(PlanetError::InvalidSeed(seed.to_string()));
        }
        let squished_seed = squish_seed(seed);
        let root = Tetrahedron::build_default(squished_seed)?;
        info!(seed, squished_seed, "planet constructed");
        Ok(Self {
            seed,
            squished_seed,
            params,
            root,
        })
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn squished_seed(&self) -> f64 {
        self.squished_seed
    }

    pub fn params(&self) -> &DisplacementParams {
        &self.params
    }

    pub fn root(&self) -> &Tetrahedron {
        &self.root
    }

    /// Elevation at a single coordinate, descending until the containing
    /// tetrahedron's longest edge is at most `resolution` meters.
    pub fn elevation_at(&self, lat: f64, lon: f64, resolution: u32) -> Result<Point> {
        let point = Point::query(lat, lon, resolution)?;
        let resolution = resolution as f64;
        let mut current = self.root.clone();
        while current.longest_side() > resolution {
            let (left, right) = current.subdivide(&self.params);
            current = if left.contains(&point) {
                left
            } else if right.contains(&point) {
                right
            } else {
                return Err(PlanetError::Geometry(format!(
                    "no child tetrahedron contains ({}, {}) at edge length {}",
                    point.lat,
                    point.lon,
                    current.longest_side()
                )));
            };
        }
        Ok(point.with_alt(current.average_altitude()))
    }

    /// Assign an elevation to every point in one shared descent.
    ///
    /// Points are reordered in place; the order on return is unspecified.
    pub fn multiple_elevations(&self, points: &mut [Point]) {
        self.assign_elevations(points, &self.root);
    }

    fn assign_elevations(&self, points: &mut [Point], current: &Tetrahedron) {
        if points.is_empty() {
            return;
        }

        // Points whose resolution is already satisfied take this tetrahedron's altitude.
        let longest_side = current.longest_side();
        let done = partition_in_place(points, |p| longest_side <= p.resolution as f64);
        let altitude = current.average_altitude();
        for point in &mut points[..done] {
            point.alt = altitude;
        }
        if done == points.len() {
            return;
        }

        let split = current.split_point(&self.params);
        let left = current.left_child(&split);
        let pending = &mut points[done..];
        let containment = partition_in_place(pending, |p| left.contains(p));
        let (left_points, right_points) = pending.split_at_mut(containment);

        // Batches are usually local, so one side is often empty.
        if !left_points.is_empty() {
            self.assign_elevations(left_points, &left);
        }
        if !right_points.is_empty() {
            let right = current.right_child(&split);
            self.assign_elevations(right_points, &right);
        }
    }
}

/// Move every item matching `pred` to the front and return the index of the
/// first non-matching item.
///
/// Two-pointer partition: O(n), no allocation, not stable.
pub fn partition_in_place<T, F>(items: &mut [T], mut pred: F) -> usize
where
    F: FnMut(&T) -> bool,
{
    let mut first = 0;
    // One past the right pointer, so it can reach "before index 0".
    let mut last = items.len();
    loop {
        while first < items.len() && pred(&items[first]) {
            first += 1;
        }
        while last > 0 && !pred(&items[last - 1]) {
            last -= 1;
        }
        if last == 0 || first >= last - 1 {
            break;
        }
        items.swap(first, last - 1);
    }
    first
}
