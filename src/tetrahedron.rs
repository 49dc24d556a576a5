//! Tetrahedral mesh unit: containment, longest-edge subdivision and the root mesh
//!
//! A tetrahedron is immutable. Its vertices are always labelled so that a–b is
//! the longest edge, which makes subdivision a single midpoint on a–b.

use crate::config::DisplacementParams;
use crate::error::Result;
use crate::point::Point;
use crate::seeds::mutate_seed;

/// Terrain altitude of the root vertices, just below sea level.
pub const ROOT_VERTEX_ALTITUDE: f64 = -0.02;

/// Ellipsoidal height of the root mesh, far enough out to enclose the globe.
pub const ROOT_HEIGHT_METERS: f64 = 25_000_000.0;

/// One face of a tetrahedron as a half-space test.
///
/// `origin` is the first face vertex and `normal` the cross product of two
/// face edges. `opposite_below` records which side the fourth vertex lies on.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FacePlane {
    origin: [f64; 3],
    normal: [f64; 3],
    opposite_below: bool,
}

impl FacePlane {
    fn new(one: &Point, two: &Point, three: &Point, four: &Point) -> Self {
        let ax = two.x - one.x;
        let ay = two.y - one.y;
        let az = two.z - one.z;
        let bx = three.x - one.x;
        let by = three.y - one.y;
        let bz = three.z - one.z;
        let normal_x = ay * bz - az * by;
        let normal_y = az * bx - ax * bz;
        let normal_z = ax * by - ay * bx;

        let cx = four.x - one.x;
        let cy = four.y - one.y;
        let cz = four.z - one.z;
        let dot_opposite = (normal_x * cx) + (normal_y * cy) + (normal_z * cz);

        Self {
            origin: [one.x, one.y, one.z],
            normal: [normal_x, normal_y, normal_z],
            opposite_below: dot_opposite < 0.0,
        }
    }

    /// True when `tested` is on the same side as the opposite vertex, or on the face.
    #[inline]
    fn same_side(&self, tested: &Point) -> bool {
        let tx = tested.x - self.origin[0];
        let ty = tested.y - self.origin[1];
        let tz = tested.z - self.origin[2];
        let dot_tested = (self.normal[0] * tx) + (self.normal[1] * ty) + (self.normal[2] * tz);
        (self.opposite_below == (dot_tested < 0.0)) || dot_tested == 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tetrahedron {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub d: Point,
    longest_side: f64,
    average_altitude: f64,
    faces: [FacePlane; 4],
}

impl Tetrahedron {
    fn new(a: Point, b: Point, c: Point, d: Point, longest_side: f64) -> Self {
        let faces = [
            FacePlane::new(&a, &b, &c, &d),
            FacePlane::new(&b, &c, &d, &a),
            FacePlane::new(&c, &d, &a, &b),
            FacePlane::new(&d, &a, &b, &c),
        ];
        let average_altitude = (a.alt + b.alt + c.alt + d.alt) / 4.0;
        Self {
            a,
            b,
            c,
            d,
            longest_side,
            average_altitude,
            faces,
        }
    }

    /// Build a tetrahedron whose a–b edge is the longest.
    ///
    /// Ties are resolved by preferring c–d, then b–d, b–c, a–d, a–c and
    /// finally a–b.
    pub fn with_ordered_points(a: Point, b: Point, c: Point, d: Point) -> Self {
        let ab = a.distance(&b);
        let ac = a.distance(&c);
        let ad = a.distance(&d);
        let bc = b.distance(&c);
        let bd = b.distance(&d);
        let cd = c.distance(&d);

        let mut longest = ab;
        for side in [ac, ad, bc, bd, cd] {
            if side > longest {
                longest = side;
            }
        }

        if longest == cd {
            Self::new(c, d, a, b, longest)
        } else if longest == bd {
            Self::new(b, d, a, c, longest)
        } else if longest == bc {
            Self::new(b, c, a, d, longest)
        } else if longest == ad {
            Self::new(a, d, b, c, longest)
        } else if longest == ac {
            Self::new(a, c, b, d, longest)
        } else {
            Self::new(a, b, c, d, longest)
        }
    }

    /// The root mesh for a (squished) seed.
    ///
    /// Vertex seeds are chained through [`mutate_seed`]; positions are fixed
    /// and lie far above the surface so every surface point is enclosed.
    pub fn build_default(seed: f64) -> Result<Self> {
        let a_seed = mutate_seed(seed, seed);
        let b_seed = mutate_seed(seed, a_seed);
        let c_seed = mutate_seed(seed, b_seed);
        let d_seed = mutate_seed(seed, c_seed);

        let vertex = |lat: f64, lon: f64, extra_height: f64, vertex_seed: f64| {
            Point::from_spherical(
                lat,
                lon,
                ROOT_HEIGHT_METERS + extra_height,
                vertex_seed,
                ROOT_VERTEX_ALTITUDE,
                crate::point::DEFAULT_RESOLUTION_METERS,
            )
        };

        let a = vertex(89.0, 1.0, 1_000_000.0, a_seed)?;
        let b = vertex(-29.1, -1.1, 2_000_000.0, b_seed)?;
        let c = vertex(-28.2, 119.2, 3_000_000.0, c_seed)?;
        let d = vertex(-31.3, -121.3, 4_000_000.0, d_seed)?;

        Ok(Self::with_ordered_points(a, b, c, d))
    }

    /// Length of the a–b edge, the longest of the six.
    pub fn longest_side(&self) -> f64 {
        self.longest_side
    }

    /// Mean of the four vertex altitudes.
    pub fn average_altitude(&self) -> f64 {
        self.average_altitude
    }

    /// Containment test; points on a face count as contained.
    #[inline]
    pub fn contains(&self, point: &Point) -> bool {
        self.faces.iter().all(|face| face.same_side(point))
    }

    /// Displaced midpoint of the a–b edge.
    pub fn split_point(&self, params: &DisplacementParams) -> Point {
        self.a.midpoint(&self.b, self.longest_side, params)
    }

    /// The half of this tetrahedron on the a side of `split`.
    pub fn left_child(&self, split: &Point) -> Tetrahedron {
        Self::with_ordered_points(self.a, *split, self.c, self.d)
    }

    /// The half of this tetrahedron on the b side of `split`.
    pub fn right_child(&self, split: &Point) -> Tetrahedron {
        Self::with_ordered_points(*split, self.b, self.c, self.d)
    }

    /// Split along the longest edge into `(a, m, c, d)` and `(m, b, c, d)`.
    pub fn subdivide(&self, params: &DisplacementParams) -> (Tetrahedron, Tetrahedron) {
        let split = self.split_point(params);
        (self.left_child(&split), self.right_child(&split))
    }

    pub fn rotate_around_x_axis(&self, degrees: f64) -> Tetrahedron {
        Self::new(
            self.a.rotate_around_x_axis(degrees),
            self.b.rotate_around_x_axis(degrees),
            self.c.rotate_around_x_axis(degrees),
            self.d.rotate_around_x_axis(degrees),
            self.longest_side,
        )
    }

    pub fn rotate_around_y_axis(&self, degrees: f64) -> Tetrahedron {
        Self::new(
            self.a.rotate_around_y_axis(degrees),
            self.b.rotate_around_y_axis(degrees),
            self.c.rotate_around_y_axis(degrees),
            self.d.rotate_around_y_axis(degrees),
            self.longest_side,
        )
    }
}
