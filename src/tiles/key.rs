//! Tile addresses in the 2:1 geographic tiling scheme

use std::hash::{Hash, Hasher};

use crate::error::{PlanetError, Result};
use crate::seeds::SeedKey;

use super::bounds::MapTileBounds;

/// Deepest zoom level whose column count still fits a 32-bit key.
pub const MAX_ZOOM: i32 = 30;

/// Address of one tile: zoom, column, row and planet seed.
///
/// Zoom `z` has `2·2^z` columns and `2^z` rows; zoom 0 is two tiles covering
/// the western and eastern hemispheres.
#[derive(Clone, Copy, Debug)]
pub struct MapTileKey {
    pub z: i32,
    pub x: i32,
    pub y: i32,
    pub seed: f64,
}

impl MapTileKey {
    pub fn new(z: i32, x: i32, y: i32, seed: f64) -> Self {
        Self { z, x, y, seed }
    }

    /// The zoom-0 tiles of a seed; together they cover the globe.
    pub fn top_keys(seed: f64) -> [MapTileKey; 2] {
        [MapTileKey::new(0, 0, 0, seed), MapTileKey::new(0, 1, 0, seed)]
    }

    pub fn is_top(&self) -> bool {
        self.z == 0
    }

    /// Number of columns at zoom `z`.
    pub fn columns(z: i32) -> i64 {
        2i64 << z
    }

    /// Number of rows at zoom `z`.
    pub fn rows(z: i32) -> i64 {
        1i64 << z
    }

    pub fn is_valid(&self) -> bool {
        if self.z < 0 || self.z > MAX_ZOOM {
            return false;
        }
        let x = self.x as i64;
        let y = self.y as i64;
        (0..Self::columns(self.z)).contains(&x) && (0..Self::rows(self.z)).contains(&y)
    }

    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(PlanetError::InvalidTileKey {
                z: self.z,
                x: self.x,
                y: self.y,
            })
        }
    }

    pub fn bounds(&self) -> MapTileBounds {
        MapTileBounds::from_geographic_tile(self.z, self.x, self.y)
    }

    pub fn seed_key(&self) -> SeedKey {
        SeedKey::from(self.seed)
    }
}

impl PartialEq for MapTileKey {
    fn eq(&self, other: &Self) -> bool {
        self.z == other.z && self.x == other.x && self.y == other.y && self.seed_key() == other.seed_key()
    }
}

impl Eq for MapTileKey {}

impl Hash for MapTileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.z.hash(state);
        self.x.hash(state);
        self.y.hash(state);
        self.seed_key().hash(state);
    }
}

impl std::fmt::Display for MapTileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.seed, self.z, self.x, self.y)
    }
}
