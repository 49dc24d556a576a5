//! Geographic extent of a tile

/// Bounding box of a tile in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapTileBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapTileBounds {
    /// Bounds of tile `x`/`y` at zoom `z` in the 2:1 geographic scheme.
    pub fn from_geographic_tile(z: i32, x: i32, y: i32) -> Self {
        let x_tiles = (2i64 << z) as f64;
        let y_tiles = (1i64 << z) as f64;

        let x_tile_width = 360.0 / x_tiles;
        let west = x as f64 * x_tile_width - 180.0;
        let east = (x as f64 + 1.0) * x_tile_width - 180.0;

        let y_tile_height = 180.0 / y_tiles;
        let north = 90.0 - y as f64 * y_tile_height;
        let south = 90.0 - (y as f64 + 1.0) * y_tile_height;
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_tiles() {
        let west = MapTileBounds::from_geographic_tile(0, 0, 0);
        assert_eq!(west, MapTileBounds { north: 90.0, south: -90.0, east: 0.0, west: -180.0 });
        let east = MapTileBounds::from_geographic_tile(0, 1, 0);
        assert_eq!(east, MapTileBounds { north: 90.0, south: -90.0, east: 180.0, west: 0.0 });
    }

    #[test]
    fn test_zoom_two() {
        let bounds = MapTileBounds::from_geographic_tile(2, 1, 1);
        assert_eq!(bounds.west, -135.0);
        assert_eq!(bounds.east, -90.0);
        assert_eq!(bounds.north, 45.0);
        assert_eq!(bounds.south, 0.0);
        assert_eq!(bounds.width(), 45.0);
        assert_eq!(bounds.height(), 45.0);
    }

    #[test]
    fn test_last_tile_reaches_corner() {
        let bounds = MapTileBounds::from_geographic_tile(3, 15, 7);
        assert_eq!(bounds.east, 180.0);
        assert_eq!(bounds.south, -90.0);
    }
}
