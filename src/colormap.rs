//! Elevation-to-color lookup
//!
//! A color map is a short list of (threshold, color) breakpoints expanded into
//! a dense table. Between breakpoints the lower breakpoint's color is held.

use crate::error::{PlanetError, Result};

/// One breakpoint of a color map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorBand {
    pub threshold: i64,
    pub color: [u8; 3],
}

const fn band(threshold: i64, r: u8, g: u8, b: u8) -> ColorBand {
    ColorBand {
        threshold,
        color: [r, g, b],
    }
}

/// "Lefebvre2" palette from Torben Mogensen's planet generator:
/// deep ocean through shelf blues, then lowland greens up to snow.
pub const LEFEBVRE2: [ColorBand; 12] = [
    band(1, 0, 53, 83),
    band(85, 5, 70, 107),
    band(100, 17, 85, 124),
    band(120, 104, 176, 196),
    band(125, 179, 214, 224),
    band(126, 8, 68, 34),
    band(155, 50, 101, 50),
    band(185, 118, 141, 69),
    band(205, 165, 184, 105),
    band(230, 205, 207, 162),
    band(245, 235, 243, 248),
    band(250, 255, 255, 255),
];

#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    min_key: i64,
    max_key: i64,
    /// Color for every integer key in `min_key..=max_key`
    table: Vec<[u8; 3]>,
}

impl ColorMap {
    /// Expand breakpoints into a dense table. Thresholds must be strictly ascending.
    pub fn new(bands: &[ColorBand]) -> Result<Self> {
        let first = bands
            .first()
            .ok_or_else(|| PlanetError::Config("color map needs at least one band".to_string()))?;
        if bands.windows(2).any(|pair| pair[0].threshold >= pair[1].threshold) {
            return Err(PlanetError::Config("color map thresholds must ascend".to_string()));
        }
        Ok(Self::expand(first.color, bands))
    }

    fn expand(first_color: [u8; 3], bands: &[ColorBand]) -> Self {
        let min_key = bands[0].threshold;
        let max_key = bands[bands.len() - 1].threshold;

        let mut table = Vec::with_capacity((max_key - min_key + 1) as usize);
        let mut next = 0;
        let mut color = first_color;
        for key in min_key..=max_key {
            if next < bands.len() && bands[next].threshold == key {
                color = bands[next].color;
                next += 1;
            }
            table.push(color);
        }

        Self {
            min_key,
            max_key,
            table,
        }
    }

    pub fn lefebvre2() -> Self {
        Self::expand(LEFEBVRE2[0].color, &LEFEBVRE2)
    }

    /// Width of the key range, the target span for normalized elevations.
    pub fn elevation_range(&self) -> i64 {
        self.max_key - self.min_key
    }

    /// Color for a normalized elevation, clamped to the table bounds.
    pub fn color_for_elevation(&self, elevation: i64) -> [u8; 3] {
        let key = elevation.clamp(self.min_key, self.max_key);
        self.table[(key - self.min_key) as usize]
    }

    /// Rescale `alt` from `[min, max]` meters into the key range, truncating toward zero.
    pub fn normalize(&self, alt: f64, min: f64, max: f64) -> i64 {
        let old_range = max - min;
        if !(old_range > 0.0) {
            return self.min_key;
        }
        let new_value = ((alt - min) * self.elevation_range() as f64) / old_range;
        // `as` saturates and maps NaN to zero; clamping happens on lookup.
        new_value as i64
    }

    pub fn color_for_altitude(&self, alt: f64, min: f64, max: f64) -> [u8; 3] {
        self.color_for_elevation(self.normalize(alt, min, max))
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::lefebvre2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints_hold_until_next() {
        let map = ColorMap::lefebvre2();
        assert_eq!(map.color_for_elevation(1), [0, 53, 83]);
        assert_eq!(map.color_for_elevation(84), [0, 53, 83]);
        assert_eq!(map.color_for_elevation(85), [5, 70, 107]);
        assert_eq!(map.color_for_elevation(125), [179, 214, 224]);
        assert_eq!(map.color_for_elevation(126), [8, 68, 34]);
        assert_eq!(map.color_for_elevation(249), [235, 243, 248]);
        assert_eq!(map.color_for_elevation(250), [255, 255, 255]);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let map = ColorMap::lefebvre2();
        assert_eq!(map.color_for_elevation(-40), [0, 53, 83]);
        assert_eq!(map.color_for_elevation(10_000), [255, 255, 255]);
    }

    #[test]
    fn test_normalize() {
        let map = ColorMap::lefebvre2();
        assert_eq!(map.elevation_range(), 249);
        assert_eq!(map.normalize(-3000.0, -3000.0, 4200.0), 0);
        assert_eq!(map.normalize(4200.0, -3000.0, 4200.0), 249);
        assert_eq!(map.normalize(600.0, -3000.0, 4200.0), 124);
    }

    #[test]
    fn test_degenerate_range_maps_to_lowest_band() {
        let map = ColorMap::lefebvre2();
        assert_eq!(map.normalize(5.0, 5.0, 5.0), 1);
        assert_eq!(map.color_for_altitude(5.0, 5.0, 5.0), [0, 53, 83]);
    }

    #[test]
    fn test_invalid_bands_rejected() {
        assert!(ColorMap::new(&[]).is_err());
        assert!(ColorMap::new(&[band(5, 0, 0, 0), band(5, 1, 1, 1)]).is_err());
        assert!(ColorMap::new(&[band(9, 0, 0, 0), band(3, 1, 1, 1)]).is_err());
    }
}
