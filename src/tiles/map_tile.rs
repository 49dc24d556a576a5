//! Rendered tiles and the elevation baseline that colors them

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use crate::colormap::ColorMap;
use crate::error::{PlanetError, Result};
use crate::point::Point;

use super::key::MapTileKey;
use super::sampler::sort_row_major;
use super::TILE_SIZE;

/// Seed-wide (min, max) elevation range used to normalize colors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapTileElevations {
    pub min_elevation: f64,
    pub max_elevation: f64,
}

impl MapTileElevations {
    pub fn new(min_elevation: f64, max_elevation: f64) -> Self {
        Self {
            min_elevation,
            max_elevation,
        }
    }

    /// Range spanned by `points`, or (0, 0) when there are none.
    pub fn from_points(points: &[Point]) -> Self {
        Self::from_top_tiles(&[points])
    }

    /// Range spanned by the sampled points of every top tile together.
    pub fn from_top_tiles(tiles: &[&[Point]]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for point in tiles.iter().flat_map(|points| points.iter()) {
            min = min.min(point.alt);
            max = max.max(point.alt);
        }
        if min > max {
            return Self::new(0.0, 0.0);
        }
        Self::new(min, max)
    }

    /// Range spanned by already rendered tiles.
    pub fn from_tiles(tiles: &[&MapTile]) -> Self {
        if tiles.is_empty() {
            return Self::new(0.0, 0.0);
        }
        let min = tiles.iter().map(|t| t.min_elevation()).fold(f64::INFINITY, f64::min);
        let max = tiles.iter().map(|t| t.max_elevation()).fold(f64::NEG_INFINITY, f64::max);
        Self::new(min, max)
    }

    pub fn range(&self) -> f64 {
        self.max_elevation - self.min_elevation
    }
}

/// One rendered 256×256 tile.
///
/// Built once from sampled points and never mutated. Colors come from the
/// shared `baseline`, not from the tile's own range.
#[derive(Clone, Debug)]
pub struct MapTile {
    key: MapTileKey,
    /// Row-major, north-to-south then west-to-east
    elevations: Vec<f64>,
    min_elevation: f64,
    max_elevation: f64,
    baseline: Arc<MapTileElevations>,
    colormap: ColorMap,
    png: Vec<u8>,
}

impl MapTile {
    pub fn from_points(
        key: MapTileKey,
        mut points: Vec<Point>,
        baseline: Arc<MapTileElevations>,
        colormap: &ColorMap,
    ) -> Result<Self> {
        if points.len() != TILE_SIZE * TILE_SIZE {
            return Err(PlanetError::Geometry(format!(
                "tile {} sampled {} points, expected {}",
                key,
                points.len(),
                TILE_SIZE * TILE_SIZE
            )));
        }
        sort_row_major(&mut points);

        let own = MapTileElevations::from_points(&points);
        let elevations: Vec<f64> = points.iter().map(|p| p.alt).collect();
        let raster = render(&elevations, &baseline, colormap);
        let png = encode_png(&raster)?;

        Ok(Self {
            key,
            elevations,
            min_elevation: own.min_elevation,
            max_elevation: own.max_elevation,
            baseline,
            colormap: colormap.clone(),
            png,
        })
    }

    pub fn key(&self) -> &MapTileKey {
        &self.key
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    pub fn min_elevation(&self) -> f64 {
        self.min_elevation
    }

    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }

    pub fn baseline(&self) -> &Arc<MapTileElevations> {
        &self.baseline
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Raw RGB raster, 3 bytes per pixel, in the same order as `elevations`.
    pub fn raster(&self) -> Vec<u8> {
        render(&self.elevations, &self.baseline, &self.colormap)
    }

    /// Path of this tile below `root`: `<root>/<z>/<x>/<y>.png`.
    pub fn relative_path(&self, root: &Path) -> PathBuf {
        root.join(self.key.z.to_string())
            .join(self.key.x.to_string())
            .join(format!("{}.png", self.key.y))
    }

    /// Write the encoded PNG below `root`, creating directories as needed.
    pub fn write_png(&self, root: &Path) -> Result<PathBuf> {
        let path = self.relative_path(root);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, &self.png)?;
        Ok(path)
    }
}

fn render(elevations: &[f64], baseline: &MapTileElevations, colormap: &ColorMap) -> Vec<u8> {
    let mut raster = Vec::with_capacity(elevations.len() * 3);
    for &alt in elevations {
        let color = colormap.color_for_altitude(alt, baseline.min_elevation, baseline.max_elevation);
        raster.extend_from_slice(&color);
    }
    raster
}

fn encode_png(raster: &[u8]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(Cursor::new(&mut bytes), CompressionType::Fast, FilterType::Adaptive);
    encoder.write_image(raster, TILE_SIZE as u32, TILE_SIZE as u32, ExtendedColorType::Rgb8)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn gradient_points(key: &MapTileKey) -> Vec<Point> {
        let bounds = key.bounds();
        let step = bounds.height() / TILE_SIZE as f64;
        let mut points = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
        // Reverse order so construction has to sort.
        for row in (0..TILE_SIZE).rev() {
            for col in (0..TILE_SIZE).rev() {
                let lat = bounds.north - row as f64 * step;
                let lon = bounds.west + col as f64 * step;
                let point = Point::query(lat, lon, 1000).unwrap().with_alt(row as f64);
                points.push(point);
            }
        }
        points
    }

    #[test]
    fn test_from_points_sorts_and_records_range() {
        let key = MapTileKey::new(1, 1, 0, 3.0);
        let baseline = Arc::new(MapTileElevations::new(0.0, 255.0));
        let tile = MapTile::from_points(key, gradient_points(&key), baseline, &ColorMap::lefebvre2()).unwrap();

        assert_eq!(tile.elevations().len(), TILE_SIZE * TILE_SIZE);
        assert_eq!(tile.elevations()[0], 0.0);
        assert_eq!(tile.elevations()[TILE_SIZE * TILE_SIZE - 1], 255.0);
        assert_eq!(tile.min_elevation(), 0.0);
        assert_eq!(tile.max_elevation(), 255.0);
        assert_eq!(tile.key(), &key);
    }

    #[test]
    fn test_raster_uses_shared_baseline() {
        let key = MapTileKey::new(1, 1, 0, 3.0);
        let colormap = ColorMap::lefebvre2();
        // Baseline far wider than the tile, so every pixel is low.
        let baseline = Arc::new(MapTileElevations::new(0.0, 100_000.0));
        let tile = MapTile::from_points(key, gradient_points(&key), baseline, &colormap).unwrap();
        let raster = tile.raster();
        assert_eq!(raster.len(), TILE_SIZE * TILE_SIZE * 3);
        assert!(raster.chunks(3).all(|px| px == colormap.color_for_elevation(1)));
    }

    #[test]
    fn test_png_bytes_are_png() {
        let key = MapTileKey::new(0, 0, 0, 3.0);
        let baseline = Arc::new(MapTileElevations::new(0.0, 255.0));
        let tile = MapTile::from_points(key, gradient_points(&key), baseline, &ColorMap::lefebvre2()).unwrap();
        assert_eq!(&tile.png_bytes()[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_wrong_point_count_rejected() {
        let key = MapTileKey::new(0, 0, 0, 3.0);
        let points = vec![Point::query(0.0, 0.0, 10).unwrap()];
        let result = MapTile::from_points(key, points, Arc::new(MapTileElevations::new(0.0, 1.0)), &ColorMap::lefebvre2());
        assert!(matches!(result, Err(PlanetError::Geometry(_))));
    }

    #[test]
    fn test_baseline_from_top_tiles() {
        let west = vec![
            Point::query(0.0, -10.0, 10).unwrap().with_alt(-50.0),
            Point::query(0.0, -20.0, 10).unwrap().with_alt(20.0),
        ];
        let east = vec![Point::query(0.0, 10.0, 10).unwrap().with_alt(75.0)];
        let baseline = MapTileElevations::from_top_tiles(&[west.as_slice(), east.as_slice()]);
        assert_eq!(baseline, MapTileElevations::new(-50.0, 75.0));
        assert_eq!(baseline.range(), 125.0);
        assert_eq!(MapTileElevations::from_points(&[]), MapTileElevations::new(0.0, 0.0));
    }

    #[test]
    fn test_relative_path() {
        let key = MapTileKey::new(3, 5, 2, 3.0);
        let baseline = Arc::new(MapTileElevations::new(0.0, 255.0));
        let tile = MapTile::from_points(key, gradient_points(&key), baseline, &ColorMap::lefebvre2()).unwrap();
        assert_eq!(tile.relative_path(Path::new("web/tiles")), PathBuf::from("web/tiles/3/5/2.png"));
    }

    #[test]
    fn test_write_png_creates_directories() {
        let root = std::env::temp_dir().join(format!("fractal_planet_map_tile_{}", std::process::id()));
        let key = MapTileKey::new(1, 3, 1, 3.0);
        let baseline = Arc::new(MapTileElevations::new(0.0, 255.0));
        let tile = MapTile::from_points(key, gradient_points(&key), baseline, &ColorMap::lefebvre2()).unwrap();

        let path = tile.write_png(&root).unwrap();
        assert_eq!(path, root.join("1/3/1.png"));
        assert_eq!(std::fs::read(&path).unwrap(), tile.png_bytes());
        std::fs::remove_dir_all(&root).unwrap();
    }
}
