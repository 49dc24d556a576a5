//! Tile serving context
//!
//! `TileService` owns the planet, baseline and tile caches. A tile is only
//! ever rendered after its seed's baseline exists, and the baseline is built
//! from both zoom-0 tiles, so every tile of a seed shares one color scale.

use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, info};

use crate::cache::{AsyncCache, CacheStats};
use crate::colormap::ColorMap;
use crate::config::PlanetConfig;
use crate::error::{PlanetError, Result};
use crate::planet::Planet;
use crate::seeds::SeedKey;
use crate::tiles::{sampler_for, MapTile, MapTileElevations, MapTileKey, TileSampler};

/// Snapshot of all three caches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub planets: CacheStats,
    pub baselines: CacheStats,
    pub tiles: CacheStats,
}

impl ServiceStats {
    pub fn summary(&self) -> String {
        format!(
            "planets [{}]\nbaselines [{}]\ntiles [{}]",
            self.planets.summary(),
            self.baselines.summary(),
            self.tiles.summary()
        )
    }
}

/// Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct TileService {
    config: PlanetConfig,
    planets: AsyncCache<SeedKey, Arc<Planet>>,
    baselines: AsyncCache<SeedKey, Arc<MapTileElevations>>,
    tiles: AsyncCache<MapTileKey, Arc<MapTile>>,
    sampler: Arc<dyn TileSampler>,
    colormap: Arc<ColorMap>,
}

fn aborted(e: JoinError) -> PlanetError {
    PlanetError::Aborted(e.to_string())
}

impl TileService {
    pub fn new(config: PlanetConfig) -> Result<Self> {
        config.validate()?;
        let sampler: Arc<dyn TileSampler> =
            Arc::from(sampler_for(config.tiles.sampler, config.tiles.resolution_safety_factor));
        info!(sampler = sampler.name(), "tile service ready");
        Ok(Self {
            planets: AsyncCache::new("planets", config.cache.planets),
            baselines: AsyncCache::new("baselines", config.cache.baselines),
            tiles: AsyncCache::new("tiles", config.cache.tiles),
            sampler,
            colormap: Arc::new(ColorMap::lefebvre2()),
            config,
        })
    }

    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    pub fn sampler(&self) -> &dyn TileSampler {
        self.sampler.as_ref()
    }

    /// Parse a seed from request text. Only finite numbers are seeds.
    pub fn parse_seed(text: &str) -> Result<f64> {
        let seed: f64 = text
            .trim()
            .parse()
            .map_err(|_| PlanetError::InvalidSeed(text.to_string()))?;
        if !seed.is_finite() {
            return Err(PlanetError::InvalidSeed(text.to_string()));
        }
        Ok(seed)
    }

    pub async fn get_planet(&self, seed: f64) -> Result<Arc<Planet>> {
        if !seed.is_finite() {
            return Err(PlanetError::InvalidSeed(seed.to_string()));
        }
        let params = self.config.displacement;
        self.planets
            .get_or_compute(SeedKey::from(seed), move || async move {
                tokio::task::spawn_blocking(move || Planet::with_params(seed, params).map(Arc::new))
                    .await
                    .map_err(aborted)?
            })
            .await
    }

    /// The seed's color baseline, rendering and caching both zoom-0 tiles on
    /// first use.
    pub async fn get_baseline(&self, seed: f64) -> Result<Arc<MapTileElevations>> {
        let planet = self.get_planet(seed).await?;
        let sampler = Arc::clone(&self.sampler);
        let colormap = Arc::clone(&self.colormap);
        let tiles = self.tiles.clone();

        self.baselines
            .get_or_compute(SeedKey::from(seed), move || async move {
                let (baseline, top_tiles) =
                    tokio::task::spawn_blocking(move || render_top_tiles(&planet, sampler.as_ref(), &colormap))
                        .await
                        .map_err(aborted)??;
                for tile in top_tiles {
                    tiles.insert(*tile.key(), tile);
                }
                info!(
                    seed,
                    min = baseline.min_elevation,
                    max = baseline.max_elevation,
                    "elevation baseline computed"
                );
                Ok(baseline)
            })
            .await
    }

    pub async fn get_tile(&self, seed: f64, z: i32, x: i32, y: i32) -> Result<Arc<MapTile>> {
        self.get_tile_by_key(MapTileKey::new(z, x, y, seed)).await
    }

    pub async fn get_tile_by_key(&self, key: MapTileKey) -> Result<Arc<MapTile>> {
        let key = key.validate()?;
        if !key.seed.is_finite() {
            return Err(PlanetError::InvalidSeed(key.seed.to_string()));
        }

        // The baseline must exist before any tile of this seed is colored.
        let baseline = self.get_baseline(key.seed).await?;
        let planet = self.get_planet(key.seed).await?;
        let sampler = Arc::clone(&self.sampler);
        let colormap = Arc::clone(&self.colormap);

        self.tiles
            .get_or_compute(key, move || async move {
                tokio::task::spawn_blocking(move || {
                    debug!(tile = %key, sampler = sampler.name(), "rendering tile");
                    let points = sampler.sample(&planet, &key)?;
                    MapTile::from_points(key, points, baseline, &colormap).map(Arc::new)
                })
                .await
                .map_err(aborted)?
            })
            .await
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            planets: self.planets.stats(),
            baselines: self.baselines.stats(),
            tiles: self.tiles.stats(),
        }
    }
}

/// Render the two zoom-0 tiles in parallel and derive the baseline from them.
fn render_top_tiles(
    planet: &Planet,
    sampler: &dyn TileSampler,
    colormap: &ColorMap,
) -> Result<(Arc<MapTileElevations>, Vec<Arc<MapTile>>)> {
    let [west_key, east_key] = MapTileKey::top_keys(planet.seed());
    let (west, east) = rayon::join(|| sampler.sample(planet, &west_key), || sampler.sample(planet, &east_key));
    let (west, east) = (west?, east?);

    let baseline = Arc::new(MapTileElevations::from_top_tiles(&[west.as_slice(), east.as_slice()]));
    let tiles = vec![
        Arc::new(MapTile::from_points(west_key, west, Arc::clone(&baseline), colormap)?),
        Arc::new(MapTile::from_points(east_key, east, Arc::clone(&baseline), colormap)?),
    ];
    Ok((baseline, tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerKind;

    fn service() -> TileService {
        TileService::new(PlanetConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(TileService::parse_seed("42.5"), Ok(42.5));
        assert_eq!(TileService::parse_seed(" 762391 "), Ok(762391.0));
        assert_eq!(TileService::parse_seed("-7"), Ok(-7.0));
        assert!(matches!(TileService::parse_seed("abc"), Err(PlanetError::InvalidSeed(_))));
        assert!(matches!(TileService::parse_seed("NaN"), Err(PlanetError::InvalidSeed(_))));
        assert!(matches!(TileService::parse_seed("inf"), Err(PlanetError::InvalidSeed(_))));
        assert!(matches!(TileService::parse_seed(""), Err(PlanetError::InvalidSeed(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PlanetConfig::default();
        config.tiles.resolution_safety_factor = 0.0;
        assert!(matches!(TileService::new(config), Err(PlanetError::Config(_))));
    }

    #[tokio::test]
    async fn test_planets_are_shared() {
        let service = service();
        let a = service.get_planet(5.0).await.unwrap();
        let b = service.get_planet(5.0).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(service.stats().planets.computations, 1);
        assert!(matches!(service.get_planet(f64::NAN).await, Err(PlanetError::InvalidSeed(_))));
    }

    #[tokio::test]
    async fn test_invalid_tile_requests_are_client_errors() {
        let service = service();
        let err = service.get_tile(1.0, 0, 2, 0).await.unwrap_err();
        assert_eq!(err, PlanetError::InvalidTileKey { z: 0, x: 2, y: 0 });
        assert!(err.is_client_error());

        let err = service.get_tile(1.0, -1, 0, 0).await.unwrap_err();
        assert!(err.is_client_error());

        let err = service.get_tile(f64::INFINITY, 0, 0, 0).await.unwrap_err();
        assert!(matches!(err, PlanetError::InvalidSeed(_)));
        assert!(err.is_client_error());

        // Rejected before anything was computed.
        assert_eq!(service.stats().planets.computations, 0);
    }

    #[tokio::test]
    async fn test_tiles_share_seed_baseline() {
        let service = service();
        let seed = 31337.0;
        let coarse = service.get_tile(seed, 1, 0, 0).await.unwrap();
        let fine = service.get_tile(seed, 3, 5, 2).await.unwrap();
        let baseline = service.get_baseline(seed).await.unwrap();

        assert!(Arc::ptr_eq(coarse.baseline(), fine.baseline()));
        assert!(Arc::ptr_eq(coarse.baseline(), &baseline));
        assert_eq!(coarse.baseline().as_ref(), fine.baseline().as_ref());
        assert_eq!(service.stats().baselines.computations, 1);
    }

    #[tokio::test]
    async fn test_top_tiles_are_primed_with_baseline() {
        let service = service();
        let seed = 99987.0;
        let baseline = service.get_baseline(seed).await.unwrap();

        let west = service.get_tile(seed, 0, 0, 0).await.unwrap();
        let east = service.get_tile(seed, 0, 1, 0).await.unwrap();
        assert_eq!(service.stats().tiles.computations, 0);
        assert_eq!(*baseline, MapTileElevations::from_tiles(&[west.as_ref(), east.as_ref()]));
        assert!(baseline.min_elevation < 0.0 && baseline.max_elevation > 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_tile_requests_compute_once() {
        let service = service();
        let (a, b) = tokio::join!(
            service.get_tile(762391.0, 2, 1, 1),
            service.get_tile(762391.0, 2, 1, 1)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.png_bytes(), b.png_bytes());
        let stats = service.stats();
        assert_eq!(stats.tiles.computations, 1);
        assert_eq!(stats.baselines.computations, 1);
        assert_eq!(stats.planets.computations, 1);
    }

    #[tokio::test]
    async fn test_separate_services_render_identical_tiles() {
        let one = service().get_tile(762391.0, 2, 1, 1).await.unwrap();
        let two = service().get_tile(762391.0, 2, 1, 1).await.unwrap();
        assert_eq!(one.png_bytes(), two.png_bytes());
        assert_eq!(one.elevations(), two.elevations());
    }

    #[tokio::test]
    async fn test_hex_sampler_service() {
        let mut config = PlanetConfig::default();
        config.tiles.sampler = SamplerKind::Hex { cell_size_meters: 250_000 };
        let service = TileService::new(config).unwrap();
        assert_eq!(service.sampler().name(), "hex");
        let tile = service.get_tile(8.0, 1, 2, 1).await.unwrap();
        assert_eq!(tile.elevations().len(), crate::tiles::TILE_SIZE * crate::tiles::TILE_SIZE);
    }
}
