//! Writes a seed's tile pyramid to disk as `<z>/<x>/<y>.png`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::WriterConfig;
use crate::error::{PlanetError, Result};
use crate::service::TileService;
use crate::tiles::{MapTile, MapTileKey};

/// Deepest pyramid the writer accepts.
pub const MAX_PYRAMID_DEPTH: i32 = 20;

/// Totals for one pyramid run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub tiles: usize,
    pub bytes: u64,
}

pub struct TileWriter {
    service: TileService,
    config: WriterConfig,
}

impl TileWriter {
    pub fn new(service: TileService, config: WriterConfig) -> Self {
        Self { service, config }
    }

    pub fn out_dir(&self) -> &Path {
        Path::new(&self.config.out_dir)
    }

    /// Render and write every tile of zoom levels `0..=depth`.
    ///
    /// At most `max_concurrent_tiles` tiles are in flight. The first failure
    /// stops the run and cancels outstanding tiles.
    pub async fn write_pyramid(&self, seed: f64, depth: i32) -> Result<WriteSummary> {
        if !(0..=MAX_PYRAMID_DEPTH).contains(&depth) {
            return Err(PlanetError::InvalidDepth {
                depth,
                max: MAX_PYRAMID_DEPTH,
            });
        }
        if !seed.is_finite() {
            return Err(PlanetError::InvalidSeed(seed.to_string()));
        }

        let root = Arc::new(PathBuf::from(&self.config.out_dir));
        let limit = self.config.max_concurrent_tiles.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut running = JoinSet::new();
        let mut summary = WriteSummary::default();

        info!(seed, depth, out_dir = %root.display(), "writing tile pyramid");
        for z in 0..=depth {
            for x in 0..MapTileKey::columns(z) as i32 {
                for y in 0..MapTileKey::rows(z) as i32 {
                    let permit = Arc::clone(&semaphore)
                        .acquire_owned()
                        .await
                        .map_err(|e| PlanetError::Aborted(e.to_string()))?;
                    let service = self.service.clone();
                    let root = Arc::clone(&root);
                    running.spawn(async move {
                        let _permit = permit;
                        let tile = service.get_tile(seed, z, x, y).await?;
                        write_tile(&root, &tile).await
                    });

                    // Keep finished handles from piling up on large pyramids.
                    while running.len() > limit * 2 {
                        if let Some(joined) = running.join_next().await {
                            summary.bytes += joined.map_err(|e| PlanetError::Aborted(e.to_string()))??;
                            summary.tiles += 1;
                        }
                    }
                }
            }
        }

        while let Some(joined) = running.join_next().await {
            summary.bytes += joined.map_err(|e| PlanetError::Aborted(e.to_string()))??;
            summary.tiles += 1;
        }
        info!(tiles = summary.tiles, bytes = summary.bytes, "tile pyramid written");
        Ok(summary)
    }
}

/// Write one tile below `root`, returning the number of bytes written.
pub async fn write_tile(root: &Path, tile: &MapTile) -> Result<u64> {
    let path = tile.relative_path(root);
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&path, tile.png_bytes()).await?;
    debug!(path = %path.display(), "wrote tile");
    Ok(tile.png_bytes().len() as u64)
}
