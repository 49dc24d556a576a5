//! Geographic tiles: addressing, sampling and rendering

pub mod bounds;
pub mod key;
pub mod map_tile;
pub mod sampler;

pub use bounds::MapTileBounds;
pub use key::{MapTileKey, MAX_ZOOM};
pub use map_tile::{MapTile, MapTileElevations};
pub use sampler::{sampler_for, GeographicSampler, HexCellSampler, TileSampler};

/// Width and height of every tile in pixels.
pub const TILE_SIZE: usize = 256;
