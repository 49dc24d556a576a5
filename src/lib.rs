//! Fractal planet generation library
//!
//! A seed determines a tetrahedral mesh around the globe whose recursive
//! midpoint displacement yields terrain elevation at any resolution. On top of
//! that sit geographic map tiles, a shared color baseline per seed and
//! single-flight caches for serving them.

pub mod cache;
pub mod colormap;
pub mod config;
pub mod error;
pub mod geo;
pub mod planet;
pub mod point;
pub mod seeds;
pub mod service;
pub mod tetrahedron;
pub mod tiles;
pub mod writer;

pub use config::PlanetConfig;
pub use error::{PlanetError, Result};
pub use planet::Planet;
pub use point::Point;
pub use service::TileService;
pub use tetrahedron::Tetrahedron;
pub use tiles::{MapTile, MapTileElevations, MapTileKey};
pub use writer::TileWriter;

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `tracing` subscriber for the binaries. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}
