//! Error type shared by every stage of elevation and tile generation.

use thiserror::Error;

/// Errors produced while building planets, querying elevations and rendering tiles.
///
/// The type is `Clone` so that a single failed cache computation can be handed
/// to every caller waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanetError {
    #[error("Invalid coordinate: lat {lat}, lon {lon}")]
    Coordinate { lat: f64, lon: f64 },
    #[error("Illegal resolution encountered: {0}; must be a positive and non-zero integer")]
    InvalidResolution(u32),
    #[error("Geometry invariant violated: {0}")]
    Geometry(String),
    #[error("Invalid tile request: {z}/{x}/{y}")]
    InvalidTileKey { z: i32, x: i32, y: i32 },
    #[error("Seed must be a finite number, got '{0}'")]
    InvalidSeed(String),
    #[error("Tile depth between 0 and {max} expected, but was {depth}")]
    InvalidDepth { depth: i32, max: i32 },
    #[error("Image encoding error: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Computation aborted: {0}")]
    Aborted(String),
}

impl PlanetError {
    /// True when the error was caused by caller input rather than an internal failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlanetError::Coordinate { .. }
                | PlanetError::InvalidResolution(_)
                | PlanetError::InvalidTileKey { .. }
                | PlanetError::InvalidSeed(_)
                | PlanetError::InvalidDepth { .. }
        )
    }
}

impl From<std::io::Error> for PlanetError {
    fn from(e: std::io::Error) -> Self {
        PlanetError::Io(e.to_string())
    }
}

impl From<image::ImageError> for PlanetError {
    fn from(e: image::ImageError) -> Self {
        PlanetError::Encode(e.to_string())
    }
}

impl From<serde_json::Error> for PlanetError {
    fn from(e: serde_json::Error) -> Self {
        PlanetError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanetError>;
