//! Configuration for planet generation, tile rendering and caching
//!
//! Every section has defaults, so a JSON file only needs to name the values
//! it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlanetError, Result};

/// Midpoint displacement weights.
///
/// The defaults reproduce the reference elevations; changing any of them
/// produces a different planet for the same seed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementParams {
    /// Weight of the altitude-difference term
    pub alt_weight: f64,
    /// Exponent applied to the absolute altitude difference
    pub alt_pow: f64,
    /// Weight of the edge-length term
    pub length_weight: f64,
    /// Exponent applied to the edge length
    pub length_pow: f64,
}

impl Default for DisplacementParams {
    fn default() -> Self {
        Self {
            alt_weight: 0.45,
            alt_pow: 1.0,
            length_weight: 0.65,
            length_pow: 0.47,
        }
    }
}

impl DisplacementParams {
    /// The older, flatter variant with a much smaller edge-length weight.
    pub fn subdued() -> Self {
        Self {
            length_weight: 0.035,
            ..Default::default()
        }
    }
}

/// Point sampling strategy used to fill a tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerKind {
    /// One query point per pixel on the geographic grid
    #[default]
    Geographic,
    /// Pixels share the elevation of the hexagonal cell containing them
    Hex { cell_size_meters: u32 },
}

/// Tile rendering settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Multiplier applied to the pixel width before rounding up to a resolution
    pub resolution_safety_factor: f64,
    pub sampler: SamplerKind,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            resolution_safety_factor: 0.6,
            sampler: SamplerKind::Geographic,
        }
    }
}

/// When cached entries stop being served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expiry {
    #[default]
    Never,
    /// Entry expires `secs` after it was last read
    AfterAccess { secs: u64 },
    /// Entry expires `secs` after it was computed
    AfterWrite { secs: u64 },
}

impl Expiry {
    pub fn after_access(duration: Duration) -> Self {
        Expiry::AfterAccess { secs: duration.as_secs() }
    }

    pub fn after_write(duration: Duration) -> Self {
        Expiry::AfterWrite { secs: duration.as_secs() }
    }
}

/// Size and lifetime bounds of one cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub max_entries: usize,
    #[serde(default)]
    pub expiry: Expiry,
}

impl CachePolicy {
    pub fn new(max_entries: usize, expiry: Expiry) -> Self {
        Self { max_entries, expiry }
    }
}

/// Bounds for the planet, baseline and tile caches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub planets: CachePolicy,
    pub baselines: CachePolicy,
    pub tiles: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let hour = Duration::from_secs(60 * 60);
        Self {
            planets: CachePolicy::new(10_000, Expiry::after_access(hour)),
            baselines: CachePolicy::new(10_000, Expiry::after_write(hour)),
            tiles: CachePolicy::new(2_048, Expiry::after_write(hour)),
        }
    }
}

/// Settings for writing a full tile pyramid to disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub out_dir: String,
    /// Maximum number of tiles rendered at the same time
    pub max_concurrent_tiles: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            out_dir: "web/tiles".to_string(),
            max_concurrent_tiles: 8,
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlanetConfig {
    pub displacement: DisplacementParams,
    pub tiles: TileConfig,
    pub cache: CacheConfig,
    pub writer: WriterConfig,
}

impl PlanetConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlanetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject settings that would make generation or caching impossible.
    pub fn validate(&self) -> Result<()> {
        let factor = self.tiles.resolution_safety_factor;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(PlanetError::Config(format!(
                "resolution_safety_factor must be positive, got {}",
                factor
            )));
        }
        if let SamplerKind::Hex { cell_size_meters: 0 } = self.tiles.sampler {
            return Err(PlanetError::Config("hex cell_size_meters must be positive".to_string()));
        }
        for (name, policy) in [
            ("planets", self.cache.planets),
            ("baselines", self.cache.baselines),
            ("tiles", self.cache.tiles),
        ] {
            if policy.max_entries == 0 {
                return Err(PlanetError::Config(format!("{} cache needs at least one entry", name)));
            }
        }
        if self.writer.max_concurrent_tiles == 0 {
            return Err(PlanetError::Config("max_concurrent_tiles must be at least 1".to_string()));
        }
        let d = &self.displacement;
        if ![d.alt_weight, d.alt_pow, d.length_weight, d.length_pow].iter().all(|v| v.is_finite()) {
            return Err(PlanetError::Config("displacement parameters must be finite".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PlanetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlanetConfig::from_json_str(r#"{"tiles": {"resolution_safety_factor": 0.8}}"#).unwrap();
        assert_eq!(config.tiles.resolution_safety_factor, 0.8);
        assert_eq!(config.tiles.sampler, SamplerKind::Geographic);
        assert_eq!(config.displacement, DisplacementParams::default());
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_tagged_enums_parse() {
        let json = r#"{
            "tiles": {"sampler": {"kind": "hex", "cell_size_meters": 5000}},
            "cache": {"tiles": {"max_entries": 16, "expiry": {"kind": "after_access", "secs": 30}}}
        }"#;
        let config = PlanetConfig::from_json_str(json).unwrap();
        assert_eq!(config.tiles.sampler, SamplerKind::Hex { cell_size_meters: 5000 });
        assert_eq!(config.cache.tiles, CachePolicy::new(16, Expiry::AfterAccess { secs: 30 }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PlanetConfig::from_json_str(r#"{"tiles": {"resolution_safety_factor": 0.0}}"#).is_err());
        assert!(PlanetConfig::from_json_str(r#"{"writer": {"max_concurrent_tiles": 0}}"#).is_err());
        assert!(PlanetConfig::from_json_str(r#"{"cache": {"planets": {"max_entries": 0}}}"#).is_err());
        assert!(PlanetConfig::from_json_str(r#"{"tiles": {"sampler": {"kind": "hex", "cell_size_meters": 0}}}"#).is_err());
        assert!(matches!(PlanetConfig::from_json_str("not json"), Err(PlanetError::Config(_))));
    }

    #[test]
    fn test_subdued_variant() {
        let params = DisplacementParams::subdued();
        assert_eq!(params.length_weight, 0.035);
        assert_eq!(params.alt_weight, 0.45);
    }
}
