//! Profiling tool comparing tile sampling strategies

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use fractal_planet::tiles::{GeographicSampler, HexCellSampler, MapTileKey, TileSampler};
use fractal_planet::{init_logging, Planet, Point, Result};

const SEEDS: usize = 3;
const POINTS_PER_BATCH: usize = 65_536;

fn time_sampler(sampler: &dyn TileSampler, planet: &Planet, keys: &[MapTileKey]) -> Result<Duration> {
    let start = Instant::now();
    for key in keys {
        sampler.sample(planet, key)?;
    }
    Ok(start.elapsed())
}

fn main() -> Result<()> {
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(1337);

    let keys: Vec<MapTileKey> = (0..=3)
        .map(|z| {
            let x = rng.gen_range(0..MapTileKey::columns(z)) as i32;
            let y = rng.gen_range(0..MapTileKey::rows(z)) as i32;
            MapTileKey::new(z, x, y, 0.0)
        })
        .collect();

    let geographic = GeographicSampler::default();
    let hex = HexCellSampler::new(25_000);

    println!("=== Tile Sampling Profile ===");
    println!("Tiles per seed: {}", keys.len());
    println!();

    let mut geographic_total = Duration::ZERO;
    let mut hex_total = Duration::ZERO;
    let mut batch_total = Duration::ZERO;

    for _ in 0..SEEDS {
        let seed = rng.gen_range(0..1_000_000) as f64;
        let planet = Planet::new(seed)?;
        let seeded: Vec<MapTileKey> = keys.iter().map(|k| MapTileKey::new(k.z, k.x, k.y, seed)).collect();

        let geographic_time = time_sampler(&geographic, &planet, &seeded)?;
        let hex_time = time_sampler(&hex, &planet, &seeded)?;

        // Independent batches share nothing but the planet.
        let mut batches: Vec<Vec<Point>> = (0..rayon::current_num_threads())
            .map(|_| {
                (0..POINTS_PER_BATCH / rayon::current_num_threads().max(1))
                    .map(|_| Point::query(rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..=180.0), 1_000))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let start = Instant::now();
        batches.par_iter_mut().for_each(|batch| planet.multiple_elevations(batch));
        let batch_time = start.elapsed();

        println!("Seed {:>8}: geographic {:?} | hex {:?} | parallel batch {:?}", seed, geographic_time, hex_time, batch_time);
        geographic_total += geographic_time;
        hex_total += hex_time;
        batch_total += batch_time;
    }

    let tiles = (SEEDS * keys.len()) as u32;
    println!("\n=== Summary ===");
    println!("Geographic sampler: {:?} per tile", geographic_total / tiles);
    println!("Hex sampler:        {:?} per tile", hex_total / tiles);
    println!("Parallel batch:     {:?} per {} points", batch_total / SEEDS as u32, POINTS_PER_BATCH);
    Ok(())
}
