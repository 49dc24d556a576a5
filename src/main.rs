use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use fractal_planet::{init_logging, Planet, PlanetConfig, Result, TileService, TileWriter};

#[derive(Parser, Debug)]
#[command(name = "fractal_planet")]
#[command(about = "Generate deterministic fractal planets and their map tiles")]
struct Args {
    /// JSON configuration file (defaults are used for anything it omits)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the elevation at one coordinate
    Elevation {
        /// Planet seed (uses random seed if not specified)
        #[arg(short, long, allow_hyphen_values = true)]
        seed: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Edge length in meters at which subdivision stops
        #[arg(short, long, default_value = "10")]
        resolution: u32,
    },
    /// Render a single tile to a PNG file
    Tile {
        /// Planet seed (uses random seed if not specified)
        #[arg(short, long, allow_hyphen_values = true)]
        seed: Option<f64>,

        z: i32,
        x: i32,
        y: i32,

        /// Output PNG path (default: <out_dir>/<z>/<x>/<y>.png)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Render every tile down to a zoom level into <out-dir>/<z>/<x>/<y>.png
    Pyramid {
        /// Planet seed (uses random seed if not specified)
        #[arg(short, long, allow_hyphen_values = true)]
        seed: Option<f64>,

        /// Deepest zoom level to write
        #[arg(short, long, default_value = "2")]
        depth: i32,

        /// Overrides the configured output directory
        #[arg(short, long)]
        out_dir: Option<String>,
    },
}

fn seed_or_random(seed: Option<f64>) -> f64 {
    seed.unwrap_or_else(|| rand::random::<u32>() as f64)
}

fn load_config(path: Option<&PathBuf>) -> Result<PlanetConfig> {
    match path {
        Some(path) => PlanetConfig::from_json_file(path),
        None => Ok(PlanetConfig::default()),
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Elevation {
            seed,
            lat,
            lon,
            resolution,
        } => {
            let seed = seed_or_random(seed);
            let planet = Planet::with_params(seed, config.displacement)?;
            let point = planet.elevation_at(lat, lon, resolution)?;
            println!("Seed: {}", seed);
            println!("Elevation at ({}, {}) @ {}m: {:.3}m", lat, lon, resolution, point.alt);
        }
        Command::Tile { seed, z, x, y, out } => {
            let seed = seed_or_random(seed);
            let out_dir = PathBuf::from(&config.writer.out_dir);
            let service = TileService::new(config)?;
            let tile = service.get_tile(seed, z, x, y).await?;
            let path = match out {
                Some(path) => {
                    tokio::fs::write(&path, tile.png_bytes()).await?;
                    path
                }
                None => tile.write_png(&out_dir)?,
            };
            println!("Seed: {}", seed);
            println!(
                "Tile {}/{}/{}: {:.1}m to {:.1}m (baseline {:.1}m to {:.1}m)",
                z,
                x,
                y,
                tile.min_elevation(),
                tile.max_elevation(),
                tile.baseline().min_elevation,
                tile.baseline().max_elevation
            );
            println!("Wrote {}", path.display());
        }
        Command::Pyramid { seed, depth, out_dir } => {
            let seed = seed_or_random(seed);
            let mut writer_config = config.writer.clone();
            if let Some(out_dir) = out_dir {
                writer_config.out_dir = out_dir;
            }
            let service = TileService::new(config)?;
            let writer = TileWriter::new(service.clone(), writer_config);
            let summary = writer.write_pyramid(seed, depth).await?;
            println!("Seed: {}", seed);
            println!(
                "Wrote {} tiles ({:.1} MB) to {}",
                summary.tiles,
                summary.bytes as f64 / (1024.0 * 1024.0),
                writer.out_dir().display()
            );
            println!("{}", service.stats().summary());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
