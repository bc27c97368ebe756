//! Headless world driver
//!
//! Streams a world around a camera flying along +X, logs the world's
//! bookkeeping as it goes, then digs the block under the camera and saves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use glam::Vec3;

use minerust_world::utils::settings;
use minerust_world::world::{FlatTerrain, TerrainGenerator, TerrainSource};
use minerust_world::{BlockRegistry, BlockType, DiskStorage, WorkerPool, World, WorldSettings};

const TICK_INTERVAL: Duration = Duration::from_millis(16);
const STATS_EVERY: u64 = 60;
const CAMERA_HEIGHT: f32 = 100.0;
const DIG_REACH: f32 = 128.0;

/// Stream a voxel world without a window
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed (overrides the settings file)
    #[arg(long)]
    seed: Option<u32>,

    /// Number of world ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Camera speed along +X in blocks per tick
    #[arg(long, default_value_t = 0.5)]
    speed: f32,

    /// Directory for chunk save files
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Bincode world settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Bincode block definition list (defaults to the built-in table)
    #[arg(long)]
    blocks: Option<PathBuf>,

    /// Use a flat world instead of noise terrain
    #[arg(long, default_value_t = false)]
    flat: bool,

    /// Worker thread count (0 picks from the core count)
    #[arg(long)]
    workers: Option<usize>,
}

fn default_save_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "minerust", "minerust-world").map(|dirs| dirs.data_dir().join("saves"))
}

fn resolve_settings(args: &Args) -> WorldSettings {
    let mut world_settings = match &args.settings {
        Some(path) => settings::load_or_default(path),
        None => WorldSettings::default(),
    };
    if let Some(seed) = args.seed {
        world_settings.seed = seed;
    }
    if let Some(workers) = args.workers {
        world_settings.worker_threads = workers;
    }
    match &args.save_dir {
        Some(dir) => world_settings.save_dir = dir.clone(),
        None if args.settings.is_none() => {
            if let Some(dir) = default_save_dir() {
                world_settings.save_dir = dir;
            }
        }
        None => {}
    }
    world_settings
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let world_settings = resolve_settings(&args);
    tracing::info!(
        "Starting world: seed {}, saves in {:?}",
        world_settings.seed,
        world_settings.save_dir
    );

    let registry = match &args.blocks {
        Some(path) => BlockRegistry::load(path)
            .with_context(|| format!("Failed to load block definitions from {:?}", path))?,
        None => BlockRegistry::standard(),
    };
    let registry = Arc::new(registry);
    let terrain: Arc<dyn TerrainSource> = if args.flat {
        Arc::new(FlatTerrain::default())
    } else {
        Arc::new(TerrainGenerator::new(world_settings.seed))
    };
    let storage = Arc::new(DiskStorage::new(&world_settings.save_dir));
    let pool = WorkerPool::new(world_settings.resolved_worker_threads())
        .context("Failed to start chunk job workers")?;

    let mut world = World::new(world_settings, registry, terrain, storage, pool);
    let mut camera = Vec3::new(16.0, 16.0, CAMERA_HEIGHT);

    for tick in 0..args.ticks {
        world
            .update(camera)
            .with_context(|| format!("World tick {} failed", tick))?;
        camera.x += args.speed;

        if tick % STATS_EVERY == 0 {
            let stats = world.stats();
            tracing::info!(
                "tick {}: {} active, {} generating, {} loading, {} saving, {} dirty light, {} mesh vertices",
                tick,
                stats.active_chunks,
                stats.generating + stats.queued_generate,
                stats.loading + stats.queued_load,
                stats.saving + stats.queued_save,
                stats.dirty_light,
                stats.mesh_vertices
            );
        }
        std::thread::sleep(TICK_INTERVAL);
    }

    match world.raycast(camera, Vec3::NEG_Z, DIG_REACH) {
        Some(hit) => {
            if let Some(global) = hit.block.global_coords() {
                let dug = world.block_type_at(global);
                world.set_block_type(global, BlockType::Air);
                tracing::info!("Dug {:?} at {} ({:.1} blocks below the camera)", dug, global, hit.distance);
            }
        }
        None => tracing::info!("Nothing under the camera to dig"),
    }

    let written = world.flush_all().context("Failed to save the world")?;
    tracing::info!("Saved {} chunks, shutting down", written);
    Ok(())
}
