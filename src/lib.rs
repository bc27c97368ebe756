// Core module with blocks, chunks and coordinates
pub mod core;

// World module with streaming, generation and lighting
pub mod world;

// Other modules
pub mod constants;
pub mod error;
pub mod save;
pub mod utils;

// Re-exports
pub use constants::*;
pub use core::{Block, BlockRegistry, BlockType, Chunk, ChunkCoords, ChunkState};
pub use error::{ChunkFileError, RegistryError, SettingsError, WorldError};
pub use save::{ChunkStorage, DiskStorage, MemoryStorage};
pub use utils::settings::WorldSettings;
pub use world::{InlineJobs, RaycastHit, TerrainGenerator, World, WorkerPool, WorldStats};
