//! Core data structures for the voxel world
//! Contains blocks and their definitions, biomes, chunks, coordinate coding
//! and the block iterator.

pub mod biome;
pub mod block;
pub mod block_def;
pub mod chunk;
pub mod coords;
pub mod iterator;
pub mod vertex;

// Re-export commonly used types
pub use biome::Biome;
pub use block::{Block, BlockType};
pub use block_def::{BlockDefinition, BlockRegistry};
pub use chunk::{Chunk, ChunkCoords, ChunkState, Direction};
pub use iterator::{BlockFace, BlockIterator};
pub use vertex::{ChunkMesh, Vertex};
