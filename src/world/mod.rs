//! World streaming, generation, lighting and queries
//! Contains the active chunk arena, the job plumbing that fills chunks in
//! the background, and the `World` that ties them together.

pub mod active;
pub mod generator;
pub mod jobs;
pub mod lighting;
pub mod mesh;
pub mod raycast;
pub mod spline;
pub mod stamps;
pub mod streaming;

// Re-export commonly used types
pub use active::ActiveChunks;
pub use generator::{BlockPlacement, FlatTerrain, TerrainGenerator, TerrainSource};
pub use jobs::{ChunkJob, InlineJobs, JobContext, JobKind, JobResult, JobSystem, WorkerPool};
pub use lighting::LightingPropagator;
pub use raycast::RaycastHit;
pub use streaming::{World, WorldStats};
