use std::sync::atomic::{AtomicU8, Ordering};

use glam::{IVec2, IVec3};

use crate::constants::*;
use crate::core::block::{Block, BlockType};
use crate::core::block_def::BlockRegistry;
use crate::core::coords;
use crate::core::vertex::ChunkMesh;

/// Horizontal chunk coordinate. There is no vertical chunking.
pub type ChunkCoords = IVec2;

/// Horizontal neighbor direction. North is +Y, east is +X.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, 1),
            Direction::South => IVec2::new(0, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Chunk lifecycle.
///
/// The main thread writes `Constructing`, the `Queued*` states and `Active`.
/// A background job writes the `*ing` / `*Complete` pair for the chunk it owns.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChunkState {
    Constructing = 0,
    QueuedLoad,
    Loading,
    LoadComplete,
    QueuedGenerate,
    Generating,
    GenerateComplete,
    Active,
    QueuedSave,
    Saving,
    SaveComplete,
}

impl ChunkState {
    fn from_u8(value: u8) -> ChunkState {
        match value {
            0 => ChunkState::Constructing,
            1 => ChunkState::QueuedLoad,
            2 => ChunkState::Loading,
            3 => ChunkState::LoadComplete,
            4 => ChunkState::QueuedGenerate,
            5 => ChunkState::Generating,
            6 => ChunkState::GenerateComplete,
            7 => ChunkState::Active,
            8 => ChunkState::QueuedSave,
            9 => ChunkState::Saving,
            10 => ChunkState::SaveComplete,
            // Only `AtomicChunkState::store` writes the byte
            _ => unreachable!("invalid chunk state byte {}", value),
        }
    }
}

/// Lifecycle state shared between the main thread and a job worker.
///
/// Stores use `Release` and loads use `Acquire`, so a thread that observes
/// `GenerateComplete` also observes every voxel write made before it.
#[derive(Debug)]
pub struct AtomicChunkState(AtomicU8);

impl AtomicChunkState {
    pub fn new(state: ChunkState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> ChunkState {
        ChunkState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, state: ChunkState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

pub struct Chunk {
    coords: ChunkCoords,
    blocks: Box<[Block]>,
    neighbors: [Option<ChunkCoords>; 4],
    mesh_dirty: bool,
    needs_saving: bool,
    state: AtomicChunkState,
    mesh: Option<ChunkMesh>,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("coords", &self.coords)
            .field("state", &self.state())
            .field("mesh_dirty", &self.mesh_dirty)
            .field("needs_saving", &self.needs_saving)
            .finish_non_exhaustive()
    }
}

impl Chunk {
    pub fn new(coords: ChunkCoords) -> Self {
        Chunk {
            coords,
            blocks: vec![Block::default(); CHUNK_BLOCK_COUNT].into_boxed_slice(),
            neighbors: [None; 4],
            mesh_dirty: true,
            needs_saving: false,
            state: AtomicChunkState::new(ChunkState::Constructing),
            mesh: None,
        }
    }

    #[inline]
    pub fn coords(&self) -> ChunkCoords {
        self.coords
    }

    #[inline]
    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    #[inline]
    pub fn block_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn block_at(&self, local: IVec3) -> Option<&Block> {
        coords::is_local_in_bounds(local).then(|| &self.blocks[coords::block_index_of(local)])
    }

    pub fn block_type_at(&self, local: IVec3) -> Option<BlockType> {
        self.block_at(local).map(Block::block_type)
    }

    /// Overwrite a type during population. Does not touch dirty or save flags.
    pub fn set_generated_type(&mut self, local: IVec3, block_type: BlockType, registry: &BlockRegistry) {
        if coords::is_local_in_bounds(local) {
            self.blocks[coords::block_index_of(local)].set_type(block_type, registry);
        }
    }

    /// Replace every voxel from a decoded type array in index order.
    pub fn fill_from_types(&mut self, types: &[BlockType], registry: &BlockRegistry) {
        for (block, block_type) in self.blocks.iter_mut().zip(types) {
            *block = Block::new(*block_type, registry);
        }
    }

    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<ChunkCoords> {
        self.neighbors[direction.slot()]
    }

    pub(crate) fn set_neighbor(&mut self, direction: Direction, neighbor: Option<ChunkCoords>) {
        self.neighbors[direction.slot()] = neighbor;
    }

    pub fn has_all_neighbors(&self) -> bool {
        self.neighbors.iter().all(Option::is_some)
    }

    #[inline]
    pub fn is_mesh_dirty(&self) -> bool {
        self.mesh_dirty
    }

    #[inline]
    pub fn set_mesh_dirty(&mut self, dirty: bool) {
        self.mesh_dirty = dirty;
    }

    #[inline]
    pub fn needs_saving(&self) -> bool {
        self.needs_saving
    }

    #[inline]
    pub fn set_needs_saving(&mut self, needs_saving: bool) {
        self.needs_saving = needs_saving;
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state.load()
    }

    #[inline]
    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state);
    }

    pub fn mesh(&self) -> Option<&ChunkMesh> {
        self.mesh.as_ref()
    }

    pub fn set_mesh(&mut self, mesh: ChunkMesh) {
        self.mesh = Some(mesh);
        self.mesh_dirty = false;
    }
}
