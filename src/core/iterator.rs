//! Block iterator
//!
//! A cheap `(chunk, index)` cursor over one voxel. Stepping off a chunk's
//! horizontal edge follows that chunk's stored neighbor link, so an iterator
//! walking into an unloaded region simply becomes invalid. Stepping above or
//! below the chunk is always invalid.

use glam::{IVec3, Vec3};

use crate::constants::*;
use crate::core::block::Block;
use crate::core::chunk::{ChunkCoords, Direction};
use crate::core::coords;
use crate::world::active::ActiveChunks;

/// Face of a block, also used as a neighbor direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BlockFace {
    East,
    West,
    North,
    South,
    Top,
    Bottom,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::East,
        BlockFace::West,
        BlockFace::North,
        BlockFace::South,
        BlockFace::Top,
        BlockFace::Bottom,
    ];

    /// Outward unit normal.
    pub fn normal(self) -> IVec3 {
        match self {
            BlockFace::East => IVec3::X,
            BlockFace::West => IVec3::NEG_X,
            BlockFace::North => IVec3::Y,
            BlockFace::South => IVec3::NEG_Y,
            BlockFace::Top => IVec3::Z,
            BlockFace::Bottom => IVec3::NEG_Z,
        }
    }
}

const STEP_Y: usize = 1 << CHUNK_BITS_X;
const STEP_Z: usize = 1 << (CHUNK_BITS_X + CHUNK_BITS_Y);
const FIELD_X: usize = CHUNK_MASK_X as usize;
const FIELD_Y: usize = (CHUNK_MASK_Y as usize) << CHUNK_BITS_X;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BlockIterator {
    chunk: Option<ChunkCoords>,
    index: usize,
}

impl BlockIterator {
    pub const INVALID: BlockIterator = BlockIterator {
        chunk: None,
        index: 0,
    };

    pub fn new(chunk: ChunkCoords, index: usize) -> Self {
        if index >= CHUNK_BLOCK_COUNT {
            return Self::INVALID;
        }
        Self {
            chunk: Some(chunk),
            index,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.chunk.is_some()
    }

    #[inline]
    pub fn chunk_coords(&self) -> Option<ChunkCoords> {
        self.chunk
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn local_coords(&self) -> Option<IVec3> {
        self.chunk.map(|_| coords::local_coords(self.index))
    }

    pub fn block<'a>(&self, chunks: &'a ActiveChunks) -> Option<&'a Block> {
        let chunk = chunks.get(self.chunk?)?;
        Some(chunk.block(self.index))
    }

    pub fn block_mut<'a>(&self, chunks: &'a mut ActiveChunks) -> Option<&'a mut Block> {
        let chunk = chunks.get_mut(self.chunk?)?;
        Some(chunk.block_mut(self.index))
    }

    pub fn global_coords(&self) -> Option<IVec3> {
        self.chunk
            .map(|chunk| coords::global_from_index(chunk, self.index))
    }

    /// Center of the voxel in world space.
    pub fn world_center(&self) -> Option<Vec3> {
        self.global_coords()
            .map(|global| global.as_vec3() + Vec3::splat(0.5))
    }

    pub fn neighbor(&self, face: BlockFace, chunks: &ActiveChunks) -> BlockIterator {
        match face {
            BlockFace::East => self.east(chunks),
            BlockFace::West => self.west(chunks),
            BlockFace::North => self.north(chunks),
            BlockFace::South => self.south(chunks),
            BlockFace::Top => self.up(),
            BlockFace::Bottom => self.down(),
        }
    }

    pub fn east(&self, chunks: &ActiveChunks) -> BlockIterator {
        let Some(chunk) = self.chunk else {
            return Self::INVALID;
        };
        if self.index & FIELD_X == FIELD_X {
            return self.cross(chunks, Direction::East, self.index & !FIELD_X);
        }
        Self::new(chunk, self.index + 1)
    }

    pub fn west(&self, chunks: &ActiveChunks) -> BlockIterator {
        let Some(chunk) = self.chunk else {
            return Self::INVALID;
        };
        if self.index & FIELD_X == 0 {
            return self.cross(chunks, Direction::West, self.index | FIELD_X);
        }
        Self::new(chunk, self.index - 1)
    }

    pub fn north(&self, chunks: &ActiveChunks) -> BlockIterator {
        let Some(chunk) = self.chunk else {
            return Self::INVALID;
        };
        if self.index & FIELD_Y == FIELD_Y {
            return self.cross(chunks, Direction::North, self.index & !FIELD_Y);
        }
        Self::new(chunk, self.index + STEP_Y)
    }

    pub fn south(&self, chunks: &ActiveChunks) -> BlockIterator {
        let Some(chunk) = self.chunk else {
            return Self::INVALID;
        };
        if self.index & FIELD_Y == 0 {
            return self.cross(chunks, Direction::South, self.index | FIELD_Y);
        }
        Self::new(chunk, self.index - STEP_Y)
    }

    pub fn up(&self) -> BlockIterator {
        match self.chunk {
            Some(chunk) if coords::local_z(self.index) < CHUNK_MASK_Z => {
                Self::new(chunk, self.index + STEP_Z)
            }
            _ => Self::INVALID,
        }
    }

    pub fn down(&self) -> BlockIterator {
        match self.chunk {
            Some(chunk) if coords::local_z(self.index) > 0 => Self::new(chunk, self.index - STEP_Z),
            _ => Self::INVALID,
        }
    }

    fn cross(&self, chunks: &ActiveChunks, direction: Direction, index: usize) -> BlockIterator {
        self.chunk
            .and_then(|coords| chunks.get(coords))
            .and_then(|chunk| chunk.neighbor(direction))
            .map_or(Self::INVALID, |neighbor| Self::new(neighbor, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::Chunk;
    use glam::IVec2;

    fn two_chunks() -> ActiveChunks {
        let mut chunks = ActiveChunks::default();
        assert!(chunks.insert(Box::new(Chunk::new(IVec2::new(0, 0)))).is_ok());
        assert!(chunks.insert(Box::new(Chunk::new(IVec2::new(1, 0)))).is_ok());
        chunks
    }

    #[test]
    fn test_moves_inside_chunk() {
        let chunks = ActiveChunks::default();
        let it = BlockIterator::new(IVec2::ZERO, coords::block_index(4, 5, 6));
        assert_eq!(it.east(&chunks).local_coords(), Some(IVec3::new(5, 5, 6)));
        assert_eq!(it.west(&chunks).local_coords(), Some(IVec3::new(3, 5, 6)));
        assert_eq!(it.north(&chunks).local_coords(), Some(IVec3::new(4, 6, 6)));
        assert_eq!(it.south(&chunks).local_coords(), Some(IVec3::new(4, 4, 6)));
        assert_eq!(it.up().local_coords(), Some(IVec3::new(4, 5, 7)));
        assert_eq!(it.down().local_coords(), Some(IVec3::new(4, 5, 5)));
    }

    #[test]
    fn test_crossing_follows_neighbor_links() {
        let chunks = two_chunks();
        let edge = BlockIterator::new(IVec2::ZERO, coords::block_index(CHUNK_MASK_X, 7, 9));
        let across = edge.east(&chunks);
        assert_eq!(across.chunk_coords(), Some(IVec2::new(1, 0)));
        assert_eq!(across.local_coords(), Some(IVec3::new(0, 7, 9)));
        assert_eq!(across.west(&chunks), edge);
        assert_eq!(
            across.global_coords(),
            Some(IVec3::new(CHUNK_SIZE_X, 7, 9))
        );
    }

    #[test]
    fn test_missing_neighbor_is_invalid() {
        let chunks = two_chunks();
        let west_edge = BlockIterator::new(IVec2::ZERO, coords::block_index(0, 3, 3));
        assert!(!west_edge.west(&chunks).is_valid());
        let north_edge = BlockIterator::new(IVec2::ZERO, coords::block_index(3, CHUNK_MASK_Y, 3));
        assert!(!north_edge.north(&chunks).is_valid());
        let south_edge = BlockIterator::new(IVec2::ZERO, coords::block_index(3, 0, 3));
        assert!(!south_edge.south(&chunks).is_valid());
    }

    #[test]
    fn test_vertical_bounds_are_invalid() {
        let top = BlockIterator::new(IVec2::ZERO, coords::block_index(1, 1, CHUNK_MASK_Z));
        assert!(!top.up().is_valid());
        let bottom = BlockIterator::new(IVec2::ZERO, coords::block_index(1, 1, 0));
        assert!(!bottom.down().is_valid());
        assert!(!BlockIterator::INVALID.up().is_valid());
    }

    #[test]
    fn test_world_center_and_faces() {
        let chunks = two_chunks();
        let it = BlockIterator::new(IVec2::new(1, 0), coords::block_index(0, 0, 10));
        assert_eq!(it.world_center(), Some(Vec3::new(32.5, 0.5, 10.5)));
        for face in BlockFace::ALL {
            let next = it.neighbor(face, &chunks);
            if let (Some(a), Some(b)) = (it.global_coords(), next.global_coords()) {
                assert_eq!(b - a, face.normal());
            }
        }
        assert!(it.block(&chunks).is_some());
        assert!(BlockIterator::INVALID.block(&chunks).is_none());
    }
}
