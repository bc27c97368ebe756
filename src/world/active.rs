//! Arena of active chunks keyed by chunk coordinate.
//!
//! The arena owns every active chunk. Neighbor links are plain coordinates
//! and are kept symmetric: inserting a chunk links it with every active
//! horizontal neighbor in both directions, removing it clears both sides.

use glam::IVec3;
use rustc_hash::FxHashMap;

use crate::constants::CHUNK_SIZE_Z;
use crate::core::chunk::{Chunk, ChunkCoords, ChunkState, Direction};
use crate::core::coords;
use crate::core::iterator::BlockIterator;

#[derive(Default)]
pub struct ActiveChunks {
    chunks: FxHashMap<ChunkCoords, Box<Chunk>>,
}

impl ActiveChunks {
    #[inline]
    pub fn get(&self, coords: ChunkCoords) -> Option<&Chunk> {
        self.chunks.get(&coords).map(|chunk| &**chunk)
    }

    #[inline]
    pub fn get_mut(&mut self, coords: ChunkCoords) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coords).map(|chunk| &mut **chunk)
    }

    #[inline]
    pub fn contains(&self, coords: ChunkCoords) -> bool {
        self.chunks.contains_key(&coords)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values().map(|chunk| &**chunk)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut().map(|chunk| &mut **chunk)
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoords> + '_ {
        self.chunks.keys().copied()
    }

    /// Insert a chunk, mark it active and link it with its active neighbors.
    /// Returns the chunk back if its slot is already taken.
    pub fn insert(&mut self, mut chunk: Box<Chunk>) -> Result<(), Box<Chunk>> {
        let at = chunk.coords();
        if self.chunks.contains_key(&at) {
            return Err(chunk);
        }

        for direction in Direction::ALL {
            let neighbor_coords = at + direction.offset();
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_coords) {
                neighbor.set_neighbor(direction.opposite(), Some(at));
                neighbor.set_mesh_dirty(true);
                chunk.set_neighbor(direction, Some(neighbor_coords));
            } else {
                chunk.set_neighbor(direction, None);
            }
        }

        chunk.set_state(ChunkState::Active);
        self.chunks.insert(at, chunk);
        Ok(())
    }

    /// Remove a chunk and clear the links that point at it.
    pub fn remove(&mut self, at: ChunkCoords) -> Option<Box<Chunk>> {
        let mut chunk = self.chunks.remove(&at)?;
        for direction in Direction::ALL {
            if let Some(neighbor) = self.chunks.get_mut(&(at + direction.offset())) {
                neighbor.set_neighbor(direction.opposite(), None);
            }
            chunk.set_neighbor(direction, None);
        }
        Some(chunk)
    }

    /// Iterator for a global block coordinate, invalid when the chunk is not
    /// active or the height is out of range.
    pub fn iterator_at(&self, global: IVec3) -> BlockIterator {
        if global.z < 0 || global.z >= CHUNK_SIZE_Z {
            return BlockIterator::INVALID;
        }
        let chunk = coords::chunk_coords_of(global);
        if !self.contains(chunk) {
            return BlockIterator::INVALID;
        }
        BlockIterator::new(chunk, coords::block_index_of(coords::local_from_global(global)))
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Box<Chunk>> + '_ {
        self.chunks.drain().map(|(_, chunk)| chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn assert_symmetric(chunks: &ActiveChunks) {
        for chunk in chunks.iter() {
            for direction in Direction::ALL {
                let expected = chunk.coords() + direction.offset();
                match chunk.neighbor(direction) {
                    Some(coords) => {
                        assert_eq!(coords, expected);
                        let other = chunks.get(coords).expect("linked chunk must be active");
                        assert_eq!(other.neighbor(direction.opposite()), Some(chunk.coords()));
                    }
                    None => assert!(!chunks.contains(expected)),
                }
            }
        }
    }

    #[test]
    fn test_links_stay_symmetric() {
        let mut chunks = ActiveChunks::default();
        let order = [
            IVec2::new(0, 0),
            IVec2::new(1, 0),
            IVec2::new(0, 1),
            IVec2::new(-1, 0),
            IVec2::new(0, -1),
            IVec2::new(1, 1),
        ];
        for at in order {
            assert!(chunks.insert(Box::new(Chunk::new(at))).is_ok());
            assert_symmetric(&chunks);
        }
        assert!(chunks.get(IVec2::ZERO).unwrap().has_all_neighbors());

        for at in [IVec2::new(1, 0), IVec2::new(0, 0), IVec2::new(1, 1)] {
            let removed = chunks.remove(at).unwrap();
            assert!(Direction::ALL.iter().all(|d| removed.neighbor(*d).is_none()));
            assert_symmetric(&chunks);
        }
        assert!(chunks.remove(IVec2::new(9, 9)).is_none());
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut chunks = ActiveChunks::default();
        assert!(chunks.insert(Box::new(Chunk::new(IVec2::ZERO))).is_ok());
        let back = chunks.insert(Box::new(Chunk::new(IVec2::ZERO)));
        assert!(back.is_err());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_insert_marks_active_and_neighbors_dirty() {
        let mut chunks = ActiveChunks::default();
        chunks.insert(Box::new(Chunk::new(IVec2::ZERO))).unwrap();
        chunks.get_mut(IVec2::ZERO).unwrap().set_mesh_dirty(false);
        chunks.insert(Box::new(Chunk::new(IVec2::new(0, 1)))).unwrap();
        assert_eq!(chunks.get(IVec2::ZERO).unwrap().state(), ChunkState::Active);
        assert!(chunks.get(IVec2::ZERO).unwrap().is_mesh_dirty());
    }

    #[test]
    fn test_iterator_at() {
        let mut chunks = ActiveChunks::default();
        chunks.insert(Box::new(Chunk::new(IVec2::new(-1, 0)))).unwrap();
        let it = chunks.iterator_at(IVec3::new(-1, 2, 3));
        assert_eq!(it.chunk_coords(), Some(IVec2::new(-1, 0)));
        assert_eq!(it.global_coords(), Some(IVec3::new(-1, 2, 3)));
        assert!(!chunks.iterator_at(IVec3::new(0, 2, 3)).is_valid());
        assert!(!chunks.iterator_at(IVec3::new(-1, 2, -1)).is_valid());
        assert!(!chunks.iterator_at(IVec3::new(-1, 2, CHUNK_SIZE_Z)).is_valid());
    }
}
