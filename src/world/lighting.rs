//! Incremental voxel lighting
//!
//! Each voxel carries an indoor (emissive) and an outdoor (sky) channel.
//! Changed voxels are queued; draining the queue relaxes each one to
//! `max(own emission, sky term, brightest neighbor - 1)` and re-queues its
//! neighbors whenever its value moves. A voxel's light-dirty flag is set
//! exactly while it sits in the queue.

use std::collections::VecDeque;

use crate::constants::*;
use crate::core::block_def::BlockRegistry;
use crate::core::chunk::{ChunkCoords, Direction};
use crate::core::coords;
use crate::core::iterator::{BlockFace, BlockIterator};
use crate::world::active::ActiveChunks;

const HORIZONTAL_FACES: [BlockFace; 4] = [
    BlockFace::North,
    BlockFace::South,
    BlockFace::East,
    BlockFace::West,
];

#[derive(Default)]
pub struct LightingPropagator {
    dirty: VecDeque<BlockIterator>,
}

impl LightingPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Queue a voxel unless it is already queued or not loaded.
    pub fn mark_dirty(&mut self, chunks: &mut ActiveChunks, it: BlockIterator) -> bool {
        let Some(block) = it.block_mut(chunks) else {
            return false;
        };
        if block.is_light_dirty() {
            return false;
        }
        block.set_light_dirty(true);
        self.dirty.push_back(it);
        true
    }

    pub fn mark_dirty_if_translucent(&mut self, chunks: &mut ActiveChunks, it: BlockIterator) -> bool {
        let translucent = it.block(chunks).is_some_and(|block| !block.is_opaque());
        translucent && self.mark_dirty(chunks, it)
    }

    /// Relax every queued voxel. Returns how many entries were processed.
    pub fn process_all(&mut self, chunks: &mut ActiveChunks, registry: &BlockRegistry) -> usize {
        let mut processed = 0;
        while self.process_next(chunks, registry) {
            processed += 1;
        }
        processed
    }

    /// Relax one voxel. Returns false once the queue is empty.
    pub fn process_next(&mut self, chunks: &mut ActiveChunks, registry: &BlockRegistry) -> bool {
        let Some(it) = self.dirty.pop_front() else {
            return false;
        };
        let Some(block) = it.block_mut(chunks) else {
            return true;
        };
        block.set_light_dirty(false);

        let (indoor, outdoor) = compute_light(chunks, registry, it);
        let Some(block) = it.block_mut(chunks) else {
            return true;
        };
        if block.indoor_light() == indoor && block.outdoor_light() == outdoor {
            return true;
        }
        block.set_indoor_light(indoor);
        block.set_outdoor_light(outdoor);

        mark_meshes_dirty_around(chunks, it);
        for face in BlockFace::ALL {
            let neighbor = it.neighbor(face, chunks);
            self.mark_dirty_if_translucent(chunks, neighbor);
        }
        true
    }

    /// Reset and seed lighting for a chunk that was just made active.
    pub fn initialize_chunk(&mut self, chunks: &mut ActiveChunks, registry: &BlockRegistry, at: ChunkCoords) {
        let Some(chunk) = chunks.get_mut(at) else {
            return;
        };
        for block in chunk.blocks_mut() {
            block.reset_lighting();
        }
        let linked: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| chunk.neighbor(*direction).is_some())
            .collect();

        // Light leaking in across edges shared with active chunks
        for direction in linked {
            self.mark_edge_dirty(chunks, at, direction);
        }

        // Columns open to the sky, top-down until the first opaque block
        for y in 0..CHUNK_SIZE_Y {
            for x in 0..CHUNK_SIZE_X {
                for z in (0..CHUNK_SIZE_Z).rev() {
                    let it = BlockIterator::new(at, coords::block_index(x, y, z));
                    let Some(block) = it.block_mut(chunks) else {
                        break;
                    };
                    if block.is_opaque() {
                        break;
                    }
                    block.set_sky(true);
                    block.set_outdoor_light(MAX_LIGHT);
                    self.mark_dirty(chunks, it);
                    for face in HORIZONTAL_FACES {
                        let neighbor = it.neighbor(face, chunks);
                        self.mark_dirty_if_translucent(chunks, neighbor);
                    }
                }
            }
        }

        let emissive: Vec<usize> = chunks
            .get(at)
            .map(|chunk| {
                chunk
                    .blocks()
                    .iter()
                    .enumerate()
                    .filter(|(_, block)| registry.get(block.block_type()).emits_light())
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default();
        for index in emissive {
            self.mark_dirty(chunks, BlockIterator::new(at, index));
        }
    }

    /// Queue every translucent voxel on one horizontal edge of a chunk.
    pub fn mark_edge_dirty(&mut self, chunks: &mut ActiveChunks, at: ChunkCoords, edge: Direction) {
        let (xs, ys) = match edge {
            Direction::North => (0..=CHUNK_MASK_X, CHUNK_MASK_Y..=CHUNK_MASK_Y),
            Direction::South => (0..=CHUNK_MASK_X, 0..=0),
            Direction::East => (CHUNK_MASK_X..=CHUNK_MASK_X, 0..=CHUNK_MASK_Y),
            Direction::West => (0..=0, 0..=CHUNK_MASK_Y),
        };
        for z in 0..CHUNK_SIZE_Z {
            for y in ys.clone() {
                for x in xs.clone() {
                    let it = BlockIterator::new(at, coords::block_index(x, y, z));
                    self.mark_dirty_if_translucent(chunks, it);
                }
            }
        }
    }

    /// Give sky to `start` and every translucent voxel below it, stopping at
    /// the first opaque block.
    pub fn propagate_sky_down(&mut self, chunks: &mut ActiveChunks, start: BlockIterator) {
        self.set_sky_down(chunks, start, true);
    }

    /// Take sky away from `start` and every translucent voxel below it.
    pub fn clear_sky_down(&mut self, chunks: &mut ActiveChunks, start: BlockIterator) {
        self.set_sky_down(chunks, start, false);
    }

    fn set_sky_down(&mut self, chunks: &mut ActiveChunks, start: BlockIterator, sky: bool) {
        let mut it = start;
        while let Some(block) = it.block_mut(chunks) {
            if block.is_opaque() {
                break;
            }
            block.set_sky(sky);
            self.mark_dirty(chunks, it);
            it = it.down();
        }
    }

    /// Drop queued entries for a chunk that is leaving the active set.
    pub fn forget_chunk(&mut self, at: ChunkCoords) {
        let before = self.dirty.len();
        self.dirty.retain(|it| it.chunk_coords() != Some(at));
        let dropped = before - self.dirty.len();
        if dropped > 0 {
            tracing::trace!("Dropped {} dirty light entries for chunk {}", dropped, at);
        }
    }
}

/// The light a voxel should hold given its neighbors' current values.
///
/// Opaque blocks only ever hold their own emission.
pub fn compute_light(chunks: &ActiveChunks, registry: &BlockRegistry, it: BlockIterator) -> (u8, u8) {
    let Some(block) = it.block(chunks) else {
        return (0, 0);
    };
    let def = registry.get(block.block_type());
    let mut indoor = def.indoor_light;
    let mut outdoor = def.outdoor_light;

    if block.is_sky() && !block.is_opaque() {
        outdoor = MAX_LIGHT;
    }

    if !block.is_opaque() {
        for face in BlockFace::ALL {
            if let Some(neighbor) = it.neighbor(face, chunks).block(chunks) {
                indoor = indoor.max(neighbor.indoor_light().saturating_sub(1));
                outdoor = outdoor.max(neighbor.outdoor_light().saturating_sub(1));
            }
        }
    }

    (indoor.min(MAX_LIGHT), outdoor.min(MAX_LIGHT))
}

/// Flag the chunk holding `it`, and any chunk holding one of its six
/// neighbors, for a mesh rebuild.
pub fn mark_meshes_dirty_around(chunks: &mut ActiveChunks, it: BlockIterator) {
    let Some(center) = it.chunk_coords() else {
        return;
    };
    let mut touched = [None; 6];
    for (slot, face) in BlockFace::ALL.into_iter().enumerate() {
        touched[slot] = it
            .neighbor(face, chunks)
            .chunk_coords()
            .filter(|coords| *coords != center);
    }
    if let Some(chunk) = chunks.get_mut(center) {
        chunk.set_mesh_dirty(true);
    }
    for coords in touched.into_iter().flatten() {
        if let Some(chunk) = chunks.get_mut(coords) {
            chunk.set_mesh_dirty(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockType;
    use crate::core::chunk::Chunk;
    use crate::world::generator::{FlatTerrain, TerrainSource};
    use glam::{IVec2, IVec3};
    use rustc_hash::FxHashSet;

    const GROUND: i32 = 10;

    fn flat_chunk(at: IVec2, registry: &BlockRegistry) -> Box<Chunk> {
        let mut chunk = Box::new(Chunk::new(at));
        FlatTerrain::new(GROUND).populate(&mut chunk, registry);
        chunk
    }

    fn activate(
        chunks: &mut ActiveChunks,
        lighting: &mut LightingPropagator,
        registry: &BlockRegistry,
        chunk: Box<Chunk>,
    ) {
        let at = chunk.coords();
        assert!(chunks.insert(chunk).is_ok());
        lighting.initialize_chunk(chunks, registry, at);
    }

    fn assert_fixed_point(chunks: &ActiveChunks, registry: &BlockRegistry) {
        for chunk in chunks.iter() {
            for index in 0..CHUNK_BLOCK_COUNT {
                let it = BlockIterator::new(chunk.coords(), index);
                let block = chunk.block(index);
                assert!(!block.is_light_dirty());
                assert_eq!(
                    compute_light(chunks, registry, it),
                    (block.indoor_light(), block.outdoor_light()),
                    "voxel {:?} in chunk {}",
                    coords::local_coords(index),
                    chunk.coords()
                );
            }
        }
    }

    fn assert_queue_matches_flags(chunks: &ActiveChunks, lighting: &LightingPropagator) {
        let queued: FxHashSet<BlockIterator> = lighting.dirty.iter().copied().collect();
        assert_eq!(queued.len(), lighting.len(), "duplicate queue entries");
        for chunk in chunks.iter() {
            for index in 0..CHUNK_BLOCK_COUNT {
                let it = BlockIterator::new(chunk.coords(), index);
                assert_eq!(chunk.block(index).is_light_dirty(), queued.contains(&it));
            }
        }
    }

    #[test]
    fn test_open_sky_over_flat_ground() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();
        activate(&mut chunks, &mut lighting, &registry, flat_chunk(IVec2::ZERO, &registry));
        assert_queue_matches_flags(&chunks, &lighting);

        lighting.process_all(&mut chunks, &registry);
        assert!(lighting.is_empty());

        let chunk = chunks.get(IVec2::ZERO).unwrap();
        let air = chunk.block_at(IVec3::new(4, 4, GROUND)).unwrap();
        assert!(air.is_sky());
        assert_eq!(air.outdoor_light(), MAX_LIGHT);
        let ground = chunk.block_at(IVec3::new(4, 4, GROUND - 1)).unwrap();
        assert!(!ground.is_sky());
        assert_eq!(ground.outdoor_light(), 0);
        assert_fixed_point(&chunks, &registry);
    }

    #[test]
    fn test_glowstone_lights_sealed_room() {
        let registry = BlockRegistry::standard();
        let mut chunk = flat_chunk(IVec2::ZERO, &registry);
        for x in 10..15 {
            for y in 10..15 {
                for z in 2..5 {
                    chunk.set_generated_type(IVec3::new(x, y, z), BlockType::Air, &registry);
                }
            }
        }
        chunk.set_generated_type(IVec3::new(12, 12, 2), BlockType::Glowstone, &registry);

        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();
        activate(&mut chunks, &mut lighting, &registry, chunk);
        lighting.process_all(&mut chunks, &registry);

        let chunk = chunks.get(IVec2::ZERO).unwrap();
        let glow = chunk.block_at(IVec3::new(12, 12, 2)).unwrap();
        assert_eq!(glow.indoor_light(), 15);
        assert_eq!(chunk.block_at(IVec3::new(12, 12, 3)).unwrap().indoor_light(), 14);
        assert_eq!(chunk.block_at(IVec3::new(10, 12, 2)).unwrap().indoor_light(), 13);
        assert_eq!(chunk.block_at(IVec3::new(10, 10, 4)).unwrap().indoor_light(), 9);
        assert_eq!(chunk.block_at(IVec3::new(10, 10, 4)).unwrap().outdoor_light(), 0);
        // walls hold only their own emission
        assert_eq!(chunk.block_at(IVec3::new(9, 12, 2)).unwrap().indoor_light(), 0);
        assert_fixed_point(&chunks, &registry);
    }

    #[test]
    fn test_relaxing_converged_world_is_noop() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();
        activate(&mut chunks, &mut lighting, &registry, flat_chunk(IVec2::ZERO, &registry));
        lighting.process_all(&mut chunks, &registry);

        let before: Vec<u8> = chunks
            .get(IVec2::ZERO)
            .unwrap()
            .blocks()
            .iter()
            .map(|b| b.packed_light())
            .collect();
        for index in (0..CHUNK_BLOCK_COUNT).step_by(7) {
            lighting.mark_dirty(&mut chunks, BlockIterator::new(IVec2::ZERO, index));
        }
        lighting.process_all(&mut chunks, &registry);
        let after: Vec<u8> = chunks
            .get(IVec2::ZERO)
            .unwrap()
            .blocks()
            .iter()
            .map(|b| b.packed_light())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_light_crosses_chunk_edges() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();

        let lit = flat_chunk(IVec2::ZERO, &registry);
        // Roof over the east half so it only gets light from the side
        let mut roofed = flat_chunk(IVec2::new(1, 0), &registry);
        for x in 0..CHUNK_SIZE_X {
            for y in 0..CHUNK_SIZE_Y {
                roofed.set_generated_type(IVec3::new(x, y, GROUND + 3), BlockType::Stone, &registry);
            }
        }

        activate(&mut chunks, &mut lighting, &registry, lit);
        lighting.process_all(&mut chunks, &registry);
        activate(&mut chunks, &mut lighting, &registry, roofed);
        assert_queue_matches_flags(&chunks, &lighting);
        lighting.process_all(&mut chunks, &registry);

        let roofed = chunks.get(IVec2::new(1, 0)).unwrap();
        let under_roof = roofed.block_at(IVec3::new(0, 5, GROUND)).unwrap();
        assert!(!under_roof.is_sky());
        assert_eq!(under_roof.outdoor_light(), 14);
        assert_eq!(roofed.block_at(IVec3::new(3, 5, GROUND)).unwrap().outdoor_light(), 11);
        assert_fixed_point(&chunks, &registry);
    }

    #[test]
    fn test_sky_down_stops_at_opaque() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();
        activate(&mut chunks, &mut lighting, &registry, flat_chunk(IVec2::ZERO, &registry));
        lighting.process_all(&mut chunks, &registry);

        let top = chunks.iterator_at(IVec3::new(3, 3, GROUND + 4));
        lighting.clear_sky_down(&mut chunks, top);
        for z in GROUND..=GROUND + 4 {
            let block = chunks.iterator_at(IVec3::new(3, 3, z)).block(&chunks).unwrap();
            assert!(!block.is_sky());
            assert!(block.is_light_dirty());
        }
        let ground = chunks.iterator_at(IVec3::new(3, 3, GROUND - 1)).block(&chunks).unwrap();
        assert!(!ground.is_light_dirty());
        assert_queue_matches_flags(&chunks, &lighting);

        lighting.propagate_sky_down(&mut chunks, top);
        lighting.process_all(&mut chunks, &registry);
        let block = chunks.iterator_at(IVec3::new(3, 3, GROUND)).block(&chunks).unwrap();
        assert!(block.is_sky());
        assert_eq!(block.outdoor_light(), MAX_LIGHT);
    }

    #[test]
    fn test_mark_dirty_is_idempotent_and_forget_chunk() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        let mut lighting = LightingPropagator::new();
        chunks.insert(flat_chunk(IVec2::ZERO, &registry)).unwrap();
        let it = BlockIterator::new(IVec2::ZERO, 5);
        assert!(lighting.mark_dirty(&mut chunks, it));
        assert!(!lighting.mark_dirty(&mut chunks, it));
        assert!(!lighting.mark_dirty(&mut chunks, BlockIterator::INVALID));
        assert_eq!(lighting.len(), 1);

        lighting.forget_chunk(IVec2::ZERO);
        assert!(lighting.is_empty());
    }

    #[test]
    fn test_mesh_dirty_spreads_to_neighbor_chunk() {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        chunks.insert(flat_chunk(IVec2::ZERO, &registry)).unwrap();
        chunks.insert(flat_chunk(IVec2::new(0, 1), &registry)).unwrap();
        for chunk in chunks.iter_mut() {
            chunk.set_mesh_dirty(false);
        }
        let edge = chunks.iterator_at(IVec3::new(5, CHUNK_MASK_Y, 20));
        mark_meshes_dirty_around(&mut chunks, edge);
        assert!(chunks.get(IVec2::ZERO).unwrap().is_mesh_dirty());
        assert!(chunks.get(IVec2::new(0, 1)).unwrap().is_mesh_dirty());

        for chunk in chunks.iter_mut() {
            chunk.set_mesh_dirty(false);
        }
        let inner = chunks.iterator_at(IVec3::new(5, 5, 20));
        mark_meshes_dirty_around(&mut chunks, inner);
        assert!(!chunks.get(IVec2::new(0, 1)).unwrap().is_mesh_dirty());
    }
}
