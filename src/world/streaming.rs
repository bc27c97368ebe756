//! Streaming voxel world
//!
//! Chunks are activated around the camera one at a time, filled by a
//! background job (generated fresh or loaded from storage), then linked into
//! the active arena where lighting and meshing see them. Chunks that drift
//! past the deactivation range are evicted and, if edited, saved by another
//! job before they are dropped.
//!
//! Every chunk is owned by exactly one place at a time: an activation queue,
//! a job in flight, the active arena, or the save queue. The coordinates of
//! every chunk that is not active but still owned somewhere sit in
//! `pending`, so no coordinate is ever activated twice.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::{IVec2, IVec3, Vec2, Vec3};
use rustc_hash::FxHashSet;

use crate::core::block::BlockType;
use crate::core::block_def::BlockRegistry;
use crate::core::chunk::{Chunk, ChunkCoords, ChunkState, Direction};
use crate::core::coords;
use crate::core::iterator::BlockIterator;
use crate::core::vertex::ChunkMesh;
use crate::error::WorldError;
use crate::save::{self, ChunkStorage};
use crate::utils::settings::WorldSettings;
use crate::world::active::ActiveChunks;
use crate::world::generator::{BlockPlacement, TerrainSource};
use crate::world::jobs::{ChunkJob, JobContext, JobKind, JobResult, JobSystem};
use crate::world::lighting::{self, LightingPropagator};
use crate::world::mesh;
use crate::world::raycast::{self, RaycastHit};

#[derive(Default, Clone, Copy, Debug)]
struct Outstanding {
    generate: usize,
    load: usize,
    save: usize,
}

/// Snapshot of the world's bookkeeping, for debug overlays and logs.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldStats {
    pub active_chunks: usize,
    pub queued_generate: usize,
    pub queued_load: usize,
    pub queued_save: usize,
    pub generating: usize,
    pub loading: usize,
    pub saving: usize,
    pub dirty_light: usize,
    pub mesh_vertices: usize,
    pub mesh_indices: usize,
}

pub struct World<J: JobSystem> {
    settings: WorldSettings,
    context: Arc<JobContext>,
    jobs: J,
    chunks: ActiveChunks,
    pending: FxHashSet<ChunkCoords>,
    queued_generate: VecDeque<Box<Chunk>>,
    queued_load: VecDeque<Box<Chunk>>,
    queued_save: VecDeque<Box<Chunk>>,
    outstanding: Outstanding,
    lighting: LightingPropagator,
    lighting_enabled: bool,
    mesh_queue: Vec<ChunkCoords>,
    // Chunk offsets within the activation radius, nearest first
    activation_offsets: Vec<IVec2>,
}

impl<J: JobSystem> World<J> {
    pub fn new(
        settings: WorldSettings,
        registry: Arc<BlockRegistry>,
        terrain: Arc<dyn TerrainSource>,
        storage: Arc<dyn ChunkStorage>,
        jobs: J,
    ) -> Self {
        let (rx, ry) = settings.activation_radius();
        let mut activation_offsets: Vec<IVec2> = (-rx..=rx)
            .flat_map(|x| (-ry..=ry).map(move |y| IVec2::new(x, y)))
            .collect();
        activation_offsets.sort_by_key(|offset| offset.length_squared());

        tracing::info!(
            "World created: seed {}, activation range {}, up to {} active chunks",
            settings.seed,
            settings.activation_range,
            settings.max_active_chunks()
        );

        Self {
            lighting_enabled: settings.lighting_enabled,
            settings,
            context: Arc::new(JobContext {
                registry,
                terrain,
                storage,
            }),
            jobs,
            chunks: ActiveChunks::default(),
            pending: FxHashSet::default(),
            queued_generate: VecDeque::new(),
            queued_load: VecDeque::new(),
            queued_save: VecDeque::new(),
            outstanding: Outstanding::default(),
            lighting: LightingPropagator::new(),
            mesh_queue: Vec::new(),
            activation_offsets,
        }
    }

    /// Advance the world by one tick around `camera`.
    ///
    /// Only a corrupt save file or a failed save surfaces as an error; both
    /// leave the world usable but mean persisted data can't be trusted.
    pub fn update(&mut self, camera: Vec3) -> Result<(), WorldError> {
        let camera_xy = camera.truncate();

        self.update_mesh_queue(camera_xy);
        self.build_meshes();

        self.deactivate_farthest_chunk(camera_xy);
        self.queue_closest_missing_chunk(camera_xy);

        self.dispatch_generate_jobs();
        self.dispatch_load_and_save_jobs();

        self.process_completed_jobs()
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.context.registry
    }

    pub fn chunks(&self) -> &ActiveChunks {
        &self.chunks
    }

    pub fn chunk_mesh(&self, at: ChunkCoords) -> Option<&ChunkMesh> {
        self.chunks.get(at)?.mesh()
    }

    /// Whether a coordinate is queued, in a job, or waiting to be saved.
    pub fn is_pending(&self, at: ChunkCoords) -> bool {
        self.pending.contains(&at)
    }

    pub fn lighting_enabled(&self) -> bool {
        self.lighting_enabled
    }

    pub fn set_lighting_enabled(&mut self, enabled: bool) {
        if self.lighting_enabled == enabled {
            return;
        }
        self.lighting_enabled = enabled;
        for chunk in self.chunks.iter_mut() {
            chunk.set_mesh_dirty(true);
        }
    }

    pub fn stats(&self) -> WorldStats {
        let (mesh_vertices, mesh_indices) = self
            .chunks
            .iter()
            .filter_map(Chunk::mesh)
            .fold((0, 0), |(v, i), mesh| (v + mesh.vertex_count(), i + mesh.index_count()));

        WorldStats {
            active_chunks: self.chunks.len(),
            queued_generate: self.queued_generate.len(),
            queued_load: self.queued_load.len(),
            queued_save: self.queued_save.len(),
            generating: self.outstanding.generate,
            loading: self.outstanding.load,
            saving: self.outstanding.save,
            dirty_light: self.lighting.len(),
            mesh_vertices,
            mesh_indices,
        }
    }

    pub fn block_type_at(&self, global: IVec3) -> Option<BlockType> {
        self.chunks
            .iterator_at(global)
            .block(&self.chunks)
            .map(|block| block.block_type())
    }

    /// `(indoor, outdoor)` light at a global coordinate.
    pub fn light_at(&self, global: IVec3) -> Option<(u8, u8)> {
        self.chunks
            .iterator_at(global)
            .block(&self.chunks)
            .map(|block| (block.indoor_light(), block.outdoor_light()))
    }

    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        raycast::raycast(&self.chunks, origin, direction, max_distance)
    }

    /// Change one block. Returns false when the chunk isn't active, the
    /// height is out of range, or the block already has that type.
    pub fn set_block_type(&mut self, global: IVec3, block_type: BlockType) -> bool {
        let it = self.chunks.iterator_at(global);
        let current = it.block(&self.chunks).map(|block| block.block_type());
        match current {
            Some(current) if current != block_type => {
                self.apply_block_edit(it, block_type);
                true
            }
            _ => false,
        }
    }

    fn apply_block_edit(&mut self, it: BlockIterator, block_type: BlockType) {
        let Some(chunk) = it.chunk_coords().and_then(|at| self.chunks.get_mut(at)) else {
            return;
        };
        chunk
            .block_mut(it.index())
            .set_type(block_type, &self.context.registry);
        chunk.set_mesh_dirty(true);
        chunk.set_needs_saving(true);

        self.lighting.mark_dirty(&mut self.chunks, it);

        // Nothing above the top layer blocks the sky
        let above = it.up();
        let above_sky = !above.is_valid() || above.block(&self.chunks).is_some_and(|b| b.is_sky());
        let opaque = it.block(&self.chunks).is_some_and(|b| b.is_opaque());
        if opaque {
            if let Some(block) = it.block_mut(&mut self.chunks) {
                block.set_sky(false);
            }
            self.lighting.clear_sky_down(&mut self.chunks, it.down());
        } else if above_sky {
            self.lighting.propagate_sky_down(&mut self.chunks, it);
        }

        lighting::mark_meshes_dirty_around(&mut self.chunks, it);
    }

    /// Synchronously write every edited chunk that is active or waiting to
    /// be saved. Returns how many chunks were written.
    pub fn flush_all(&mut self) -> Result<usize, WorldError> {
        let storage = Arc::clone(&self.context.storage);
        let mut written = 0;

        for chunk in self.chunks.iter_mut().filter(|chunk| chunk.needs_saving()) {
            write_chunk(storage.as_ref(), chunk)?;
            chunk.set_needs_saving(false);
            written += 1;
        }

        while let Some(chunk) = self.queued_save.pop_front() {
            let at = chunk.coords();
            self.pending.remove(&at);
            if chunk.needs_saving() {
                write_chunk(storage.as_ref(), &chunk)?;
                written += 1;
            }
        }

        if written > 0 {
            tracing::info!("Flushed {} chunks to storage", written);
        }
        Ok(written)
    }

    fn update_mesh_queue(&mut self, camera_xy: Vec2) {
        let range = self.settings.mesh_build_range();
        let range_sq = range * range;

        let mut queue: Vec<(ChunkCoords, f32)> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.is_mesh_dirty())
            .map(|chunk| {
                let at = chunk.coords();
                (at, camera_xy.distance_squared(coords::chunk_center(at)))
            })
            .filter(|(_, dist_sq)| *dist_sq <= range_sq)
            .collect();
        queue.sort_by(|a, b| a.1.total_cmp(&b.1));

        self.mesh_queue = queue.into_iter().map(|(at, _)| at).collect();
    }

    fn build_meshes(&mut self) {
        // Lighting has to settle first, mesh colors read it
        self.lighting.process_all(&mut self.chunks, &self.context.registry);

        let mut built = 0;
        for &at in &self.mesh_queue {
            if built >= self.settings.max_meshes_per_tick {
                break;
            }
            let Some(chunk) = self.chunks.get(at) else {
                continue;
            };
            // Face culling needs every horizontal neighbor
            if !chunk.is_mesh_dirty() || !chunk.has_all_neighbors() {
                continue;
            }

            let Some(mesh) =
                mesh::build_chunk_mesh(&self.chunks, &self.context.registry, at, self.lighting_enabled)
            else {
                continue;
            };
            if let Some(chunk) = self.chunks.get_mut(at) {
                chunk.set_mesh(mesh);
                built += 1;
            }
        }

        let chunks = &self.chunks;
        self.mesh_queue
            .retain(|at| chunks.get(*at).is_some_and(Chunk::is_mesh_dirty));
    }

    fn deactivate_farthest_chunk(&mut self, camera_xy: Vec2) {
        let range = self.settings.deactivation_range();
        let range_sq = range * range;

        let farthest = self
            .chunks
            .coords()
            .map(|at| (at, camera_xy.distance_squared(coords::chunk_center(at))))
            .filter(|(_, dist_sq)| *dist_sq > range_sq)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(at, _)| at);

        if let Some(at) = farthest {
            self.deactivate_chunk(at);
        }
    }

    fn deactivate_chunk(&mut self, at: ChunkCoords) {
        let Some(chunk) = self.chunks.remove(at) else {
            return;
        };
        self.lighting.forget_chunk(at);

        // Light that leaked across the shared edges has to be re-relaxed
        for direction in Direction::ALL {
            let neighbor = at + direction.offset();
            if let Some(neighbor_chunk) = self.chunks.get_mut(neighbor) {
                neighbor_chunk.set_mesh_dirty(true);
                self.lighting
                    .mark_edge_dirty(&mut self.chunks, neighbor, direction.opposite());
            }
        }

        if chunk.needs_saving() {
            tracing::debug!("Deactivated chunk {}, queued for save", at);
            chunk.set_state(ChunkState::QueuedSave);
            self.pending.insert(at);
            self.queued_save.push_back(chunk);
        } else {
            tracing::debug!("Deactivated chunk {}", at);
        }
    }

    fn activating_count(&self) -> usize {
        self.queued_generate.len()
            + self.queued_load.len()
            + self.outstanding.generate
            + self.outstanding.load
    }

    fn queue_closest_missing_chunk(&mut self, camera_xy: Vec2) {
        if self.chunks.len() + self.activating_count() >= self.settings.max_active_chunks() {
            return;
        }

        let camera_chunk = coords::chunk_coords_at(camera_xy);
        let range_sq = self.settings.activation_range * self.settings.activation_range;
        let mut budget = self.settings.missing_chunk_scan_budget.max(1);
        let mut closest: Option<(ChunkCoords, f32)> = None;

        for offset in &self.activation_offsets {
            if budget == 0 {
                break;
            }
            let at = camera_chunk + *offset;
            if self.chunks.contains(at) || self.pending.contains(&at) {
                continue;
            }
            let dist_sq = camera_xy.distance_squared(coords::chunk_center(at));
            if dist_sq > range_sq {
                continue;
            }
            budget -= 1;
            if closest.is_none_or(|(_, best)| dist_sq < best) {
                closest = Some((at, dist_sq));
            }
        }

        if let Some((at, _)) = closest {
            self.activate_chunk(at);
        }
    }

    fn activate_chunk(&mut self, at: ChunkCoords) {
        if self.chunks.contains(at) || !self.pending.insert(at) {
            return;
        }

        let chunk = Box::new(Chunk::new(at));
        if self.context.storage.exists(at) {
            tracing::debug!("Activating chunk {} from storage", at);
            chunk.set_state(ChunkState::QueuedLoad);
            self.queued_load.push_back(chunk);
        } else {
            tracing::debug!("Activating chunk {} for generation", at);
            chunk.set_state(ChunkState::QueuedGenerate);
            self.queued_generate.push_back(chunk);
        }
    }

    fn dispatch_generate_jobs(&mut self) {
        while self.outstanding.generate < self.settings.max_generate_jobs {
            let Some(chunk) = self.queued_generate.pop_front() else {
                break;
            };
            chunk.set_state(ChunkState::Generating);
            self.outstanding.generate += 1;
            self.submit(JobKind::Generate, chunk);
        }
    }

    fn dispatch_load_and_save_jobs(&mut self) {
        while self.outstanding.load < self.settings.max_load_jobs {
            let Some(chunk) = self.queued_load.pop_front() else {
                break;
            };
            chunk.set_state(ChunkState::Loading);
            self.outstanding.load += 1;
            self.submit(JobKind::Load, chunk);
        }

        while self.outstanding.save < self.settings.max_save_jobs {
            let Some(chunk) = self.queued_save.pop_front() else {
                break;
            };
            chunk.set_state(ChunkState::Saving);
            self.outstanding.save += 1;
            self.submit(JobKind::Save, chunk);
        }
    }

    fn submit(&mut self, kind: JobKind, chunk: Box<Chunk>) {
        tracing::trace!("Dispatching {:?} job for chunk {}", kind, chunk.coords());
        let job = ChunkJob::new(kind, chunk, Arc::clone(&self.context));
        self.jobs.submit(job);
    }

    fn process_completed_jobs(&mut self) -> Result<(), WorldError> {
        while let Some(result) = self.jobs.poll_completed() {
            match result {
                JobResult::Generated { chunk, overhang } => {
                    self.outstanding.generate = self.outstanding.generate.saturating_sub(1);
                    if chunk.state() == ChunkState::GenerateComplete {
                        self.finalize_activation(chunk, overhang);
                    } else {
                        self.pending.remove(&chunk.coords());
                    }
                }
                JobResult::Loaded { chunk, outcome } => {
                    self.outstanding.load = self.outstanding.load.saturating_sub(1);
                    let at = chunk.coords();
                    if let Err(source) = outcome {
                        self.pending.remove(&at);
                        tracing::error!("Chunk {} failed to load: {}", at, source);
                        return Err(WorldError::CorruptChunk { coords: at, source });
                    }
                    if chunk.state() == ChunkState::LoadComplete {
                        self.finalize_activation(chunk, Vec::new());
                    } else {
                        self.pending.remove(&at);
                    }
                }
                JobResult::Saved { chunk, outcome } => {
                    self.outstanding.save = self.outstanding.save.saturating_sub(1);
                    let at = chunk.coords();
                    self.pending.remove(&at);
                    if let Err(source) = outcome {
                        tracing::error!("Chunk {} failed to save: {}", at, source);
                        return Err(WorldError::SaveFailed { coords: at, source });
                    }
                    tracing::debug!("Saved chunk {}", at);
                }
            }
        }
        Ok(())
    }

    fn finalize_activation(&mut self, mut chunk: Box<Chunk>, overhang: Vec<BlockPlacement>) {
        let at = chunk.coords();
        self.pending.remove(&at);
        if self.chunks.contains(at) {
            return;
        }

        chunk.set_mesh_dirty(true);
        chunk.set_needs_saving(false);
        if self.chunks.insert(chunk).is_err() {
            return;
        }
        self.lighting
            .initialize_chunk(&mut self.chunks, &self.context.registry, at);

        // Tree blocks that spilled over into chunks that are already active
        let mut applied = 0;
        for placement in overhang {
            let it = self.chunks.iterator_at(placement.global);
            if it
                .block(&self.chunks)
                .is_some_and(|block| block.block_type() == BlockType::Air)
            {
                self.apply_block_edit(it, placement.block_type);
                applied += 1;
            }
        }

        tracing::debug!("Chunk {} active ({} overhanging blocks applied)", at, applied);
    }
}

fn write_chunk(storage: &dyn ChunkStorage, chunk: &Chunk) -> Result<(), WorldError> {
    let at = chunk.coords();
    storage
        .write(at, &save::encode_chunk(chunk.blocks()))
        .map_err(|e| WorldError::SaveFailed {
            coords: at,
            source: e.into(),
        })
}

impl<J: JobSystem> Drop for World<J> {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            tracing::error!("Failed to flush world on shutdown: {}", e);
        }
    }
}
