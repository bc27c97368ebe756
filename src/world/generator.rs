//! Chunk population
//!
//! `TerrainGenerator` is a pure function of (chunk coordinates, seed): it
//! never fails and never looks at other chunks. Tree blocks that would land
//! outside the chunk being generated are handed back as `BlockPlacement`s
//! for the world to apply to whatever neighbors are active.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::IVec3;

use crate::constants::*;
use crate::core::biome::{Biome, BiomeParams};
use crate::core::block::BlockType;
use crate::core::block_def::BlockRegistry;
use crate::core::chunk::Chunk;
use crate::core::coords;
use crate::world::spline::TerrainSpline;
use crate::world::stamps::{TreeKind, TreeStamp, TreeStamps};

/// A block write aimed at a chunk other than the one being populated.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockPlacement {
    pub global: IVec3,
    pub block_type: BlockType,
}

/// Fills a freshly constructed chunk. Runs on worker threads.
pub trait TerrainSource: Send + Sync {
    fn populate(&self, chunk: &mut Chunk, registry: &BlockRegistry) -> Vec<BlockPlacement>;
}

/// Per-column data sampled once per chunk.
#[derive(Clone, Copy, Default)]
struct ColumnSample {
    continent: f32,
    biome: Biome,
    tree: f32,
    tree_variant: f32,
}

pub struct TerrainGenerator {
    noise_density: FastNoiseLite,
    noise_continent: FastNoiseLite,
    noise_continentalness: FastNoiseLite,
    noise_erosion: FastNoiseLite,
    noise_peaks_valleys: FastNoiseLite,
    noise_temperature: FastNoiseLite,
    noise_humidity: FastNoiseLite,
    noise_worm: FastNoiseLite,
    noise_cheese: FastNoiseLite,
    noise_diamond: FastNoiseLite,
    noise_gold: FastNoiseLite,
    noise_iron: FastNoiseLite,
    noise_coal: FastNoiseLite,
    height_offset: TerrainSpline,
    squash: TerrainSpline,
    stamps: TreeStamps,
    pub seed: u32,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            noise_density: Self::create_fbm_noise(seed, 1.0 / DENSITY_NOISE_SCALE, DENSITY_OCTAVES),
            noise_continent: Self::create_fbm_noise(
                seed.wrapping_add(100),
                1.0 / CONTINENT_SCALE,
                CONTINENT_OCTAVES,
            ),
            noise_continentalness: Self::create_fbm_noise(
                seed.wrapping_add(100),
                1.0 / CONTINENTALNESS_SCALE,
                BIOME_OCTAVES,
            ),
            noise_erosion: Self::create_fbm_noise(
                seed.wrapping_add(200),
                1.0 / EROSION_SCALE,
                BIOME_OCTAVES,
            ),
            noise_peaks_valleys: Self::create_fbm_noise(
                seed.wrapping_add(300),
                1.0 / PEAKS_VALLEYS_SCALE,
                BIOME_OCTAVES,
            ),
            noise_temperature: Self::create_fbm_noise(
                seed.wrapping_add(400),
                1.0 / TEMPERATURE_SCALE,
                BIOME_OCTAVES,
            ),
            noise_humidity: Self::create_fbm_noise(
                seed.wrapping_add(500),
                1.0 / HUMIDITY_SCALE,
                BIOME_OCTAVES,
            ),
            noise_worm: Self::create_fbm_noise(seed.wrapping_add(777), 0.05, 3),
            noise_cheese: Self::create_fbm_noise(seed.wrapping_add(900), 0.03, 2),
            noise_diamond: Self::create_fbm_noise(seed.wrapping_add(20100), 0.09, 3),
            noise_gold: Self::create_fbm_noise(seed.wrapping_add(20200), 0.09, 3),
            noise_iron: Self::create_fbm_noise(seed.wrapping_add(20300), 0.08, 4),
            noise_coal: Self::create_fbm_noise(seed.wrapping_add(20400), 0.075, 3),
            height_offset: TerrainSpline::continent_height_offset(),
            squash: TerrainSpline::continent_squash(),
            stamps: TreeStamps::new(),
            seed,
        }
    }

    fn create_fbm_noise(seed: u32, frequency: f32, octaves: i32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::Perlin));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(octaves));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise.set_frequency(Some(frequency));
        noise
    }

    pub fn biome_params_at(&self, x: i32, y: i32) -> BiomeParams {
        let (fx, fy) = (x as f32, y as f32);
        BiomeParams {
            continentalness: self.noise_continentalness.get_noise_2d(fx, fy),
            erosion: self.noise_erosion.get_noise_2d(fx, fy),
            peaks_valleys: self.noise_peaks_valleys.get_noise_2d(fx, fy),
            temperature: self.noise_temperature.get_noise_2d(fx, fy),
            humidity: self.noise_humidity.get_noise_2d(fx, fy),
        }
    }

    pub fn biome_at(&self, x: i32, y: i32) -> Biome {
        Biome::classify(&self.biome_params_at(x, y))
    }

    fn sample_column(&self, x: i32, y: i32) -> ColumnSample {
        ColumnSample {
            continent: self.noise_continent.get_noise_2d(x as f32, y as f32),
            biome: self.biome_at(x, y),
            tree: zero_to_one_2d(x, y, self.seed.wrapping_add(42)),
            tree_variant: zero_to_one_2d(x, y, self.seed.wrapping_add(1337)),
        }
    }

    /// Negative density is solid ground.
    fn density(&self, x: i32, y: i32, z: i32, height_offset: f32, squash: f32, base_height: f32) -> f32 {
        let noise = self.noise_density.get_noise_3d(x as f32, y as f32, z as f32);
        let bias = (2.0 / CHUNK_SIZE_Z as f32) * (z as f32 - DEFAULT_TERRAIN_HEIGHT);
        let shaped = (z as f32 - base_height) / base_height;
        noise + bias - height_offset + squash * SQUASH_MULT * shaped
    }

    fn is_cave(&self, x: i32, y: i32, z: i32) -> bool {
        let (fx, fy, fz) = (x as f32, y as f32, z as f32);
        if self.noise_worm.get_noise_3d(fx, fy, fz).abs() < 0.1 {
            return true;
        }
        if self.noise_cheese.get_noise_3d(fx, fy, fz) > 0.55 {
            return true;
        }
        if zero_to_one_3d(x, y, z, self.seed.wrapping_add(1234)) > 0.995 {
            let center = IVec3::new(x, y, z).div_euclid(IVec3::splat(12)) * 12;
            let offset = (IVec3::new(x, y, z) - center).as_vec3();
            return offset.length() < 8.0;
        }
        false
    }

    /// Diamond, gold, iron, coal, in that order; stone when none hit.
    fn ore_at(&self, x: i32, y: i32, z: i32) -> BlockType {
        let (fx, fy, fz) = (x as f32, y as f32, z as f32);
        if z < 20 && self.noise_diamond.get_noise_3d(fx, fy, fz) > 0.75 {
            BlockType::Diamond
        } else if z < 40 && self.noise_gold.get_noise_3d(fx, fy, fz) > 0.65 {
            BlockType::Gold
        } else if self.noise_iron.get_noise_3d(fx, fy, fz) > 0.5 {
            BlockType::Iron
        } else if self.noise_coal.get_noise_3d(fx, fy, fz) > 0.45 {
            BlockType::Coal
        } else {
            BlockType::Stone
        }
    }

    fn tree_for(&self, column: &ColumnSample, surface: BlockType) -> Option<TreeKind> {
        use BlockType::*;
        match (column.biome, surface) {
            (Biome::Forest, Grass | Dirt) => Some(match column.tree_variant {
                v if v < 0.33 => TreeKind::SmallOak,
                v if v < 0.66 => TreeKind::LargeOak,
                _ => TreeKind::Birch,
            }),
            (Biome::Taiga, GrassLight) => Some(TreeKind::Spruce),
            (Biome::SnowyTaiga, Snow) => Some(TreeKind::SnowySpruce),
            (Biome::Desert, Sand) => Some(TreeKind::Cactus),
            (Biome::Savanna, GrassYellow) => Some(TreeKind::Acacia),
            (Biome::Jungle, GrassDark) => Some(TreeKind::Jungle),
            _ => None,
        }
    }

    /// Walk one column top-down and return the z of its highest solid block.
    fn populate_column(
        &self,
        chunk: &mut Chunk,
        registry: &BlockRegistry,
        local: (i32, i32),
        column: &ColumnSample,
        has_caves: bool,
    ) -> Option<i32> {
        let (lx, ly) = local;
        let global = coords::global_from_local(chunk.coords(), IVec3::new(lx, ly, 0));
        let surface_blocks = column.biome.surface_blocks();

        let height_offset = self.height_offset.sample(column.continent);
        let squash = self.squash.sample(column.continent);
        let base_height = DEFAULT_TERRAIN_HEIGHT + height_offset * (CHUNK_SIZE_Z as f32 / 8.5);

        let mut surface_depth = 0;
        let mut surface_z: Option<i32> = None;

        for z in (0..CHUNK_SIZE_Z).rev() {
            let mut solid = self.density(global.x, global.y, z, height_offset, squash, base_height) < 0.0;
            let mut cave = false;
            if has_caves && surface_z.is_some_and(|top| z < top) && self.is_cave(global.x, global.y, z) {
                solid = false;
                cave = true;
            }

            let block_type = if solid {
                let block_type = if surface_depth < SURFACE_LAYER_DEPTH {
                    surface_depth += 1;
                    match (z >= SEA_LEVEL, surface_depth) {
                        (true, 1) => surface_blocks.top,
                        (true, _) => surface_blocks.sub,
                        (false, _) => surface_blocks.underwater,
                    }
                } else if z == OBSIDIAN_Z {
                    BlockType::Obsidian
                } else if z == LAVA_Z {
                    BlockType::Lava
                } else {
                    self.ore_at(global.x, global.y, z)
                };
                surface_z.get_or_insert(z);
                block_type
            } else {
                surface_depth = 0;
                if z < SEA_LEVEL && !cave {
                    BlockType::Water
                } else {
                    BlockType::Air
                }
            };

            chunk.set_generated_type(IVec3::new(lx, ly, z), block_type, registry);
        }

        surface_z
    }

    fn place_tree(
        &self,
        chunk: &mut Chunk,
        registry: &BlockRegistry,
        local: (i32, i32),
        surface_z: i32,
        column: &ColumnSample,
        overhang: &mut Vec<BlockPlacement>,
    ) {
        if column.tree <= TREE_THRESHOLD {
            return;
        }
        let (lx, ly) = local;
        let surface = chunk.block_type_at(IVec3::new(lx, ly, surface_z));
        let above = chunk.block_type_at(IVec3::new(lx, ly, surface_z + 1));
        let (Some(surface), Some(above)) = (surface, above) else {
            return;
        };
        if surface == BlockType::Water || above == BlockType::Water {
            return;
        }
        let Some(kind) = self.tree_for(column, surface) else {
            return;
        };

        let stamp = self.stamps.get(kind);
        stamp_blocks(chunk, registry, stamp, IVec3::new(lx, ly, surface_z + 1), overhang);
    }
}

/// Write a stamp at `origin` (local coordinates). Only air is replaced and
/// heights outside the chunk are dropped. Blocks that fall in a horizontal
/// neighbor are pushed to `overhang`.
pub(crate) fn stamp_blocks(
    chunk: &mut Chunk,
    registry: &BlockRegistry,
    stamp: &TreeStamp,
    origin: IVec3,
    overhang: &mut Vec<BlockPlacement>,
) {
    for &(offset, block_type) in &stamp.blocks {
        let local = origin + offset;
        if local.z < 0 || local.z >= CHUNK_SIZE_Z {
            continue;
        }
        if coords::is_local_in_bounds(local) {
            if chunk.block_type_at(local) == Some(BlockType::Air) {
                chunk.set_generated_type(local, block_type, registry);
            }
        } else {
            overhang.push(BlockPlacement {
                global: coords::global_from_local(chunk.coords(), local),
                block_type,
            });
        }
    }
}

impl TerrainSource for TerrainGenerator {
    fn populate(&self, chunk: &mut Chunk, registry: &BlockRegistry) -> Vec<BlockPlacement> {
        let at = chunk.coords();
        let origin = coords::global_from_local(at, IVec3::ZERO);

        let columns: Vec<ColumnSample> = (0..CHUNK_BLOCKS_PER_LAYER as i32)
            .map(|i| self.sample_column(origin.x + (i & CHUNK_MASK_X), origin.y + (i >> CHUNK_BITS_X)))
            .collect();
        let has_caves = zero_to_one_2d(at.x, at.y, self.seed.wrapping_add(9999)) > CAVE_CHUNK_THRESHOLD;

        let mut surfaces = vec![None; CHUNK_BLOCKS_PER_LAYER];
        for (i, column) in columns.iter().enumerate() {
            let local = (i as i32 & CHUNK_MASK_X, i as i32 >> CHUNK_BITS_X);
            surfaces[i] = self.populate_column(chunk, registry, local, column, has_caves);
        }

        // Trees go in after every column is final so later columns can't erase canopies
        let mut overhang = Vec::new();
        for (i, column) in columns.iter().enumerate() {
            if let Some(surface_z) = surfaces[i] {
                let local = (i as i32 & CHUNK_MASK_X, i as i32 >> CHUNK_BITS_X);
                self.place_tree(chunk, registry, local, surface_z, column, &mut overhang);
            }
        }

        tracing::trace!("Generated chunk {} ({} overhanging blocks)", at, overhang.len());
        overhang
    }
}

/// Layered flat world: stone, dirt, then one surface layer.
#[derive(Clone, Debug)]
pub struct FlatTerrain {
    pub height: i32,
    pub surface: BlockType,
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self {
            height: SEA_LEVEL + 4,
            surface: BlockType::Grass,
        }
    }
}

impl FlatTerrain {
    pub fn new(height: i32) -> Self {
        Self {
            height: height.clamp(0, CHUNK_SIZE_Z),
            ..Default::default()
        }
    }

    pub fn block_at(&self, z: i32) -> BlockType {
        match z {
            z if z >= self.height => BlockType::Air,
            z if z == self.height - 1 => self.surface,
            z if z >= self.height - 1 - SURFACE_LAYER_DEPTH => BlockType::Dirt,
            _ => BlockType::Stone,
        }
    }
}

impl TerrainSource for FlatTerrain {
    fn populate(&self, chunk: &mut Chunk, registry: &BlockRegistry) -> Vec<BlockPlacement> {
        let layers: Vec<BlockType> = (0..CHUNK_SIZE_Z).map(|z| self.block_at(z)).collect();
        for (index, block) in chunk.blocks_mut().iter_mut().enumerate() {
            block.set_type(layers[coords::local_z(index) as usize], registry);
        }
        Vec::new()
    }
}

fn position_hash_2d(x: i32, y: i32, seed: u32) -> u32 {
    let mut hash = seed;
    hash = hash.wrapping_add(x as u32).wrapping_mul(73856093);
    hash = hash.wrapping_add(y as u32).wrapping_mul(19349663);
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x045d_9f3b);
    hash ^ (hash >> 16)
}

fn position_hash_3d(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut hash = seed;
    hash = hash.wrapping_add(x as u32).wrapping_mul(73856093);
    hash = hash.wrapping_add(y as u32).wrapping_mul(19349663);
    hash = hash.wrapping_add(z as u32).wrapping_mul(83492791);
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x045d_9f3b);
    hash ^ (hash >> 16)
}

pub fn zero_to_one_2d(x: i32, y: i32, seed: u32) -> f32 {
    position_hash_2d(x, y, seed) as f32 / u32::MAX as f32
}

pub fn zero_to_one_3d(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    position_hash_3d(x, y, z, seed) as f32 / u32::MAX as f32
}
