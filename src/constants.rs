// Chunk shape, expressed as bit widths so every conversion is a shift or mask
pub const CHUNK_BITS_X: u32 = 5;
pub const CHUNK_BITS_Y: u32 = 5;
pub const CHUNK_BITS_Z: u32 = 7;

pub const CHUNK_SIZE_X: i32 = 1 << CHUNK_BITS_X;
pub const CHUNK_SIZE_Y: i32 = 1 << CHUNK_BITS_Y;
pub const CHUNK_SIZE_Z: i32 = 1 << CHUNK_BITS_Z;

pub const CHUNK_MASK_X: i32 = CHUNK_SIZE_X - 1;
pub const CHUNK_MASK_Y: i32 = CHUNK_SIZE_Y - 1;
pub const CHUNK_MASK_Z: i32 = CHUNK_SIZE_Z - 1;

pub const CHUNK_BLOCKS_PER_LAYER: usize = (CHUNK_SIZE_X * CHUNK_SIZE_Y) as usize;
pub const CHUNK_BLOCK_COUNT: usize = CHUNK_BLOCKS_PER_LAYER * CHUNK_SIZE_Z as usize;

// Light
pub const MAX_LIGHT: u8 = 15;

// Terrain
pub const SEA_LEVEL: i32 = 60;
pub const DEFAULT_TERRAIN_HEIGHT: f32 = 64.0;
pub const SURFACE_LAYER_DEPTH: i32 = 3;
pub const OBSIDIAN_Z: i32 = 1;
pub const LAVA_Z: i32 = 0;
pub const SQUASH_MULT: f32 = 3.5;

pub const DENSITY_NOISE_SCALE: f32 = 128.0;
pub const DENSITY_OCTAVES: i32 = 8;
pub const CONTINENT_SCALE: f32 = 256.0;
pub const CONTINENT_OCTAVES: i32 = 2;
pub const BIOME_OCTAVES: i32 = 4;
pub const CONTINENTALNESS_SCALE: f32 = 512.0;
pub const EROSION_SCALE: f32 = 256.0;
pub const PEAKS_VALLEYS_SCALE: f32 = 256.0;
pub const TEMPERATURE_SCALE: f32 = 512.0;
pub const HUMIDITY_SCALE: f32 = 512.0;

pub const TREE_THRESHOLD: f32 = 0.975;
pub const CAVE_CHUNK_THRESHOLD: f32 = 0.925;

// Sprite atlas is an 8x8 grid of cells
pub const SPRITE_GRID_SIZE: u32 = 8;

// Streaming defaults
pub const DEFAULT_ACTIVATION_RANGE: f32 = 360.0;
pub const MAX_GENERATE_JOBS: usize = 3000;
pub const MAX_LOAD_JOBS: usize = 2;
pub const MAX_SAVE_JOBS: usize = 2;
pub const MAX_MESHES_PER_TICK: usize = 2;
pub const MISSING_CHUNK_SCAN_BUDGET: usize = 25;

// Raycast step for an axis the ray never crosses
pub const RAYCAST_NO_STEP: f32 = 99999.0;
