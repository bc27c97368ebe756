//! Voxel grid coding
//!
//! Conversions between local block indices, local coordinates and global
//! coordinates. Everything is a shift or a mask derived from the chunk bit
//! widths in `constants`, so negative global coordinates floor correctly.

use glam::{IVec2, IVec3, Vec2, Vec3};

use crate::constants::*;

/// Pack a local coordinate into a block index. X varies fastest, then Y, then Z.
#[inline]
pub const fn block_index(x: i32, y: i32, z: i32) -> usize {
    (x | (y << CHUNK_BITS_X) | (z << (CHUNK_BITS_X + CHUNK_BITS_Y))) as usize
}

#[inline]
pub fn block_index_of(local: IVec3) -> usize {
    block_index(local.x, local.y, local.z)
}

#[inline]
pub const fn local_x(index: usize) -> i32 {
    index as i32 & CHUNK_MASK_X
}

#[inline]
pub const fn local_y(index: usize) -> i32 {
    (index as i32 >> CHUNK_BITS_X) & CHUNK_MASK_Y
}

#[inline]
pub const fn local_z(index: usize) -> i32 {
    (index as i32 >> (CHUNK_BITS_X + CHUNK_BITS_Y)) & CHUNK_MASK_Z
}

/// Unpack a block index into its local coordinate.
#[inline]
pub fn local_coords(index: usize) -> IVec3 {
    IVec3::new(local_x(index), local_y(index), local_z(index))
}

/// True when a local coordinate lies inside one chunk.
#[inline]
pub fn is_local_in_bounds(local: IVec3) -> bool {
    (0..CHUNK_SIZE_X).contains(&local.x)
        && (0..CHUNK_SIZE_Y).contains(&local.y)
        && (0..CHUNK_SIZE_Z).contains(&local.z)
}

/// Chunk containing a global block coordinate (floor division).
#[inline]
pub fn chunk_coords_of(global: IVec3) -> IVec2 {
    IVec2::new(global.x >> CHUNK_BITS_X, global.y >> CHUNK_BITS_Y)
}

/// Chunk containing a world-space position.
#[inline]
pub fn chunk_coords_at(position: Vec2) -> IVec2 {
    let block = position.floor().as_ivec2();
    IVec2::new(block.x >> CHUNK_BITS_X, block.y >> CHUNK_BITS_Y)
}

/// Local coordinate of a global block coordinate. Z is not chunked.
#[inline]
pub fn local_from_global(global: IVec3) -> IVec3 {
    IVec3::new(global.x & CHUNK_MASK_X, global.y & CHUNK_MASK_Y, global.z)
}

#[inline]
pub fn global_from_local(chunk: IVec2, local: IVec3) -> IVec3 {
    IVec3::new(
        (chunk.x << CHUNK_BITS_X) + local.x,
        (chunk.y << CHUNK_BITS_Y) + local.y,
        local.z,
    )
}

#[inline]
pub fn global_from_index(chunk: IVec2, index: usize) -> IVec3 {
    global_from_local(chunk, local_coords(index))
}

/// World-space origin (minimum corner) of a chunk.
#[inline]
pub fn chunk_origin(chunk: IVec2) -> Vec3 {
    Vec3::new(
        (chunk.x * CHUNK_SIZE_X) as f32,
        (chunk.y * CHUNK_SIZE_Y) as f32,
        0.0,
    )
}

/// Horizontal center of a chunk in world space.
#[inline]
pub fn chunk_center(chunk: IVec2) -> Vec2 {
    Vec2::new(
        chunk.x as f32 * CHUNK_SIZE_X as f32 + CHUNK_SIZE_X as f32 * 0.5,
        chunk.y as f32 * CHUNK_SIZE_Y as f32 + CHUNK_SIZE_Y as f32 * 0.5,
    )
}
