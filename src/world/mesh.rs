use glam::{UVec2, Vec3};

use crate::constants::*;
use crate::core::block_def::BlockRegistry;
use crate::core::chunk::ChunkCoords;
use crate::core::coords;
use crate::core::iterator::{BlockFace, BlockIterator};
use crate::core::vertex::{ChunkMesh, Vertex};
use crate::world::active::ActiveChunks;

/// Fixed per-face shade, stored in the blue channel.
pub fn face_tint(face: BlockFace) -> u8 {
    match face {
        BlockFace::Top | BlockFace::Bottom => 255,
        BlockFace::East | BlockFace::West => 230,
        BlockFace::North | BlockFace::South => 200,
    }
}

/// Atlas rectangle for a sprite cell as `(min, max)` in texture space.
pub fn sprite_uvs(cell: UVec2) -> ([f32; 2], [f32; 2]) {
    let size = 1.0 / SPRITE_GRID_SIZE as f32;
    let min = [cell.x as f32 * size, cell.y as f32 * size];
    let max = [min[0] + size, min[1] + size];
    (min, max)
}

/// Corners of a block face as bottom-left, bottom-right, top-right,
/// top-left when viewed from outside.
fn face_corners(mins: Vec3, face: BlockFace) -> [Vec3; 4] {
    let maxs = mins + Vec3::ONE;
    match face {
        BlockFace::East => [
            Vec3::new(maxs.x, mins.y, mins.z),
            Vec3::new(maxs.x, maxs.y, mins.z),
            Vec3::new(maxs.x, maxs.y, maxs.z),
            Vec3::new(maxs.x, mins.y, maxs.z),
        ],
        BlockFace::West => [
            Vec3::new(mins.x, maxs.y, mins.z),
            Vec3::new(mins.x, mins.y, mins.z),
            Vec3::new(mins.x, mins.y, maxs.z),
            Vec3::new(mins.x, maxs.y, maxs.z),
        ],
        BlockFace::North => [
            Vec3::new(maxs.x, maxs.y, mins.z),
            Vec3::new(mins.x, maxs.y, mins.z),
            Vec3::new(mins.x, maxs.y, maxs.z),
            Vec3::new(maxs.x, maxs.y, maxs.z),
        ],
        BlockFace::South => [
            Vec3::new(mins.x, mins.y, mins.z),
            Vec3::new(maxs.x, mins.y, mins.z),
            Vec3::new(maxs.x, mins.y, maxs.z),
            Vec3::new(mins.x, mins.y, maxs.z),
        ],
        BlockFace::Top => [
            Vec3::new(mins.x, mins.y, maxs.z),
            Vec3::new(maxs.x, mins.y, maxs.z),
            Vec3::new(maxs.x, maxs.y, maxs.z),
            Vec3::new(mins.x, maxs.y, maxs.z),
        ],
        BlockFace::Bottom => [
            Vec3::new(mins.x, maxs.y, mins.z),
            Vec3::new(maxs.x, maxs.y, mins.z),
            Vec3::new(maxs.x, mins.y, mins.z),
            Vec3::new(mins.x, mins.y, mins.z),
        ],
    }
}

pub fn add_quad(mesh: &mut ChunkMesh, corners: [Vec3; 4], uvs: ([f32; 2], [f32; 2]), color: [u8; 4]) {
    let base_idx = mesh.vertices.len() as u32;
    let (min, max) = uvs;
    let corner_uvs = [[min[0], max[1]], [max[0], max[1]], [max[0], min[1]], [min[0], min[1]]];
    for (corner, uv) in corners.into_iter().zip(corner_uvs) {
        mesh.vertices.push(Vertex {
            position: corner.to_array(),
            uv,
            color,
        });
    }
    mesh.indices.extend_from_slice(&[
        base_idx,
        base_idx + 1,
        base_idx + 2,
        base_idx,
        base_idx + 2,
        base_idx + 3,
    ]);
}

/// Build the visible-face mesh for one active chunk.
///
/// A face is emitted when the block beyond it is unloaded or not opaque.
/// Its color comes from that outward neighbor's light: red is outdoor,
/// green is indoor, blue is the face tint.
pub fn build_chunk_mesh(
    chunks: &ActiveChunks,
    registry: &BlockRegistry,
    at: ChunkCoords,
    lighting_enabled: bool,
) -> Option<ChunkMesh> {
    let chunk = chunks.get(at)?;
    let mut mesh = ChunkMesh::default();

    for (index, block) in chunk.blocks().iter().enumerate() {
        if !block.is_visible() {
            continue;
        }
        let def = registry.get(block.block_type());
        let it = BlockIterator::new(at, index);
        let mins = coords::global_from_index(at, index).as_vec3();

        for face in BlockFace::ALL {
            let neighbor = it.neighbor(face, chunks).block(chunks);
            if neighbor.is_some_and(|n| n.is_opaque()) {
                continue;
            }

            let sprite = match face {
                BlockFace::Top => def.top_sprite,
                BlockFace::Bottom => def.bottom_sprite,
                _ => def.side_sprite,
            };
            let tint = face_tint(face);
            let color = if lighting_enabled {
                let (outdoor, indoor) =
                    neighbor.map_or((0, 0), |n| (n.outdoor_light(), n.indoor_light()));
                [light_channel(outdoor), light_channel(indoor), tint, 255]
            } else {
                [tint, tint, tint, 255]
            };
            add_quad(&mut mesh, face_corners(mins, face), sprite_uvs(sprite), color);
        }
    }

    Some(mesh)
}

fn light_channel(level: u8) -> u8 {
    ((level.min(MAX_LIGHT) as u32 * 255) / MAX_LIGHT as u32) as u8
}
