use glam::{IVec3, Vec3};

use crate::constants::{CHUNK_SIZE_Z, RAYCAST_NO_STEP};
use crate::core::iterator::{BlockFace, BlockIterator};
use crate::world::active::ActiveChunks;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub position: Vec3,
    pub distance: f32,
    /// Face of the hit block the ray entered through. Zero when the ray
    /// started inside a solid block.
    pub normal: IVec3,
    pub block: BlockIterator,
}

/// Walk the voxel grid along a ray and return the first solid block.
///
/// `distance` is measured to the face the ray entered through, not to the
/// voxel center: from `z = 10.5` straight down onto a solid block at `z = 5`
/// it is 4.5, since the top face of that block sits at `z = 6`.
///
/// `direction` is expected to be normalized. Rays leave the loaded world as
/// soon as the walk reaches an inactive chunk or the vertical bounds.
pub fn raycast(
    chunks: &ActiveChunks,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<RaycastHit> {
    if origin.z < 0.0 || origin.z >= CHUNK_SIZE_Z as f32 {
        return None;
    }

    let start = origin.floor().as_ivec3();
    let mut it = chunks.iterator_at(start);
    if !it.is_valid() {
        return None;
    }

    let step = Vec3::new(
        axis_step(direction.x),
        axis_step(direction.y),
        axis_step(direction.z),
    );
    let step_dir = IVec3::new(
        if direction.x < 0.0 { -1 } else { 1 },
        if direction.y < 0.0 { -1 } else { 1 },
        if direction.z < 0.0 { -1 } else { 1 },
    );
    let cell = start.as_vec3();
    let mut boundary = Vec3::new(
        first_boundary(origin.x, cell.x, step.x, direction.x),
        first_boundary(origin.y, cell.y, step.y, direction.y),
        first_boundary(origin.z, cell.z, step.z, direction.z),
    );

    let mut traveled = 0.0;
    let mut normal = IVec3::ZERO;

    while traveled < max_distance {
        let block = it.block(chunks)?;
        if block.is_solid() {
            return Some(RaycastHit {
                position: origin + direction * traveled,
                distance: traveled,
                normal,
                block: it,
            });
        }

        let face = if boundary.x < boundary.y && boundary.x < boundary.z {
            traveled = boundary.x;
            boundary.x += step.x;
            normal = IVec3::new(-step_dir.x, 0, 0);
            if step_dir.x > 0 { BlockFace::East } else { BlockFace::West }
        } else if boundary.y < boundary.z {
            traveled = boundary.y;
            boundary.y += step.y;
            normal = IVec3::new(0, -step_dir.y, 0);
            if step_dir.y > 0 { BlockFace::North } else { BlockFace::South }
        } else {
            traveled = boundary.z;
            boundary.z += step.z;
            normal = IVec3::new(0, 0, -step_dir.z);
            if step_dir.z > 0 { BlockFace::Top } else { BlockFace::Bottom }
        };
        it = it.neighbor(face, chunks);
    }

    None
}

fn axis_step(component: f32) -> f32 {
    if component != 0.0 {
        1.0 / component.abs()
    } else {
        RAYCAST_NO_STEP
    }
}

/// Ray length to the first grid plane crossed on one axis.
fn first_boundary(origin: f32, cell: f32, step: f32, component: f32) -> f32 {
    if component < 0.0 {
        (origin - cell) * step
    } else {
        (cell + 1.0 - origin) * step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockType;
    use crate::core::block_def::BlockRegistry;
    use crate::core::chunk::Chunk;
    use glam::IVec2;

    fn world_with(blocks: &[(IVec2, IVec3)]) -> ActiveChunks {
        let registry = BlockRegistry::standard();
        let mut chunks = ActiveChunks::default();
        for x in -1..=1 {
            for y in -1..=1 {
                assert!(chunks.insert(Box::new(Chunk::new(IVec2::new(x, y)))).is_ok());
            }
        }
        for (at, local) in blocks {
            if let Some(chunk) = chunks.get_mut(*at) {
                chunk.set_generated_type(*local, BlockType::Stone, &registry);
            }
        }
        chunks
    }

    #[test]
    fn test_straight_down_hits_top_face() {
        let chunks = world_with(&[(IVec2::ZERO, IVec3::new(0, 0, 5))]);

        let hit = raycast(&chunks, Vec3::new(0.5, 0.5, 11.0), Vec3::NEG_Z, 20.0).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert_eq!(hit.normal, IVec3::Z);
        assert_eq!(hit.block.global_coords(), Some(IVec3::new(0, 0, 5)));
        assert!((hit.position.z - 6.0).abs() < 1e-5);

        // from the middle of a voxel the top face is half a block closer
        let hit = raycast(&chunks, Vec3::new(0.5, 0.5, 10.5), Vec3::NEG_Z, 20.0).unwrap();
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert_eq!(hit.normal, IVec3::Z);
        assert_eq!(hit.block.global_coords(), Some(IVec3::new(0, 0, 5)));
    }

    #[test]
    fn test_max_distance_limits_the_walk() {
        let chunks = world_with(&[(IVec2::ZERO, IVec3::new(0, 0, 5))]);
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, 10.5), Vec3::NEG_Z, 4.0).is_none());
    }

    #[test]
    fn test_crosses_chunk_edges() {
        // block at global (-3, 4, 20) lives in chunk (-1, 0)
        let chunks = world_with(&[(IVec2::new(-1, 0), IVec3::new(29, 4, 20))]);
        let hit = raycast(&chunks, Vec3::new(5.5, 4.5, 20.5), Vec3::NEG_X, 32.0).unwrap();
        assert_eq!(hit.block.global_coords(), Some(IVec3::new(-3, 4, 20)));
        assert_eq!(hit.block.chunk_coords(), Some(IVec2::new(-1, 0)));
        assert_eq!(hit.normal, IVec3::X);
        assert!((hit.distance - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_diagonal_ray_reports_entry_face() {
        let chunks = world_with(&[(IVec2::ZERO, IVec3::new(4, 3, 10))]);
        let dir = Vec3::new(1.0, 0.5, 0.0).normalize();
        let hit = raycast(&chunks, Vec3::new(0.5, 1.2, 10.5), dir, 16.0).unwrap();
        assert_eq!(hit.block.global_coords(), Some(IVec3::new(4, 3, 10)));
        assert!(hit.normal == IVec3::NEG_X || hit.normal == IVec3::NEG_Y);
    }

    #[test]
    fn test_leaving_loaded_world_misses() {
        let chunks = world_with(&[]);
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, 10.5), Vec3::X, 200.0).is_none());
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, 10.5), Vec3::NEG_Z, 200.0).is_none());
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, 10.5), Vec3::Z, 500.0).is_none());
    }

    #[test]
    fn test_rejects_bad_origins() {
        let chunks = world_with(&[]);
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, -1.0), Vec3::Z, 10.0).is_none());
        assert!(raycast(&chunks, Vec3::new(0.5, 0.5, 200.0), Vec3::NEG_Z, 10.0).is_none());
        assert!(raycast(&chunks, Vec3::new(500.0, 0.5, 10.0), Vec3::X, 10.0).is_none());
    }

    #[test]
    fn test_solid_start_hits_immediately() {
        let chunks = world_with(&[(IVec2::ZERO, IVec3::new(2, 2, 2))]);
        let hit = raycast(&chunks, Vec3::new(2.5, 2.5, 2.5), Vec3::Z, 10.0).unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, IVec3::ZERO);
    }
}
