use glam::IVec3;

use crate::core::block::BlockType;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TreeKind {
    SmallOak,
    LargeOak,
    Spruce,
    SnowySpruce,
    Birch,
    Acacia,
    Jungle,
    Cactus,
}

impl TreeKind {
    pub const ALL: [TreeKind; 8] = [
        TreeKind::SmallOak,
        TreeKind::LargeOak,
        TreeKind::Spruce,
        TreeKind::SnowySpruce,
        TreeKind::Birch,
        TreeKind::Acacia,
        TreeKind::Jungle,
        TreeKind::Cactus,
    ];
}

/// Voxel offsets relative to the block just above the surface.
#[derive(Debug, Clone)]
pub struct TreeStamp {
    pub kind: TreeKind,
    /// Horizontal reach from the trunk. Trunks this close to a chunk edge
    /// spill into the neighbor.
    pub radius: i32,
    pub blocks: Vec<(IVec3, BlockType)>,
}

impl TreeStamp {
    fn new(kind: TreeKind, radius: i32) -> Self {
        Self {
            kind,
            radius,
            blocks: Vec::new(),
        }
    }

    fn with_block(mut self, offset: IVec3, block: BlockType) -> Self {
        self.blocks.push((offset, block));
        self
    }

    fn with_trunk(self, height: i32, log: BlockType) -> Self {
        (0..height).fold(self, |stamp, z| stamp.with_block(IVec3::new(0, 0, z), log))
    }

    /// Leaf ball centered on the trunk top, layers `first_layer..=height + 2`.
    fn with_canopy(mut self, height: i32, first_layer: i32, threshold: f32, leaves: BlockType) -> Self {
        for z in first_layer..=height + 2 {
            let dz = z - height;
            let radius = 2 - dz.abs();
            for y in -radius..=radius {
                for x in -radius..=radius {
                    if ((x * x + y * y + dz * dz) as f32) < threshold {
                        self.blocks.push((IVec3::new(x, y, z), leaves));
                    }
                }
            }
        }
        self
    }

    pub fn build(kind: TreeKind) -> Self {
        use BlockType::*;
        let stamp = TreeStamp::new(kind, 2);
        match kind {
            TreeKind::SmallOak => stamp.with_trunk(4, OakLog).with_canopy(4, 2, 3.0, OakLeaves),
            TreeKind::LargeOak => stamp.with_trunk(7, OakLog).with_canopy(7, 5, 27.5, OakLeaves),
            TreeKind::Spruce => stamp.with_trunk(7, SpruceLog).with_canopy(7, 5, 5.0, SpruceLeaves),
            TreeKind::SnowySpruce => stamp
                .with_trunk(7, SpruceLog)
                .with_canopy(7, 5, 8.0, SpruceLeavesSnow),
            TreeKind::Birch => stamp.with_trunk(7, BirchLog).with_canopy(7, 5, 6.0, BirchLeaves),
            TreeKind::Acacia => stamp.with_trunk(7, AcaciaLog).with_canopy(7, 7, 6.0, AcaciaLeaves),
            TreeKind::Jungle => stamp.with_trunk(7, JungleLog).with_canopy(7, 5, 6.0, JungleLeaves),
            TreeKind::Cactus => TreeStamp::new(kind, 1).with_trunk(3, Cactus),
        }
    }
}

/// Every stamp, built once per generator.
#[derive(Debug, Clone)]
pub struct TreeStamps {
    stamps: Vec<TreeStamp>,
}

impl TreeStamps {
    pub fn new() -> Self {
        Self {
            stamps: TreeKind::ALL.into_iter().map(TreeStamp::build).collect(),
        }
    }

    pub fn get(&self, kind: TreeKind) -> &TreeStamp {
        &self.stamps[kind as usize]
    }
}

impl Default for TreeStamps {
    fn default() -> Self {
        Self::new()
    }
}
