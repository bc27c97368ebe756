use serde::{Deserialize, Serialize};

use crate::constants::MAX_LIGHT;
use crate::core::block_def::BlockRegistry;

/// Block type id. The numeric value is what gets persisted.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    Air = 0,
    Water,
    Sand,
    Snow,
    Ice,
    Dirt,
    Stone,
    Coal,
    Iron,
    Gold,
    Diamond,
    Obsidian,
    Lava,
    Glowstone,
    Cobblestone,
    ChiseledBrick,
    Grass,
    GrassLight,
    GrassDark,
    GrassYellow,
    AcaciaLog,
    AcaciaPlanks,
    AcaciaLeaves,
    Cactus,
    OakLog,
    OakPlanks,
    OakLeaves,
    BirchLog,
    BirchPlanks,
    BirchLeaves,
    JungleLog,
    JunglePlanks,
    JungleLeaves,
    SpruceLog,
    SprucePlanks,
    SpruceLeaves,
    SpruceLeavesSnow,
}

impl BlockType {
    pub const COUNT: usize = 37;

    pub const ALL: [BlockType; Self::COUNT] = [
        BlockType::Air,
        BlockType::Water,
        BlockType::Sand,
        BlockType::Snow,
        BlockType::Ice,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Coal,
        BlockType::Iron,
        BlockType::Gold,
        BlockType::Diamond,
        BlockType::Obsidian,
        BlockType::Lava,
        BlockType::Glowstone,
        BlockType::Cobblestone,
        BlockType::ChiseledBrick,
        BlockType::Grass,
        BlockType::GrassLight,
        BlockType::GrassDark,
        BlockType::GrassYellow,
        BlockType::AcaciaLog,
        BlockType::AcaciaPlanks,
        BlockType::AcaciaLeaves,
        BlockType::Cactus,
        BlockType::OakLog,
        BlockType::OakPlanks,
        BlockType::OakLeaves,
        BlockType::BirchLog,
        BlockType::BirchPlanks,
        BlockType::BirchLeaves,
        BlockType::JungleLog,
        BlockType::JunglePlanks,
        BlockType::JungleLeaves,
        BlockType::SpruceLog,
        BlockType::SprucePlanks,
        BlockType::SpruceLeaves,
        BlockType::SpruceLeavesSnow,
    ];

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a type by its persisted id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn is_leaves(self) -> bool {
        matches!(
            self,
            BlockType::AcaciaLeaves
                | BlockType::OakLeaves
                | BlockType::BirchLeaves
                | BlockType::JungleLeaves
                | BlockType::SpruceLeaves
                | BlockType::SpruceLeavesSnow
        )
    }
}

// Flag bits
pub const IS_SKY: u8 = 1 << 0;
pub const IS_LIGHT_DIRTY: u8 = 1 << 1;
pub const IS_FULL_OPAQUE: u8 = 1 << 2;
pub const IS_SOLID: u8 = 1 << 3;
pub const IS_VISIBLE: u8 = 1 << 4;

const DEFINITION_FLAGS: u8 = IS_FULL_OPAQUE | IS_SOLID | IS_VISIBLE;

/// One voxel: type, packed light (indoor low nibble, outdoor high nibble) and flags.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Block {
    block_type: BlockType,
    light: u8,
    flags: u8,
}

impl Block {
    pub fn new(block_type: BlockType, registry: &BlockRegistry) -> Self {
        let mut block = Block::default();
        block.set_type(block_type, registry);
        block
    }

    #[inline]
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Set the type and refresh the opaque/solid/visible flags from its definition.
    /// Sky and light-dirty flags are left alone.
    pub fn set_type(&mut self, block_type: BlockType, registry: &BlockRegistry) {
        let def = registry.get(block_type);
        self.block_type = block_type;
        self.flags &= !DEFINITION_FLAGS;
        if def.is_opaque {
            self.flags |= IS_FULL_OPAQUE;
        }
        if def.is_solid {
            self.flags |= IS_SOLID;
        }
        if def.is_visible {
            self.flags |= IS_VISIBLE;
        }
    }

    #[inline]
    pub fn indoor_light(&self) -> u8 {
        self.light & 0x0F
    }

    #[inline]
    pub fn outdoor_light(&self) -> u8 {
        self.light >> 4
    }

    #[inline]
    pub fn set_indoor_light(&mut self, value: u8) {
        self.light = (self.light & 0xF0) | value.min(MAX_LIGHT);
    }

    #[inline]
    pub fn set_outdoor_light(&mut self, value: u8) {
        self.light = (self.light & 0x0F) | (value.min(MAX_LIGHT) << 4);
    }

    #[inline]
    pub fn packed_light(&self) -> u8 {
        self.light
    }

    #[inline]
    pub fn is_sky(&self) -> bool {
        self.flags & IS_SKY != 0
    }

    #[inline]
    pub fn is_light_dirty(&self) -> bool {
        self.flags & IS_LIGHT_DIRTY != 0
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.flags & IS_FULL_OPAQUE != 0
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.flags & IS_SOLID != 0
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags & IS_VISIBLE != 0
    }

    #[inline]
    pub fn set_sky(&mut self, sky: bool) {
        self.set_flag(IS_SKY, sky);
    }

    #[inline]
    pub fn set_light_dirty(&mut self, dirty: bool) {
        self.set_flag(IS_LIGHT_DIRTY, dirty);
    }

    /// Zero both light channels and drop the sky and dirty flags.
    pub fn reset_lighting(&mut self) {
        self.light = 0;
        self.flags &= !(IS_SKY | IS_LIGHT_DIRTY);
    }

    #[inline]
    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}
