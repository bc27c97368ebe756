//! Static block definitions
//!
//! Built once at startup and shared read-only (usually behind an `Arc`)
//! by the world, the generator and background jobs. The table is either the
//! built-in one or a bincode definition list loaded from disk.

use glam::UVec2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::constants::MAX_LIGHT;
use crate::core::block::BlockType;
use crate::error::RegistryError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    pub is_visible: bool,
    pub is_solid: bool,
    pub is_opaque: bool,
    /// Atlas cells, in sprite grid units
    pub top_sprite: UVec2,
    pub side_sprite: UVec2,
    pub bottom_sprite: UVec2,
    pub indoor_light: u8,
    pub outdoor_light: u8,
}

impl BlockDefinition {
    fn solid(name: &str, sprite: (u32, u32)) -> Self {
        let cell = UVec2::new(sprite.0, sprite.1);
        Self {
            name: name.to_owned(),
            is_visible: true,
            is_solid: true,
            is_opaque: true,
            top_sprite: cell,
            side_sprite: cell,
            bottom_sprite: cell,
            indoor_light: 0,
            outdoor_light: 0,
        }
    }

    fn faces(mut self, top: (u32, u32), side: (u32, u32), bottom: (u32, u32)) -> Self {
        self.top_sprite = UVec2::new(top.0, top.1);
        self.side_sprite = UVec2::new(side.0, side.1);
        self.bottom_sprite = UVec2::new(bottom.0, bottom.1);
        self
    }

    fn translucent(mut self) -> Self {
        self.is_opaque = false;
        self
    }

    fn emissive(mut self, indoor: u8) -> Self {
        self.indoor_light = indoor;
        self
    }

    pub fn emits_light(&self) -> bool {
        self.indoor_light > 0 || self.outdoor_light > 0
    }
}

/// Definition table indexed by block type id.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    definitions: Vec<BlockDefinition>,
}

impl BlockRegistry {
    /// The built-in definition table.
    pub fn standard() -> Self {
        let air = BlockDefinition {
            is_visible: false,
            is_solid: false,
            is_opaque: false,
            ..BlockDefinition::solid("air", (0, 0))
        };
        let water = BlockDefinition {
            is_solid: false,
            is_opaque: false,
            ..BlockDefinition::solid("water", (0, 2))
        };

        let definitions = vec![
            air,
            water,
            BlockDefinition::solid("sand", (1, 2)),
            BlockDefinition::solid("snow", (2, 2)),
            BlockDefinition::solid("ice", (3, 2)),
            BlockDefinition::solid("dirt", (4, 2)),
            BlockDefinition::solid("stone", (5, 2)),
            BlockDefinition::solid("coal", (6, 2)),
            BlockDefinition::solid("iron", (7, 2)),
            BlockDefinition::solid("gold", (0, 3)),
            BlockDefinition::solid("diamond", (1, 3)),
            BlockDefinition::solid("obsidian", (2, 3)),
            BlockDefinition::solid("lava", (3, 3)).emissive(15),
            BlockDefinition::solid("glowstone", (4, 3)).emissive(15),
            BlockDefinition::solid("cobblestone", (5, 3)),
            BlockDefinition::solid("chiseledBrick", (6, 3)),
            BlockDefinition::solid("grass", (0, 1)).faces((0, 1), (1, 1), (4, 2)),
            BlockDefinition::solid("grassLight", (2, 1)).faces((2, 1), (3, 1), (4, 2)),
            BlockDefinition::solid("grassDark", (4, 1)).faces((4, 1), (5, 1), (4, 2)),
            BlockDefinition::solid("grassYellow", (6, 1)).faces((6, 1), (7, 1), (4, 2)),
            BlockDefinition::solid("acaciaLog", (0, 4)).faces((1, 4), (0, 4), (1, 4)),
            BlockDefinition::solid("acaciaPlanks", (2, 4)),
            BlockDefinition::solid("acaciaLeaves", (3, 4)).translucent(),
            BlockDefinition::solid("cactus", (4, 4)).faces((5, 4), (4, 4), (5, 4)),
            BlockDefinition::solid("oakLog", (0, 5)).faces((1, 5), (0, 5), (1, 5)),
            BlockDefinition::solid("oakPlanks", (2, 5)),
            BlockDefinition::solid("oakLeaves", (3, 5)).translucent(),
            BlockDefinition::solid("birchLog", (4, 5)).faces((5, 5), (4, 5), (5, 5)),
            BlockDefinition::solid("birchPlanks", (6, 5)),
            BlockDefinition::solid("birchLeaves", (7, 5)).translucent(),
            BlockDefinition::solid("jungleLog", (0, 6)).faces((1, 6), (0, 6), (1, 6)),
            BlockDefinition::solid("junglePlanks", (2, 6)),
            BlockDefinition::solid("jungleLeaves", (3, 6)).translucent(),
            BlockDefinition::solid("spruceLog", (4, 6)).faces((5, 6), (4, 6), (5, 6)),
            BlockDefinition::solid("sprucePlanks", (6, 6)),
            BlockDefinition::solid("spruceLeaves", (7, 6)).translucent(),
            BlockDefinition::solid("spruceLeavesSnow", (0, 7)).translucent(),
        ];
        debug_assert_eq!(definitions.len(), BlockType::COUNT);

        Self { definitions }
    }

    /// Build a table from a definition list ordered by block type id.
    pub fn from_definitions(definitions: Vec<BlockDefinition>) -> Result<Self, RegistryError> {
        if definitions.len() != BlockType::COUNT {
            return Err(RegistryError::WrongCount {
                expected: BlockType::COUNT,
                found: definitions.len(),
            });
        }
        if let Some(def) = definitions
            .iter()
            .find(|def| def.indoor_light > MAX_LIGHT || def.outdoor_light > MAX_LIGHT)
        {
            return Err(RegistryError::LightOutOfRange {
                name: def.name.clone(),
                value: def.indoor_light.max(def.outdoor_light),
            });
        }
        Ok(Self { definitions })
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let definitions: Vec<BlockDefinition> = bincode::deserialize_from(&mut reader)?;
        let registry = Self::from_definitions(definitions)?;
        tracing::info!("Loaded {} block definitions from {:?}", registry.len(), path);
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.definitions)?;
        writer.flush()?;
        Ok(())
    }

    #[inline]
    pub fn get(&self, block_type: BlockType) -> &BlockDefinition {
        &self.definitions[block_type as usize]
    }

    pub fn by_name(&self, name: &str) -> Option<BlockType> {
        self.definitions
            .iter()
            .position(|def| def.name == name)
            .and_then(|index| BlockType::from_id(index as u8))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
