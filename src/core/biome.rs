use crate::core::block::BlockType;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Biome {
    Ocean,
    DeepOcean,
    FrozenOcean,
    Beach,
    SnowyBeach,
    Desert,
    Badlands,
    #[default]
    Plains,
    Forest,
    Taiga,
    SnowyTaiga,
    SnowyPlains,
    Jungle,
    Savanna,
}

/// Climate samples for one world column, each roughly in [-1, 1].
#[derive(Clone, Copy, Debug, Default)]
pub struct BiomeParams {
    pub continentalness: f32,
    pub erosion: f32,
    pub peaks_valleys: f32,
    pub temperature: f32,
    pub humidity: f32,
}

/// Blocks used for the first few solid layers of a column.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SurfaceBlocks {
    pub top: BlockType,
    pub sub: BlockType,
    pub underwater: BlockType,
}

impl SurfaceBlocks {
    const fn new(top: BlockType, sub: BlockType, underwater: BlockType) -> Self {
        Self {
            top,
            sub,
            underwater,
        }
    }
}

pub fn temperature_band(value: f32) -> u8 {
    match value {
        v if v < -0.45 => 0,
        v if v < -0.15 => 1,
        v if v < 0.20 => 2,
        v if v < 0.55 => 3,
        _ => 4,
    }
}

pub fn humidity_band(value: f32) -> u8 {
    match value {
        v if v < -0.35 => 0,
        v if v < -0.10 => 1,
        v if v < 0.10 => 2,
        v if v < 0.30 => 3,
        _ => 4,
    }
}

/// 0-1 deep ocean, 2 ocean, 3 coast, 4-6 increasingly inland.
pub fn continentalness_band(value: f32) -> u8 {
    match value {
        v if v < -1.05 => 0,
        v if v < -0.455 => 1,
        v if v < -0.19 => 2,
        v if v < -0.11 => 3,
        v if v < 0.03 => 4,
        v if v < 0.30 => 5,
        _ => 6,
    }
}

impl Biome {
    /// Bucket climate samples into a biome.
    pub fn classify(params: &BiomeParams) -> Biome {
        let temp = temperature_band(params.temperature);
        let humidity = humidity_band(params.humidity);
        let continent = continentalness_band(params.continentalness);

        if continent <= 2 {
            return match (temp, continent) {
                (0, _) => Biome::FrozenOcean,
                (_, 0..=1) => Biome::DeepOcean,
                _ => Biome::Ocean,
            };
        }

        if continent == 3 {
            return match temp {
                0 => Biome::SnowyBeach,
                1..=3 => Biome::Beach,
                _ => Biome::Desert,
            };
        }

        match temp {
            0 => match humidity {
                0..=1 => Biome::SnowyPlains,
                3 => Biome::SnowyTaiga,
                _ => Biome::Taiga,
            },
            1 => match humidity {
                0..=1 => Biome::Plains,
                2 => Biome::Taiga,
                _ => Biome::Forest,
            },
            2 => match humidity {
                0..=1 => Biome::Plains,
                _ => Biome::Forest,
            },
            3 => match humidity {
                0..=1 => Biome::Savanna,
                2 => Biome::Forest,
                _ => Biome::Jungle,
            },
            _ => match humidity {
                0..=2 => Biome::Desert,
                _ => Biome::Badlands,
            },
        }
    }

    pub fn surface_blocks(&self) -> SurfaceBlocks {
        use BlockType::*;
        match self {
            Biome::Ocean | Biome::DeepOcean => SurfaceBlocks::new(Sand, Ice, Sand),
            Biome::FrozenOcean => SurfaceBlocks::new(Snow, Ice, Sand),
            Biome::Beach => SurfaceBlocks::new(Sand, Sand, Sand),
            Biome::SnowyBeach => SurfaceBlocks::new(Snow, Snow, Sand),
            Biome::Desert => SurfaceBlocks::new(Sand, Sand, Sand),
            Biome::Badlands => SurfaceBlocks::new(GrassLight, Dirt, Stone),
            Biome::Plains => SurfaceBlocks::new(Grass, Dirt, Sand),
            Biome::Forest => SurfaceBlocks::new(Grass, Dirt, Stone),
            Biome::Taiga => SurfaceBlocks::new(GrassLight, Dirt, Stone),
            Biome::SnowyTaiga => SurfaceBlocks::new(Snow, Ice, Stone),
            Biome::SnowyPlains => SurfaceBlocks::new(Snow, Dirt, Sand),
            Biome::Jungle => SurfaceBlocks::new(GrassDark, Dirt, Sand),
            Biome::Savanna => SurfaceBlocks::new(GrassYellow, Dirt, Stone),
        }
    }

    pub fn is_ocean(&self) -> bool {
        matches!(self, Biome::Ocean | Biome::DeepOcean | Biome::FrozenOcean)
    }
}
