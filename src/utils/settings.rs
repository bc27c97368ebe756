use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::SettingsError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorldSettings {
    pub seed: u32,
    /// Horizontal distance in blocks within which chunks are activated.
    pub activation_range: f32,
    pub max_generate_jobs: usize,
    pub max_load_jobs: usize,
    pub max_save_jobs: usize,
    pub max_meshes_per_tick: usize,
    pub missing_chunk_scan_budget: usize,
    pub lighting_enabled: bool,
    pub save_dir: PathBuf,
    /// 0 picks one less than the number of cores.
    pub worker_threads: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            activation_range: DEFAULT_ACTIVATION_RANGE,
            max_generate_jobs: MAX_GENERATE_JOBS,
            max_load_jobs: MAX_LOAD_JOBS,
            max_save_jobs: MAX_SAVE_JOBS,
            max_meshes_per_tick: MAX_MESHES_PER_TICK,
            missing_chunk_scan_budget: MISSING_CHUNK_SCAN_BUDGET,
            lighting_enabled: true,
            save_dir: PathBuf::from("Saves"),
            worker_threads: 0,
        }
    }
}

impl WorldSettings {
    /// Chunks past this distance are evicted. One chunk wider than the
    /// activation range on each axis, so boundary chunks don't flap.
    pub fn deactivation_range(&self) -> f32 {
        self.activation_range + (CHUNK_SIZE_X + CHUNK_SIZE_Y) as f32
    }

    pub fn mesh_build_range(&self) -> f32 {
        self.activation_range
    }

    /// Activation radius in whole chunks per axis.
    pub fn activation_radius(&self) -> (i32, i32) {
        let range = self.activation_range.max(0.0) as i32;
        (1 + range / CHUNK_SIZE_X, 1 + range / CHUNK_SIZE_Y)
    }

    pub fn max_active_chunks(&self) -> usize {
        let (rx, ry) = self.activation_radius();
        (2 * rx * 2 * ry) as usize
    }

    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            num_cpus::get().saturating_sub(1).max(1)
        }
    }
}

pub fn save_settings(path: &Path, settings: &WorldSettings) -> Result<(), SettingsError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, settings)?;
    writer.flush()?;
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<WorldSettings, SettingsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let settings = bincode::deserialize_from(&mut reader)?;
    Ok(settings)
}

pub fn load_or_default(path: &Path) -> WorldSettings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Using default world settings, {:?} unreadable: {}", path, e);
            WorldSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_ranges() {
        let settings = WorldSettings::default();
        assert_eq!(settings.deactivation_range(), 424.0);
        assert!(settings.deactivation_range() > settings.activation_range);
        assert_eq!(settings.activation_radius(), (12, 12));
        assert_eq!(settings.max_active_chunks(), 576);
        assert!(settings.resolved_worker_threads() >= 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.bin");
        let settings = WorldSettings {
            seed: 1234,
            activation_range: 96.0,
            lighting_enabled: false,
            ..Default::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(matches!(load_settings(&path), Err(SettingsError::Io(_))));
        assert_eq!(load_or_default(&path), WorldSettings::default());
    }
}
