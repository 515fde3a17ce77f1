//! terrain tunables – loaded from TOML, defaults in `constants.rs`

use std::path::Path;
use std::time::Duration;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, TerrainError};

/// How the load window around the player is shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkGenerationMode {
    Square,
    Circular,
}

/// Parameters of the diamond-square pass run once loading finishes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainSettings {
    pub height: f32,
    pub roughness: f32,
    pub range_min: f32,
    pub range_max: f32,
}

impl Default for MountainSettings {
    fn default() -> Self {
        Self {
            height: DEFAULT_MOUNTAIN_HEIGHT,
            roughness: DEFAULT_MOUNTAIN_ROUGHNESS,
            range_min: DEFAULT_MOUNTAIN_RANGE.start,
            range_max: DEFAULT_MOUNTAIN_RANGE.end,
        }
    }
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// world units along one chunk edge
    pub chunk_size: f32,
    /// vertices along one chunk edge (neighbours share the border row)
    pub chunk_resolution: usize,
    /// load radius, in chunks
    pub chunk_load_radius: i32,
    pub generation_mode: ChunkGenerationMode,
    pub height_scale: f32,
    pub vertex_update_distance: f32,
    pub road_width: f32,
    pub road_path_check_resolution: f32,
    pub chunk_updates_per_cycle: usize,
    pub freq_array_size: usize,
    pub target_frame_rate: f32,
    pub blend_normalization: f32,
    pub seed: u64,
    pub mountain: MountainSettings,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_resolution: DEFAULT_CHUNK_RESOLUTION,
            chunk_load_radius: DEFAULT_CHUNK_LOAD_RADIUS,
            generation_mode: ChunkGenerationMode::Circular,
            height_scale: DEFAULT_HEIGHT_SCALE,
            vertex_update_distance: DEFAULT_VERTEX_UPDATE_DISTANCE,
            road_width: DEFAULT_ROAD_WIDTH,
            road_path_check_resolution: DEFAULT_ROAD_PATH_CHECK_RESOLUTION,
            chunk_updates_per_cycle: DEFAULT_CHUNK_UPDATES_PER_CYCLE,
            freq_array_size: DEFAULT_FREQ_ARRAY_SIZE,
            target_frame_rate: DEFAULT_TARGET_FRAME_RATE,
            blend_normalization: DEFAULT_BLEND_NORMALIZATION,
            seed: DEFAULT_SEED,
            mountain: MountainSettings::default(),
        }
    }
}

impl TerrainSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_resolution < 2 {
            return Err(TerrainError::InvalidSettings(format!(
                "chunk_resolution must be at least 2, got {}",
                self.chunk_resolution
            )));
        }
        if self.chunk_load_radius < 1 {
            return Err(TerrainError::InvalidSettings(format!(
                "chunk_load_radius must be at least 1, got {}",
                self.chunk_load_radius
            )));
        }
        if !self.freq_array_size.is_power_of_two() {
            return Err(TerrainError::InvalidSettings(format!(
                "freq_array_size must be a power of two, got {}",
                self.freq_array_size
            )));
        }
        if !(self.chunk_size > 0.0) || !(self.target_frame_rate > 0.0) {
            return Err(TerrainError::InvalidSettings(
                "chunk_size and target_frame_rate must be positive".into(),
            ));
        }
        if self.blend_normalization <= 0.0 {
            return Err(TerrainError::InvalidSettings(
                "blend_normalization must be positive".into(),
            ));
        }
        Ok(())
    }

    /// distance between two neighbouring vertices
    #[inline]
    pub fn vertex_spacing(&self) -> f32 {
        self.chunk_size / (self.chunk_resolution - 1) as f32
    }

    /// vertices a chunk advances by (border rows are shared)
    #[inline]
    pub fn chunk_stride(&self) -> i32 {
        self.chunk_resolution as i32 - 1
    }

    #[inline]
    pub fn target_frame_time(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.target_frame_rate)
    }

    #[inline]
    pub fn near_road_distance(&self) -> f32 {
        self.road_width * NEAR_ROAD_FACTOR
    }

    #[inline]
    pub fn no_decorations_distance(&self) -> f32 {
        self.road_width * NO_DECORATIONS_FACTOR
    }
}
