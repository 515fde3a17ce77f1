//! music‑driven terrain streaming for Bevy
//!
//! A shared vertex grid is streamed in chunk‑sized tiles around the player,
//! shaped once by a diamond‑square mountain and afterwards pushed around by
//! the music spectrum. A road flattens and locks the ground it crosses.

pub mod audio;
pub mod budget;
pub mod camera;
pub mod chunk;
pub mod components;
pub mod config;
pub mod constants;
pub mod coords;
pub mod error;
pub mod interfaces;
pub mod mountain;
pub mod player;
pub mod plugin;
pub mod pool;
pub mod road;
pub mod sparse_grid;
pub mod spectrum;
pub mod streamer;
pub mod vertex;
pub mod vertex_map;

pub use config::{ChunkGenerationMode, MountainSettings, TerrainSettings};
pub use error::{Result, TerrainError};
pub use plugin::TerrainPlugin;
pub use streamer::DynamicTerrain;
