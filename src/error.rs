use std::fmt;

use bevy::math::IVec2;

/// A convenient result type wrapping [`TerrainError`].
pub type Result<T> = std::result::Result<T, TerrainError>;

#[derive(Debug)]
pub enum TerrainError {
    /// a vertex coordinate was asked of a chunk that does not contain it
    VertexNotInChunk { vertex: IVec2, chunk: IVec2 },
    /// diamond-square needs at least a 3×3 footprint
    FootprintTooSmall { width: i32, depth: i32 },
    InvalidSettings(String),
    Io(std::io::Error),
    Config(toml::de::Error),
}

impl fmt::Display for TerrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainError::VertexNotInChunk { vertex, chunk } => write!(
                f,
                "vertex ({}, {}) is not part of chunk ({}, {})",
                vertex.x, vertex.y, chunk.x, chunk.y
            ),
            TerrainError::FootprintTooSmall { width, depth } => write!(
                f,
                "mountain footprint {}x{} is too small for diamond-square",
                width, depth
            ),
            TerrainError::InvalidSettings(msg) => write!(f, "invalid terrain settings: {}", msg),
            TerrainError::Io(err) => write!(f, "io error: {}", err),
            TerrainError::Config(err) => write!(f, "could not parse terrain settings: {}", err),
        }
    }
}

impl std::error::Error for TerrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerrainError::Io(err) => Some(err),
            TerrainError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TerrainError {
    fn from(value: std::io::Error) -> Self {
        TerrainError::Io(value)
    }
}

impl From<toml::de::Error> for TerrainError {
    fn from(value: toml::de::Error) -> Self {
        TerrainError::Config(value)
    }
}
