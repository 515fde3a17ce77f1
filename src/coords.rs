//! world ↔ vertex ↔ chunk conversions
//!
//! Vertex `(x, y)` lives at world `(x·spacing − size/2, h, y·spacing − size/2)`
//! and chunk `(cx, cy)` starts at vertex `(cx·stride, cy·stride)`, where
//! `stride = resolution − 1` because neighbouring chunks share a border row.

use bevy::math::{IVec2, Vec2, Vec3};

use crate::config::{ChunkGenerationMode, TerrainSettings};

/// world XZ position of a vertex (height not included)
#[inline]
pub fn vertex_world_xz(settings: &TerrainSettings, v: IVec2) -> Vec2 {
    let spacing = settings.vertex_spacing();
    let half = settings.chunk_size * 0.5;
    Vec2::new(v.x as f32 * spacing - half, v.y as f32 * spacing - half)
}

/// vertex whose cell contains the given world point (lower-left corner)
#[inline]
pub fn world_to_vertex(settings: &TerrainSettings, x: f32, z: f32) -> IVec2 {
    let spacing = settings.vertex_spacing();
    let half = settings.chunk_size * 0.5;
    IVec2::new(
        ((x + half) / spacing).floor() as i32,
        ((z + half) / spacing).floor() as i32,
    )
}

/// chunk whose footprint contains the given world point
#[inline]
pub fn world_to_chunk(settings: &TerrainSettings, pos: Vec3) -> IVec2 {
    let size = settings.chunk_size;
    IVec2::new(
        (pos.x / size + 0.5).floor() as i32,
        (pos.z / size + 0.5).floor() as i32,
    )
}

/// world position of a chunk's lower-left corner (its local origin)
#[inline]
pub fn chunk_origin(settings: &TerrainSettings, c: IVec2) -> Vec3 {
    let size = settings.chunk_size;
    Vec3::new(c.x as f32 * size - size * 0.5, 0.0, c.y as f32 * size - size * 0.5)
}

/// the vertex the chunk's local index 0 maps onto
#[inline]
pub fn chunk_first_vertex(settings: &TerrainSettings, c: IVec2) -> IVec2 {
    c * settings.chunk_stride()
}

/// load-window membership of `c` around `center`
#[inline]
pub fn in_window(mode: ChunkGenerationMode, c: IVec2, center: IVec2, radius: i32) -> bool {
    let d = c - center;
    match mode {
        ChunkGenerationMode::Square => d.x.abs() <= radius && d.y.abs() <= radius,
        ChunkGenerationMode::Circular => d.as_vec2().length() <= radius as f32,
    }
}

/// every chunk coordinate of the load window, row by row
pub fn window(mode: ChunkGenerationMode, center: IVec2, radius: i32) -> impl Iterator<Item = IVec2> {
    (center.x - radius..=center.x + radius).flat_map(move |x| {
        (center.y - radius..=center.y + radius)
            .map(move |y| IVec2::new(x, y))
            .filter(move |&c| in_window(mode, c, center, radius))
    })
}
