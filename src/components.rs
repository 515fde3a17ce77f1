use bevy::prelude::*;

/* ===========================================================
   player
   =========================================================== */
#[derive(Component, Default)]
pub struct Player {
    pub speed: f32,
    /// yaw in radians, 0 faces +Z
    pub heading: f32,
}

/* the entity the terrain window follows */
#[derive(Component)]
pub struct TerrainFocus;

/* ===========================================================
   terrain helper components
   =========================================================== */
#[derive(Component)]
pub struct TerrainChunk {
    pub coord: IVec2,
}
