use std::ops::Range;

/// -------- chunks --------
pub const DEFAULT_CHUNK_SIZE: f32        = 100.0;
pub const DEFAULT_CHUNK_RESOLUTION: usize = 8;
pub const DEFAULT_CHUNK_LOAD_RADIUS: i32 = 4;
pub const DEFAULT_CHUNK_UPDATES_PER_CYCLE: usize = 4;

/// -------- terrain --------
pub const DEFAULT_HEIGHT_SCALE: f32           = 800.0;
/// keeps the update ring inside a radius-4 circular window of 100-unit chunks
pub const DEFAULT_VERTEX_UPDATE_DISTANCE: f32 = 300.0;
/// height delta that saturates a vertex's blend alpha
pub const DEFAULT_BLEND_NORMALIZATION: f32    = 50.0;

/// -------- road --------
pub const DEFAULT_ROAD_WIDTH: f32                 = 10.0;
pub const DEFAULT_ROAD_PATH_CHECK_RESOLUTION: f32 = 4.0;
pub const NEAR_ROAD_FACTOR: f32       = 0.75;   // × road width
pub const NO_DECORATIONS_FACTOR: f32  = 1.5;    // × road width
pub const ROAD_SMOOTH_FACTOR: Range<f32> = 0.98..0.99;
pub const ROAD_SMOOTH_RANGE: Range<i32>  = 2..8;

/// -------- audio --------
pub const DEFAULT_FREQ_ARRAY_SIZE: usize = 256;

/// -------- scheduling --------
pub const DEFAULT_TARGET_FRAME_RATE: f32 = 120.0;
pub const DEFAULT_SEED: u64              = 0x5eed;

/// -------- initial mountain --------
pub const DEFAULT_MOUNTAIN_HEIGHT: f32    = 5.0;
pub const DEFAULT_MOUNTAIN_ROUGHNESS: f32 = 20.0;
pub const DEFAULT_MOUNTAIN_RANGE: Range<f32> = -0.03..0.03;

/// -------- demo: car --------
pub const CAR_ACCEL: f32        = 60.0;
pub const CAR_MAX_SPEED: f32    = 120.0;
pub const CAR_TURN_RATE: f32    = 1.4;   // rad / s
pub const CAR_RIDE_HEIGHT: f32  = 2.3;

/// -------- demo: camera --------
pub const CAMERA_DISTANCE: f32 = 40.0;
pub const CAMERA_HEIGHT: f32   = 18.0;
pub const CAMERA_LERP: f32     = 4.0;

/// -------- demo: road --------
pub const ROAD_PLACEMENT_DISTANCE: f32 = 40.0;
pub const ROAD_EXTEND_RADIUS: f32      = 200.0;
/// points further behind the player than this are dropped
pub const ROAD_CLEANUP_RADIUS: f32     = 120.0;
pub const ROAD_MEANDER_SCALE: f64      = 0.02;
pub const ROAD_MEANDER_STRENGTH: f32   = 25.0;

/// -------- demo: synthetic instruments --------
pub const DEMO_INSTRUMENTS: usize  = 3;
pub const DEMO_SPECTRUM_GAIN: f32  = 0.0004;
