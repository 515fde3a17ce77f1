//! seams to the rest of the game – the terrain owns no engine objects and
//! talks to the player, audio and road through these

use bevy::math::Vec3;

/// Source of the position the load window follows.
pub trait PlayerPosition {
    fn position(&self) -> Vec3;

    /// how far along the road the player is, `0` while parked
    fn road_progress(&self) -> f32 {
        0.0
    }
}

impl PlayerPosition for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

/// Per-instrument spectrum magnitudes, sampled once per cycle.
pub trait SpectrumSource {
    fn channel_count(&self) -> usize;

    fn channel_enabled(&self, _channel: usize) -> bool {
        true
    }

    /// fill `out` (power-of-two length) with the channel's current spectrum
    fn spectrum(&mut self, channel: usize, out: &mut [f32]);
}

/// No audio at all – every cycle samples silence.
pub struct Silence;

impl SpectrumSource for Silence {
    fn channel_count(&self) -> usize {
        0
    }

    fn spectrum(&mut self, _channel: usize, _out: &mut [f32]) {}
}

/// The drivable road, parameterised over `t ∈ [0, 1]`.
pub trait RoadPath {
    /// false until the road has generated its first segment
    fn is_loaded(&self) -> bool;
    fn point(&self, t: f32) -> Vec3;
    fn velocity(&self, t: f32) -> Vec3;
    fn width(&self) -> f32;

    /// pieces `t` is spread over; road checks sample each piece
    fn segment_count(&self) -> usize {
        1
    }
}
