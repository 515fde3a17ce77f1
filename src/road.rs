//! demo road: a Perlin‑meandered polyline laid down ahead of the player
//!
//! Every new segment is handed to the terrain as a string of road checks so
//! the ground under it gets flattened and locked.

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};

use crate::components::TerrainFocus;
use crate::config::TerrainSettings;
use crate::constants::*;
use crate::interfaces::RoadPath;
use crate::plugin::TerrainReady;
use crate::streamer::DynamicTerrain;

#[derive(Resource)]
pub struct RoadTrack {
    points: Vec<Vec3>,
    width: f32,
    noise: Perlin,
    /// points ever placed, drives the meander even after trimming
    placed: u64,
    started: bool,
}

impl RoadTrack {
    pub fn new(width: f32, seed: u32) -> Self {
        Self {
            points: Vec::new(),
            width,
            noise: Perlin::new(seed),
            placed: 0,
            started: false,
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// total polyline length
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    fn nearest_index(&self, pos: Vec3) -> usize {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.xz().distance_squared(pos.xz())))
            .fold((0, f32::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc })
            .0
    }

    /// `t` of the polyline vertex closest to `pos` (XZ only)
    pub fn progress_near(&self, pos: Vec3) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.nearest_index(pos) as f32 / (self.points.len() - 1) as f32
    }

    /// Drop points behind `focus` beyond `ROAD_CLEANUP_RADIUS`.  `t` then
    /// spans only the live part of the road.  Returns the number removed.
    pub fn trim_behind(&mut self, focus: Vec3) -> usize {
        if self.points.len() <= 2 {
            return 0;
        }
        let behind = self.nearest_index(focus);
        let stale = self.points[..behind]
            .iter()
            .take_while(|p| p.xz().distance(focus.xz()) > ROAD_CLEANUP_RADIUS)
            .count()
            .min(self.points.len() - 2);
        self.points.drain(..stale);
        stale
    }

    /// segment index and local fraction for a global `t`
    fn locate(&self, t: f32) -> Option<(usize, f32)> {
        let segments = self.points.len().checked_sub(1).filter(|n| *n > 0)?;
        let f = t.clamp(0.0, 1.0) * segments as f32;
        let i = (f.floor() as usize).min(segments - 1);
        Some((i, f - i as f32))
    }

    /// Place the first point under `start`, heading along +Z.
    pub fn start(&mut self, start: Vec3, terrain: &mut DynamicTerrain) {
        let y = terrain.ground_height(start.x, start.z).unwrap_or(start.y);
        self.points.clear();
        self.points.push(Vec3::new(start.x, y, start.z));
        self.placed = 1;
        self.started = true;
        info!("road started at ({:.1}, {:.1})", start.x, start.z);
    }

    /// Grow the road until its head is `ROAD_EXTEND_RADIUS` beyond `focus`.
    /// Returns the number of points added.
    pub fn extend(&mut self, focus: Vec3, terrain: &mut DynamicTerrain) -> usize {
        let Some(&first) = self.points.first() else {
            return 0;
        };
        let mut added = 0;
        while let Some(&head) = self.points.last() {
            if head.xz().distance(focus.xz()) > ROAD_EXTEND_RADIUS {
                break;
            }

            let n = self.placed as f64;
            let bend = self.noise.get([n * ROAD_MEANDER_SCALE, 0.5]) as f32;
            let heading = (bend * ROAD_MEANDER_STRENGTH).to_radians();
            let dir = Vec3::new(heading.sin(), 0.0, heading.cos());
            let mut next = head + dir * ROAD_PLACEMENT_DISTANCE;
            next.y = terrain.ground_height(next.x, next.z).unwrap_or(head.y);

            // dense enough that every vertex under the road is scanned
            let spacing = terrain.settings().near_road_distance().max(1.0);
            let steps = (ROAD_PLACEMENT_DISTANCE / spacing).ceil().max(1.0) as usize;
            for s in 1..=steps {
                terrain.check_roads(head.lerp(next, s as f32 / steps as f32));
            }
            if added == 0 && self.points.len() == 1 {
                terrain.check_roads(first);
            }

            self.points.push(next);
            self.placed += 1;
            added += 1;
        }
        if added > 0 {
            terrain.on_extend_road();
        }
        added
    }
}

impl RoadPath for RoadTrack {
    fn is_loaded(&self) -> bool {
        self.points.len() >= 2
    }

    fn point(&self, t: f32) -> Vec3 {
        match self.locate(t) {
            Some((i, f)) => self.points[i].lerp(self.points[i + 1], f),
            None => self.points.first().copied().unwrap_or(Vec3::ZERO),
        }
    }

    fn velocity(&self, t: f32) -> Vec3 {
        match self.locate(t) {
            Some((i, _)) => (self.points[i + 1] - self.points[i]) * (self.points.len() - 1) as f32,
            None => Vec3::ZERO,
        }
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

/// road width and meander seed follow the terrain settings
pub fn setup_road(mut commands: Commands, settings: Res<TerrainSettings>) {
    commands.insert_resource(RoadTrack::new(settings.road_width, settings.seed as u32));
}

/* ===========================================================
   extend_road_system – starts once the terrain is ready
   =========================================================== */
pub fn extend_road_system(
    mut ready: EventReader<TerrainReady>,
    mut terrain: ResMut<DynamicTerrain>,
    mut road: ResMut<RoadTrack>,
    focus_q: Query<&Transform, With<TerrainFocus>>,
) {
    let focus = focus_q.get_single().map(|tf| tf.translation).unwrap_or(Vec3::ZERO);
    if !road.is_started() {
        if ready.read().next().is_none() {
            return;
        }
        road.start(focus, &mut terrain);
    }
    road.trim_behind(focus);
    road.extend(focus, &mut terrain);
}
