//! the chunk streamer
//!
//! `DynamicTerrain` owns the vertex map and every chunk.  One call to
//! [`DynamicTerrain::tick`] is one cycle of the streaming loop:
//!
//! * **Loading** – fill the load window one chunk per tick
//! * **Shaping** – run the diamond‑square mountain over everything loaded
//! * **Active**  – pool chunks that left the window, create the missing
//!   ones, sample the music and service the highest‑priority chunks

use std::collections::HashMap;

use bevy::log::{debug, error, info, warn};
use bevy::math::{IVec2, Vec3};
use bevy::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::budget::FrameBudget;
use crate::chunk::{Chunk, ChunkId, ChunkTopology, DebugColors, RefreshInput, RoadCheck};
use crate::config::TerrainSettings;
use crate::coords::{in_window, window, world_to_chunk, world_to_vertex};
use crate::error::Result;
use crate::interfaces::{PlayerPosition, RoadPath, SpectrumSource};
use crate::mountain::{Footprint, MountainTask};
use crate::pool::ObjectPool;
use crate::spectrum::FrequencyData;
use crate::vertex::{DecorationId, Mirror};
use crate::vertex_map::{MirrorSink, VertexMap};

/* ===========================================================
   ChunkSet – live chunks by coordinate
   =========================================================== */
#[derive(Default)]
pub struct ChunkSet {
    map: HashMap<IVec2, Chunk>,
}

impl ChunkSet {
    pub fn get(&self, c: IVec2) -> Option<&Chunk> {
        self.map.get(&c)
    }

    pub fn get_mut(&mut self, c: IVec2) -> Option<&mut Chunk> {
        self.map.get_mut(&c)
    }

    pub fn contains(&self, c: IVec2) -> bool {
        self.map.contains_key(&c)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.map.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.map.values_mut()
    }

    fn insert(&mut self, chunk: Chunk) {
        self.map.insert(chunk.coord(), chunk);
    }

    fn remove(&mut self, c: IVec2) -> Option<Chunk> {
        self.map.remove(&c)
    }
}

impl MirrorSink for ChunkSet {
    fn push_vertex(&mut self, mirror: Mirror, height: f32, color: [f32; 4], immediate: bool) {
        match self.map.get_mut(&mirror.chunk) {
            Some(chunk) => {
                chunk.update_vertex(mirror.index, height, immediate);
                chunk.update_color(mirror.index, color);
            }
            None => error!("mirror points at unloaded chunk {:?}", mirror.chunk),
        }
    }

    fn drop_decorations(&mut self, chunk: IVec2, ids: &[DecorationId]) {
        if let Some(chunk) = self.map.get_mut(&chunk) {
            chunk.remove_decorations(ids);
        }
    }
}

/* ===========================================================
   tick plumbing
   =========================================================== */
/// The outside world as seen by one tick.
pub struct Collaborators<'a> {
    pub player: &'a dyn PlayerPosition,
    pub spectrum: &'a mut dyn SpectrumSource,
    /// `None` until a road exists
    pub road: Option<&'a dyn RoadPath>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub created: usize,
    pub reused: usize,
    pub pooled: usize,
    pub serviced: usize,
    /// set on the tick the mountain finished; the road may start
    pub terrain_ready: bool,
}

enum StreamPhase {
    Loading,
    Shaping(Box<MountainTask>),
    Active,
}

/* ===========================================================
   DynamicTerrain
   =========================================================== */
#[derive(Resource)]
pub struct DynamicTerrain {
    settings: TerrainSettings,
    topology: ChunkTopology,
    vmap: VertexMap,
    chunks: ChunkSet,
    pool: ObjectPool<Chunk>,
    next_id: u32,
    close_to_road: Vec<IVec2>,
    road_chunks: Vec<IVec2>,
    freq: FrequencyData,
    phase: StreamPhase,
    player_chunk: IVec2,
    debug_colors: DebugColors,
    rng: StdRng,
}

impl DynamicTerrain {
    pub fn new(settings: TerrainSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    /// like `new`, but bad settings are logged and replaced by the defaults
    pub fn new_or_default(settings: TerrainSettings) -> Self {
        match settings.validate() {
            Ok(()) => Self::build(settings),
            Err(e) => {
                error!("{}; using default terrain settings", e);
                Self::build(TerrainSettings::default())
            }
        }
    }

    fn build(settings: TerrainSettings) -> Self {
        Self {
            topology: ChunkTopology::new(&settings),
            vmap: VertexMap::new(&settings),
            chunks: ChunkSet::default(),
            pool: ObjectPool::default(),
            next_id: 0,
            close_to_road: Vec::new(),
            road_chunks: Vec::new(),
            freq: FrequencyData::new(settings.freq_array_size),
            phase: StreamPhase::Loading,
            player_chunk: IVec2::ZERO,
            debug_colors: DebugColors::Off,
            rng: StdRng::seed_from_u64(settings.seed.wrapping_add(1)),
            settings,
        }
    }

    /// one cycle with a slice of the target frame time
    pub fn tick(&mut self, collab: &mut Collaborators) -> TickReport {
        let budget = FrameBudget::start(self.settings.target_frame_time());
        self.tick_with(collab, &budget)
    }

    pub fn tick_with(&mut self, collab: &mut Collaborators, budget: &FrameBudget) -> TickReport {
        let mut report = TickReport::default();
        let player = collab.player.position();
        self.player_chunk = world_to_chunk(&self.settings, player);

        let next = match self.phase {
            StreamPhase::Loading => self.load_step(&mut report),
            StreamPhase::Shaping(_) => self.shape_step(budget, &mut report),
            StreamPhase::Active => {
                self.active_cycle(collab, player, budget, &mut report);
                None
            }
        };
        if let Some(phase) = next {
            self.phase = phase;
        }

        self.vmap.step_road_scans(&mut self.chunks, budget);
        report
    }

    /// one missing chunk, or the mountain once the window is full
    fn load_step(&mut self, report: &mut TickReport) -> Option<StreamPhase> {
        let missing = window(self.settings.generation_mode, self.player_chunk, self.settings.chunk_load_radius)
            .find(|c| !self.chunks.contains(*c));
        match missing {
            Some(c) => {
                self.create_chunk(c, report);
                None
            }
            None => Some(self.start_mountain(report)),
        }
    }

    fn shape_step(&mut self, budget: &FrameBudget, report: &mut TickReport) -> Option<StreamPhase> {
        let StreamPhase::Shaping(task) = &mut self.phase else {
            return None;
        };
        if !task.step(&mut self.vmap, &mut self.chunks, budget) {
            return None;
        }
        info!("terrain ready with {} chunks", self.chunks.len());
        report.terrain_ready = true;
        Some(StreamPhase::Active)
    }

    fn start_mountain(&mut self, report: &mut TickReport) -> StreamPhase {
        let Some((min, max)) = self.vmap.bounds() else {
            report.terrain_ready = true;
            return StreamPhase::Active;
        };
        let seed = self.rng.gen();
        match MountainTask::new(Footprint::covering(min, max), &self.settings.mountain, &self.vmap, seed) {
            Ok(task) => {
                info!(
                    "loaded {} chunks, shaping mountain over ({}, {})..=({}, {})",
                    self.chunks.len(),
                    min.x,
                    min.y,
                    max.x,
                    max.y
                );
                StreamPhase::Shaping(Box::new(task))
            }
            Err(e) => {
                warn!("skipping mountain: {}", e);
                report.terrain_ready = true;
                StreamPhase::Active
            }
        }
    }

    fn active_cycle(&mut self, collab: &mut Collaborators, player: Vec3, budget: &FrameBudget, report: &mut TickReport) {
        let center = self.player_chunk;
        let mode = self.settings.generation_mode;
        let radius = self.settings.chunk_load_radius;

        /* leaving the window -------------------------------------------- */
        let leaving: Vec<IVec2> = self
            .chunks
            .iter()
            .map(Chunk::coord)
            .filter(|c| !in_window(mode, *c, center, radius))
            .collect();
        for c in leaving {
            self.delete_chunk(c);
            report.pooled += 1;
        }

        /* entering the window ------------------------------------------- */
        let missing: Vec<IVec2> = window(mode, center, radius)
            .filter(|c| !self.chunks.contains(*c))
            .collect();
        for c in missing {
            self.create_chunk(c, report);
        }

        self.freq.update(collab.spectrum);

        /* priority service ---------------------------------------------- */
        let mut order: Vec<(IVec2, f32)> = self
            .chunks
            .iter_mut()
            .map(|chunk| {
                chunk.age();
                (chunk.coord(), chunk.priority())
            })
            .collect();
        order.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| (a.0.x, a.0.y).cmp(&(b.0.x, b.0.y)))
        });

        let progress = collab.player.road_progress();
        let check_resolution = self.settings.road_path_check_resolution;
        for (c, _) in order.into_iter().take(self.settings.chunk_updates_per_cycle) {
            let road = collab.road.map(|r| (r, progress));
            let Some(chunk) = self.chunks.get_mut(c) else {
                continue;
            };
            if let Some(check) = chunk.chunk_update(road, check_resolution) {
                self.record_road_check(c, check);
            }
            report.serviced += 1;
        }

        /* in-flight refresh passes -------------------------------------- */
        let input = RefreshInput {
            player,
            curve: self.freq.curve(),
        };
        let refreshing: Vec<IVec2> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.is_refreshing())
            .map(Chunk::coord)
            .collect();
        for c in refreshing {
            let Some(mut pass) = self.chunks.get_mut(c).and_then(Chunk::take_refresh) else {
                continue;
            };
            if !pass.step(&mut self.vmap, &mut self.chunks, &input, budget) {
                if let Some(chunk) = self.chunks.get_mut(c) {
                    chunk.resume_refresh(pass);
                }
            }
        }
    }

    fn create_chunk(&mut self, c: IVec2, report: &mut TickReport) {
        let mut chunk = match self.pool.get() {
            Some(mut chunk) => {
                debug!("reusing chunk {:?} at {:?}", chunk.id(), c);
                chunk.reuse(c, &mut self.vmap);
                report.reused += 1;
                chunk
            }
            None => {
                let id = ChunkId(self.next_id);
                self.next_id += 1;
                report.created += 1;
                Chunk::new(id, c, &self.topology, &mut self.vmap)
            }
        };
        if self.debug_colors != DebugColors::Off {
            chunk.apply_debug_colors(self.debug_colors, &self.vmap);
        }
        self.chunks.insert(chunk);
    }

    /// stop, unregister and pool the chunk at `c`
    fn delete_chunk(&mut self, c: IVec2) {
        let Some(mut chunk) = self.chunks.remove(c) else {
            return;
        };
        chunk.stop_updating();
        chunk.release(&mut self.vmap);
        self.close_to_road.retain(|&r| r != c);
        self.road_chunks.retain(|&r| r != c);
        debug!("pooling chunk {:?} from {:?}", chunk.id(), c);
        self.pool.add(chunk);
    }

    fn record_road_check(&mut self, c: IVec2, check: RoadCheck) {
        if check.near_road && !self.close_to_road.contains(&c) {
            self.close_to_road.push(c);
        }
        if check.has_road && !self.road_chunks.contains(&c) {
            self.road_chunks.push(c);
        }
    }

    /* ===========================================================
       road & decorations
       =========================================================== */

    /// the road grew: chunks that never saw it look again
    pub fn on_extend_road(&mut self) {
        for chunk in self.chunks.iter_mut() {
            chunk.rearm_road_check();
        }
    }

    /// queue a flatten/lock scan around a newly placed road point
    pub fn check_roads(&mut self, point: Vec3) {
        self.vmap.queue_road_check(point);
    }

    pub fn set_height(&mut self, c: IVec2, height: f32) -> bool {
        self.vmap.set_height(c, height, &mut self.chunks)
    }

    pub fn lock(&mut self, c: IVec2) {
        self.vmap.lock(c);
    }

    pub fn register_decoration(&mut self, vertex: IVec2, id: DecorationId) -> bool {
        if !self.vmap.register_decoration(vertex, id) {
            return false;
        }
        let c = world_to_chunk(&self.settings, self.vmap.world_position(vertex).unwrap_or_default());
        if let Some(chunk) = self.chunks.get_mut(c) {
            chunk.add_decoration(id);
        }
        true
    }

    pub fn take_removed_decorations(&mut self) -> Vec<DecorationId> {
        self.vmap.take_removed_decorations()
    }

    /* ===========================================================
       queries
       =========================================================== */

    /// Bilinear terrain height under a world point; `None` where the
    /// surrounding vertices are not loaded.
    pub fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let v = world_to_vertex(&self.settings, x, z);
        let spacing = self.settings.vertex_spacing();
        let half = self.settings.chunk_size * 0.5;
        let tx = (x + half) / spacing - v.x as f32;
        let tz = (z + half) / spacing - v.y as f32;

        let sample = |d: IVec2| {
            let h = self.vmap.get_height(v + d);
            (!h.is_nan()).then_some(h)
        };
        let h00 = sample(IVec2::ZERO)?;
        let h10 = sample(IVec2::X)?;
        let h01 = sample(IVec2::Y)?;
        let h11 = sample(IVec2::ONE)?;
        Some((1.0 - tx) * (1.0 - tz) * h00 + tx * (1.0 - tz) * h10 + (1.0 - tx) * tz * h01 + tx * tz * h11)
    }

    pub fn random_chunk(&mut self) -> Option<&Chunk> {
        if self.chunks.is_empty() {
            return None;
        }
        let i = self.rng.gen_range(0..self.chunks.len());
        self.chunks.iter().nth(i)
    }

    pub fn random_road_chunk(&mut self) -> Option<&Chunk> {
        if self.road_chunks.is_empty() {
            return None;
        }
        let c = self.road_chunks[self.rng.gen_range(0..self.road_chunks.len())];
        self.chunks.get(c)
    }

    pub fn random_close_to_road_chunk(&mut self) -> Option<&Chunk> {
        if self.close_to_road.is_empty() {
            return None;
        }
        let c = self.close_to_road[self.rng.gen_range(0..self.close_to_road.len())];
        self.chunks.get(c)
    }

    pub fn set_debug_colors(&mut self, mode: DebugColors) {
        self.debug_colors = mode;
        for chunk in self.chunks.iter_mut() {
            chunk.apply_debug_colors(mode, &self.vmap);
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn vertex_map(&self) -> &VertexMap {
        &self.vmap
    }

    pub fn vertex_map_mut(&mut self) -> &mut VertexMap {
        &mut self.vmap
    }

    pub fn chunk(&self, c: IVec2) -> Option<&Chunk> {
        self.chunks.get(c)
    }

    pub fn active_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn active_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn pooled_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.pool.iter()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    pub fn player_chunk(&self) -> IVec2 {
        self.player_chunk
    }

    pub fn close_to_road_chunks(&self) -> &[IVec2] {
        &self.close_to_road
    }

    pub fn road_chunks(&self) -> &[IVec2] {
        &self.road_chunks
    }

    pub fn frequency_data(&self) -> &FrequencyData {
        &self.freq
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, StreamPhase::Loading)
    }

    /// loading and mountain are both finished
    pub fn is_ready(&self) -> bool {
        matches!(self.phase, StreamPhase::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkGenerationMode;
    use crate::interfaces::Silence;

    fn small() -> TerrainSettings {
        TerrainSettings {
            chunk_load_radius: 1,
            generation_mode: ChunkGenerationMode::Square,
            ..TerrainSettings::default()
        }
    }

    fn tick(terrain: &mut DynamicTerrain, player: Vec3, road: Option<&dyn RoadPath>) -> TickReport {
        let mut silence = Silence;
        let mut collab = Collaborators {
            player: &player,
            spectrum: &mut silence,
            road,
        };
        terrain.tick_with(&mut collab, &FrameBudget::unlimited())
    }

    fn tick_budget(terrain: &mut DynamicTerrain, player: Vec3, budget: &FrameBudget) -> TickReport {
        let mut silence = Silence;
        let mut collab = Collaborators {
            player: &player,
            spectrum: &mut silence,
            road: None,
        };
        terrain.tick_with(&mut collab, budget)
    }

    struct Straight;

    impl RoadPath for Straight {
        fn is_loaded(&self) -> bool {
            true
        }
        fn point(&self, t: f32) -> Vec3 {
            Vec3::new(0.0, 0.0, -150.0 + 300.0 * t)
        }
        fn velocity(&self, _t: f32) -> Vec3 {
            Vec3::Z * 300.0
        }
        fn width(&self) -> f32 {
            10.0
        }
    }

    #[test]
    fn loading_creates_one_chunk_per_tick() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        for n in 1..=9 {
            let report = tick(&mut terrain, Vec3::ZERO, None);
            assert_eq!(report.created, 1);
            assert_eq!(terrain.active_count(), n);
            assert!(terrain.is_loading());
        }
        // window full: mountain starts, then finishes with an unlimited budget
        tick(&mut terrain, Vec3::ZERO, None);
        assert!(!terrain.is_loading());
        let report = tick(&mut terrain, Vec3::ZERO, None);
        assert!(report.terrain_ready);
        assert!(terrain.is_ready());
        assert_eq!(terrain.vertex_map().bounds(), Some((IVec2::splat(-7), IVec2::splat(14))));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = TerrainSettings {
            chunk_resolution: 1,
            ..TerrainSettings::default()
        };
        assert!(DynamicTerrain::new(settings.clone()).is_err());
        let fallback = DynamicTerrain::new_or_default(settings);
        assert_eq!(fallback.settings(), &TerrainSettings::default());
    }

    #[test]
    fn ground_height_interpolates() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        tick(&mut terrain, Vec3::ZERO, None);
        for v in [IVec2::new(3, 3), IVec2::new(4, 3), IVec2::new(3, 4), IVec2::new(4, 4)] {
            terrain.set_height(v, 0.0);
        }
        terrain.set_height(IVec2::new(4, 3), 10.0);
        terrain.set_height(IVec2::new(4, 4), 10.0);

        let spacing = terrain.settings().vertex_spacing();
        let base = terrain.vertex_map().world_position(IVec2::new(3, 3)).unwrap();
        let h = terrain.ground_height(base.x + spacing * 0.5, base.z + spacing * 0.25).unwrap();
        assert!((h - 5.0).abs() < 1e-3);
        assert!(terrain.ground_height(5000.0, 5000.0).is_none());
    }

    #[test]
    fn road_checks_fill_the_chunk_lists() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while !terrain.is_ready() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        assert!(terrain.random_road_chunk().is_none());
        assert!(terrain.random_chunk().is_some());

        // four updates per cycle, nine chunks: three cycles service them all
        let road: &dyn RoadPath = &Straight;
        for _ in 0..3 {
            tick(&mut terrain, Vec3::ZERO, Some(road));
        }
        assert!(terrain.active_chunks().all(|c| c.has_checked_for_road()));

        let mut has = terrain.road_chunks().to_vec();
        has.sort_by_key(|c| (c.x, c.y));
        assert_eq!(has, vec![IVec2::new(0, -1), IVec2::new(0, 0), IVec2::new(0, 1)]);
        // every chunk of a radius-1 window lies within one chunk of x = 0
        assert_eq!(terrain.close_to_road_chunks().len(), 9);
        let picked = terrain.random_road_chunk().map(Chunk::coord).unwrap();
        assert_eq!(picked.x, 0);

        terrain.on_extend_road();
        assert!(terrain.active_chunks().all(|c| c.has_checked_for_road()));
    }

    #[test]
    fn set_height_reaches_every_mirror() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while terrain.is_loading() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        // (7, 7) is the corner shared by chunks (0,0), (1,0), (0,1), (1,1)
        let corner = IVec2::new(7, 7);
        terrain.lock(IVec2::new(0, 0));
        assert!(terrain.set_height(corner, 42.0));
        for cc in [IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, 1), IVec2::new(1, 1)] {
            let chunk = terrain.chunk(cc).unwrap();
            let i = chunk.local_index_of(corner).unwrap();
            assert_eq!(chunk.positions()[i].y, 42.0);
            assert!(!chunk.needs_rebuild());
        }
        assert!(!terrain.set_height(IVec2::new(0, 0), 1.0));
    }

    #[test]
    fn decorations_follow_road_scans() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while terrain.is_loading() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        let v = IVec2::new(3, 3);
        assert!(terrain.register_decoration(v, DecorationId(11)));
        assert_eq!(terrain.chunk(IVec2::ZERO).unwrap().decorations(), &[DecorationId(11)]);

        let p = terrain.vertex_map().world_position(v).unwrap();
        terrain.check_roads(p);
        tick(&mut terrain, Vec3::ZERO, None);
        assert_eq!(terrain.take_removed_decorations(), vec![DecorationId(11)]);
        assert!(terrain.vertex_map().vertex(v).unwrap().locked);
    }

    #[test]
    fn pooling_stops_parked_refreshes() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while !terrain.is_ready() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        // one vertex per pass per tick: every pass stays in flight
        for _ in 0..5 {
            tick_budget(&mut terrain, Vec3::ZERO, &FrameBudget::spent());
        }
        let leaving: Vec<ChunkId> = terrain
            .active_chunks()
            .filter(|c| c.coord().x == -1)
            .inspect(|c| assert!(c.is_refreshing()))
            .map(Chunk::id)
            .collect();
        assert_eq!(leaving.len(), 3);

        let report = tick_budget(&mut terrain, Vec3::new(100.0, 0.0, 0.0), &FrameBudget::spent());
        assert_eq!((report.pooled, report.reused), (3, 3));
        for chunk in terrain.chunks.iter_mut() {
            if let Some(pass) = chunk.take_refresh() {
                assert_eq!(pass.chunk(), chunk.coord());
                chunk.resume_refresh(pass);
            }
            if leaving.contains(&chunk.id()) {
                assert_eq!(chunk.coord().x, 2);
            }
        }
    }

    #[test]
    fn decorations_are_reported_removed_once() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while !terrain.is_ready() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        let v = IVec2::new(3, 3);
        assert!(terrain.register_decoration(v, DecorationId(11)));
        let p = terrain.vertex_map().world_position(v).unwrap();
        terrain.check_roads(p);
        tick(&mut terrain, Vec3::ZERO, None);
        assert_eq!(terrain.take_removed_decorations(), vec![DecorationId(11)]);
        assert!(terrain.chunk(IVec2::ZERO).unwrap().decorations().is_empty());

        // pooling the chunk must not report it again
        tick(&mut terrain, Vec3::new(500.0, 0.0, 0.0), None);
        assert!(terrain.chunk(IVec2::ZERO).is_none());
        assert!(terrain.take_removed_decorations().is_empty());
    }

    #[test]
    fn pooled_decorations_leave_their_vertex() {
        let mut terrain = DynamicTerrain::new(small()).unwrap();
        while !terrain.is_ready() {
            tick(&mut terrain, Vec3::ZERO, None);
        }
        let v = IVec2::new(3, 3);
        assert!(terrain.register_decoration(v, DecorationId(12)));

        tick(&mut terrain, Vec3::new(500.0, 0.0, 0.0), None);
        assert_eq!(terrain.take_removed_decorations(), vec![DecorationId(12)]);
        assert!(terrain.vertex_map().vertex(v).unwrap().decorations.is_empty());

        // a later road scan over the old ground finds nothing to remove
        let p = terrain.vertex_map().world_position(v).unwrap();
        terrain.check_roads(p);
        tick(&mut terrain, Vec3::new(500.0, 0.0, 0.0), None);
        assert!(terrain.take_removed_decorations().is_empty());
    }
}
