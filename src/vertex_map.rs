//! the logical height field
//!
//! Every height write goes through [`VertexMap::set_height`], which keeps the
//! per-vertex blend colour current and forwards the new value to every chunk
//! mesh that mirrors the coordinate.  Road proximity scans are queued here and
//! run a few vertices at a time under a [`FrameBudget`].

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bevy::log::{info, warn};
use bevy::math::{IVec2, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::budget::FrameBudget;
use crate::config::TerrainSettings;
use crate::constants::{ROAD_SMOOTH_FACTOR, ROAD_SMOOTH_RANGE};
use crate::coords::{vertex_world_xz, world_to_vertex};
use crate::error::Result;
use crate::sparse_grid::SparseGrid;
use crate::vertex::{DecorationId, Mirror, Vertex};

/// Receiver of mirror pushes (the set of live chunks).
pub trait MirrorSink {
    fn push_vertex(&mut self, mirror: Mirror, height: f32, color: [f32; 4], immediate: bool);

    /// the road took these decorations off a vertex the chunk mirrors
    fn drop_decorations(&mut self, _chunk: IVec2, _ids: &[DecorationId]) {}
}

/// discards every push
impl MirrorSink for () {
    fn push_vertex(&mut self, _: Mirror, _: f32, _: [f32; 4], _: bool) {}
}

const NEIGHBOURS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/* ===========================================================
   road scan task
   =========================================================== */
/// One queued proximity scan around a road sample point.  `next` walks the
/// bounding box row-major so the scan can park and resume between frames.
#[derive(Clone, Debug)]
struct RoadScan {
    point: Vec3,
    min: IVec2,
    size: IVec2,
    next: i32,
}

impl RoadScan {
    fn total(&self) -> i32 {
        self.size.x * self.size.y
    }

    fn coord(&self, i: i32) -> IVec2 {
        self.min + IVec2::new(i / self.size.y, i % self.size.y)
    }
}

/* ===========================================================
   VertexMap
   =========================================================== */
pub struct VertexMap {
    grid: SparseGrid<Vertex>,
    bounds: Option<(IVec2, IVec2)>,
    settings: TerrainSettings,
    rng: StdRng,
    scans: VecDeque<RoadScan>,
    removed_decorations: Vec<DecorationId>,
}

impl VertexMap {
    pub fn new(settings: &TerrainSettings) -> Self {
        let width = settings.chunk_load_radius.max(1) * settings.chunk_stride() * 2;
        Self {
            grid: SparseGrid::new(width),
            bounds: None,
            settings: settings.clone(),
            rng: StdRng::seed_from_u64(settings.seed),
            scans: VecDeque::new(),
            removed_decorations: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /* -------- lookup -------- */

    pub fn vertex(&self, c: IVec2) -> Option<&Vertex> {
        self.grid.at(c)
    }

    pub fn contains(&self, c: IVec2) -> bool {
        self.grid.contains(c)
    }

    /// materialise the vertex at `c` if needed
    pub fn vertex_at(&mut self, c: IVec2) -> &mut Vertex {
        if !self.grid.contains(c) {
            self.extend_bounds(c);
        }
        let rng = &mut self.rng;
        self.grid.get_or_insert_with(c, || {
            let color = [0.0, rng.gen_range(0.0..1.0), rng.gen_range(0.0..0.75), 0.5];
            Vertex::new(c, color)
        })
    }

    /// `NaN` where nothing was materialised yet
    pub fn get_height(&self, c: IVec2) -> f32 {
        self.grid.at(c).map_or(f32::NAN, |v| v.height)
    }

    /// world-space position of a materialised vertex
    pub fn world_position(&self, c: IVec2) -> Option<Vec3> {
        let v = self.grid.at(c)?;
        let xz = vertex_world_xz(&self.settings, c);
        Some(Vec3::new(xz.x, v.height, xz.y))
    }

    /// inclusive (min, max) of every coordinate ever materialised
    pub fn bounds(&self) -> Option<(IVec2, IVec2)> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.grid.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.grid.iter().map(|(_, v)| v)
    }

    fn extend_bounds(&mut self, c: IVec2) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(c), max.max(c)),
            None => (c, c),
        });
    }

    /* -------- heights -------- */

    /// Write a height and propagate it to every mirror.  Returns `false` for
    /// a no-op (locked vertex or identical value).
    pub fn set_height(&mut self, c: IVec2, height: f32, sink: &mut dyn MirrorSink) -> bool {
        let v = self.vertex_at(c);
        if v.locked || v.height == height {
            return false;
        }
        v.height = height;
        v.loaded = true;

        let alpha = self.blend_alpha(c, height);
        let Some(v) = self.grid.at_mut(c) else {
            return false;
        };
        v.color[3] = alpha;

        let immediate = v.mirrors.len() > 1;
        for &mirror in &v.mirrors {
            sink.push_vertex(mirror, height, v.color, immediate);
        }
        true
    }

    pub fn add_height(&mut self, c: IVec2, delta: f32, sink: &mut dyn MirrorSink) -> bool {
        let current = self.vertex_at(c).height;
        self.set_height(c, current + delta, sink)
    }

    /// steepest step to a loaded axis neighbour, normalised to [0, 1]
    fn blend_alpha(&self, c: IVec2, height: f32) -> f32 {
        let steepest = NEIGHBOURS
            .iter()
            .filter_map(|&d| self.grid.at(c + d))
            .filter(|n| n.loaded)
            .map(|n| (n.height - height).abs())
            .fold(0.0_f32, f32::max);
        (steepest / self.settings.blend_normalization).clamp(0.0, 1.0)
    }

    /// Pull `center` to `height` and every unlocked vertex within `range`
    /// grid units toward it, weighted by `factor·(range − d)/range`.
    pub fn smooth_height(
        &mut self,
        center: IVec2,
        height: f32,
        factor: f32,
        range: f32,
        sink: &mut dyn MirrorSink,
    ) {
        self.set_height(center, height, sink);
        if range <= 0.0 {
            return;
        }

        let r = range.ceil() as i32;
        for dx in -r..=r {
            for dy in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let d = Vec2::new(dx as f32, dy as f32).length();
                if d > range {
                    continue;
                }
                let c = center + IVec2::new(dx, dy);
                let current = match self.grid.at(c) {
                    Some(v) if !v.locked => v.height,
                    _ => continue,
                };
                let weight = factor * (range - d) / range;
                self.set_height(c, current + (height - current) * weight, sink);
            }
        }
    }

    /* -------- flags -------- */

    /// freeze a height forever (materialises the vertex)
    pub fn lock(&mut self, c: IVec2) {
        self.vertex_at(c).locked = true;
    }

    /// unknown coordinates count as locked
    pub fn is_locked(&self, c: IVec2) -> bool {
        self.grid.at(c).map_or(true, |v| v.locked)
    }

    /// unknown coordinates are unconstrained
    pub fn is_constrained(&self, c: IVec2) -> bool {
        self.grid.at(c).is_some_and(Vertex::is_constrained)
    }

    /* -------- mirrors & decorations -------- */

    /// register a chunk copy of `c`, returning the vertex it mirrors
    pub fn register_mirror(&mut self, c: IVec2, mirror: Mirror) -> &Vertex {
        let v = self.vertex_at(c);
        v.add_mirror(mirror);
        v
    }

    pub fn deregister_mirror(&mut self, c: IVec2, chunk: IVec2) {
        match self.grid.at_mut(c) {
            Some(v) => v.remove_mirrors_of(chunk),
            None => warn!("deregister_mirror: no vertex at ({}, {})", c.x, c.y),
        }
    }

    /// Attach a decoration.  Vertices already cleared by the road refuse it
    /// and hand it straight to the removal outbox.
    pub fn register_decoration(&mut self, c: IVec2, id: DecorationId) -> bool {
        let v = self.vertex_at(c);
        if v.no_decorations {
            self.removed_decorations.push(id);
            return false;
        }
        v.decorations.push(id);
        true
    }

    /// Forget decorations a pooled chunk already reported as removed.
    pub fn forget_decorations(&mut self, c: IVec2, ids: &[DecorationId]) {
        if let Some(v) = self.grid.at_mut(c) {
            v.decorations.retain(|d| !ids.contains(d));
        }
    }

    pub fn push_removed_decorations(&mut self, ids: impl IntoIterator<Item = DecorationId>) {
        self.removed_decorations.extend(ids);
    }

    pub fn take_removed_decorations(&mut self) -> Vec<DecorationId> {
        std::mem::take(&mut self.removed_decorations)
    }

    /* ===========================================================
       road proximity scans
       =========================================================== */

    /// Queue a scan around a freshly placed road point.  Only the part of
    /// the box that overlaps the materialised extent is visited.
    pub fn queue_road_check(&mut self, point: Vec3) {
        let Some((lo, hi)) = self.bounds else {
            return;
        };
        let center = world_to_vertex(&self.settings, point.x, point.z);
        let reach = (self.settings.no_decorations_distance() / self.settings.vertex_spacing()).ceil()
            as i32
            + 1;

        let min = (center - IVec2::splat(reach)).max(lo);
        let max = (center + IVec2::splat(reach)).min(hi);
        if min.x > max.x || min.y > max.y {
            return;
        }
        self.scans.push_back(RoadScan {
            point,
            min,
            size: max - min + IVec2::ONE,
            next: 0,
        });
    }

    pub fn pending_road_scans(&self) -> usize {
        self.scans.len()
    }

    /// Advance queued scans until the budget runs out.  Returns `true` once
    /// the queue is empty.
    pub fn step_road_scans(&mut self, sink: &mut dyn MirrorSink, budget: &FrameBudget) -> bool {
        while let Some(mut scan) = self.scans.pop_front() {
            while scan.next < scan.total() {
                let c = scan.coord(scan.next);
                scan.next += 1;
                self.scan_vertex(c, scan.point, sink);

                if budget.exhausted() {
                    if scan.next < scan.total() {
                        self.scans.push_front(scan);
                    }
                    return self.scans.is_empty();
                }
            }
        }
        true
    }

    fn scan_vertex(&mut self, c: IVec2, point: Vec3, sink: &mut dyn MirrorSink) {
        let no_deco = self.settings.no_decorations_distance();
        let near = self.settings.near_road_distance();
        let dist = vertex_world_xz(&self.settings, c).distance(Vec2::new(point.x, point.z));
        if dist > no_deco {
            return;
        }

        let Some(v) = self.grid.at_mut(c) else {
            return;
        };
        v.color[1] = (no_deco / (dist + 0.01)).clamp(0.0, 1.0);
        v.no_decorations = true;
        if !v.decorations.is_empty() {
            let taken = std::mem::take(&mut v.decorations);
            for m in &v.mirrors {
                sink.drop_decorations(m.chunk, &taken);
            }
            self.removed_decorations.extend(taken);
        }

        // locked ground keeps its height
        if v.locked || dist > near {
            return;
        }
        v.near_road = true;

        let factor = self.rng.gen_range(ROAD_SMOOTH_FACTOR);
        let range = self.rng.gen_range(ROAD_SMOOTH_RANGE) as f32;
        self.smooth_height(c, point.y, factor, range, sink);
        self.lock(c);
    }

    /* ===========================================================
       debug dump
       =========================================================== */

    /// One line per x, one `[±hhh]` cell per y; empty cells print blank.
    pub fn dump(&self, out: &mut impl Write) -> Result<()> {
        let Some((min, max)) = self.bounds else {
            return Ok(());
        };
        for x in min.x..=max.x {
            let mut line = String::new();
            for y in min.y..=max.y {
                match self.grid.at(IVec2::new(x, y)) {
                    Some(v) => {
                        let sign = if v.height < 0.0 { '-' } else { ' ' };
                        line.push_str(&format!("[{}{:03}]", sign, v.height.abs().round() as i64));
                    }
                    None => line.push_str("[    ]"),
                }
            }
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.dump(&mut out)?;
        out.flush()?;
        info!("vertex map written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(Mirror, f32, bool)>);

    impl MirrorSink for Recorder {
        fn push_vertex(&mut self, mirror: Mirror, height: f32, _: [f32; 4], immediate: bool) {
            self.0.push((mirror, height, immediate));
        }
    }

    fn mirror(cx: i32, index: usize) -> Mirror {
        Mirror {
            chunk: IVec2::new(cx, 0),
            index,
        }
    }

    #[test]
    fn missing_vertices_read_as_nan() {
        let map = VertexMap::new(&TerrainSettings::default());
        assert!(map.get_height(IVec2::new(3, 3)).is_nan());
        assert!(map.is_locked(IVec2::new(3, 3)));
        assert!(!map.is_constrained(IVec2::new(3, 3)));
        assert!(map.bounds().is_none());
    }

    #[test]
    fn set_height_is_idempotent() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        let c = IVec2::new(2, -1);
        map.register_mirror(c, mirror(0, 5));

        let mut rec = Recorder::default();
        assert!(map.set_height(c, 12.5, &mut rec));
        let color = map.vertex(c).unwrap().color;
        assert!(!map.set_height(c, 12.5, &mut rec));

        assert_eq!(rec.0.len(), 1);
        assert_eq!(map.vertex(c).unwrap().color, color);
        assert_eq!(map.get_height(c), 12.5);
        assert_eq!(map.bounds(), Some((c, c)));
    }

    #[test]
    fn shared_vertices_push_immediately() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        let corner = IVec2::new(7, 7);
        for (i, cx) in [0, 1, 2, 3].into_iter().enumerate() {
            map.register_mirror(corner, mirror(cx, i));
        }
        map.register_mirror(corner, mirror(0, 0));
        let interior = IVec2::new(3, 3);
        map.register_mirror(interior, mirror(0, 27));

        let mut rec = Recorder::default();
        map.set_height(corner, 1.0, &mut rec);
        map.set_height(interior, 1.0, &mut rec);
        assert_eq!(rec.0.len(), 5);
        assert!(rec.0[..4].iter().all(|&(_, h, imm)| h == 1.0 && imm));
        assert!(!rec.0[4].2);
    }

    #[test]
    fn locked_vertices_never_move() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        let c = IVec2::new(0, 0);
        map.set_height(c, 4.0, &mut ());
        map.lock(c);

        assert!(!map.set_height(c, 9.0, &mut ()));
        assert!(!map.add_height(c, 1.0, &mut ()));
        map.smooth_height(c + IVec2::X, 100.0, 0.99, 4.0, &mut ());
        map.queue_road_check(Vec3::new(-50.0, 77.0, -50.0));
        map.step_road_scans(&mut (), &FrameBudget::unlimited());
        assert_eq!(map.get_height(c), 4.0);
    }

    #[test]
    fn blend_alpha_tracks_steepest_loaded_neighbour() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        let c = IVec2::new(5, 5);
        map.set_height(c + IVec2::X, 10.0, &mut ());
        map.set_height(c + IVec2::NEG_Y, -15.0, &mut ());
        // materialised but never loaded: ignored
        map.lock(c + IVec2::Y);

        map.set_height(c, 20.0, &mut ());
        let alpha = map.vertex(c).unwrap().color[3];
        assert!((alpha - 35.0 / 50.0).abs() < 1e-5);

        map.set_height(c, 500.0, &mut ());
        assert_eq!(map.vertex(c).unwrap().color[3], 1.0);
    }

    #[test]
    fn smoothing_falls_off_with_distance() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        for x in -4..=4 {
            map.set_height(IVec2::new(x, 0), 1.0, &mut ());
        }
        map.lock(IVec2::new(-1, 0));
        map.smooth_height(IVec2::ZERO, 11.0, 1.0, 4.0, &mut ());

        assert_eq!(map.get_height(IVec2::ZERO), 11.0);
        assert_eq!(map.get_height(IVec2::new(-1, 0)), 1.0);
        assert!((map.get_height(IVec2::new(2, 0)) - 6.0).abs() < 1e-4);
        assert_eq!(map.get_height(IVec2::new(4, 0)), 1.0);
        // not materialised by smoothing
        assert!(!map.contains(IVec2::new(0, 1)));
    }

    fn road_fixture() -> (VertexMap, Vec3) {
        let settings = TerrainSettings::default();
        let mut map = VertexMap::new(&settings);
        for x in -2..=10 {
            for y in -2..=10 {
                map.set_height(IVec2::new(x, y), 3.0, &mut ());
            }
        }
        let xz = vertex_world_xz(&settings, IVec2::new(4, 4));
        (map, Vec3::new(xz.x, -2.0, xz.y))
    }

    #[test]
    fn road_scan_flattens_and_locks() {
        let (mut map, point) = road_fixture();
        map.register_decoration(IVec2::new(5, 4), DecorationId(7));
        map.register_decoration(IVec2::new(8, 8), DecorationId(8));

        map.queue_road_check(point);
        assert_eq!(map.pending_road_scans(), 1);
        assert!(map.step_road_scans(&mut (), &FrameBudget::unlimited()));

        let on = map.vertex(IVec2::new(4, 4)).unwrap();
        assert!(on.locked && on.near_road && on.no_decorations);
        assert_eq!(on.height, -2.0);
        assert_eq!(on.color[1], 1.0);

        // one spacing (~14.3) away: inside the no-decoration band only
        let side = map.vertex(IVec2::new(5, 4)).unwrap();
        assert!(side.no_decorations && !side.near_road && !side.locked);
        assert!(map.is_constrained(IVec2::new(4, 4)));
        assert!(!map.is_constrained(IVec2::new(5, 4)));

        let far = map.vertex(IVec2::new(8, 8)).unwrap();
        assert!(!far.no_decorations);
        assert_eq!(map.take_removed_decorations(), vec![DecorationId(7)]);
        assert!(!map.register_decoration(IVec2::new(5, 4), DecorationId(9)));
        assert_eq!(map.take_removed_decorations(), vec![DecorationId(9)]);
    }

    #[test]
    fn road_scan_clears_decorations_on_locked_ground() {
        let (mut map, point) = road_fixture();
        let c = IVec2::new(4, 4);
        map.lock(c);
        map.register_mirror(c, mirror(0, 3));
        assert!(map.register_decoration(c, DecorationId(21)));

        #[derive(Default)]
        struct Dropped(Vec<(IVec2, Vec<DecorationId>)>);
        impl MirrorSink for Dropped {
            fn push_vertex(&mut self, _: Mirror, _: f32, _: [f32; 4], _: bool) {}
            fn drop_decorations(&mut self, chunk: IVec2, ids: &[DecorationId]) {
                self.0.push((chunk, ids.to_vec()));
            }
        }

        let mut dropped = Dropped::default();
        map.queue_road_check(point);
        map.step_road_scans(&mut dropped, &FrameBudget::unlimited());

        let v = map.vertex(c).unwrap();
        assert!(v.no_decorations && v.decorations.is_empty());
        assert!(!v.near_road);
        assert_eq!(v.height, 3.0);
        assert_eq!(map.take_removed_decorations(), vec![DecorationId(21)]);
        assert_eq!(dropped.0, vec![(IVec2::ZERO, vec![DecorationId(21)])]);
        assert!(!map.register_decoration(c, DecorationId(22)));
    }

    #[test]
    fn road_scan_resumes_across_frames() {
        let (mut sliced, point) = road_fixture();
        let (mut whole, _) = road_fixture();
        sliced.queue_road_check(point);
        whole.queue_road_check(point);
        whole.step_road_scans(&mut (), &FrameBudget::unlimited());

        let mut frames = 0;
        while !sliced.step_road_scans(&mut (), &FrameBudget::spent()) {
            frames += 1;
            assert!(frames < 1000);
        }
        assert!(frames > 1);
        for v in whole.iter() {
            let s = sliced.vertex(v.coord).unwrap();
            assert_eq!((s.locked, s.near_road, s.no_decorations), (v.locked, v.near_road, v.no_decorations));
        }
    }

    #[test]
    fn dump_prints_signed_rows() {
        let mut map = VertexMap::new(&TerrainSettings::default());
        map.set_height(IVec2::new(0, 0), -12.4, &mut ());
        map.set_height(IVec2::new(0, 2), 7.0, &mut ());
        map.set_height(IVec2::new(1, 1), 123.0, &mut ());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmap.txt");
        map.dump_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "[-012][    ][ 007]\n[    ][ 123][    ]\n");
    }
}
