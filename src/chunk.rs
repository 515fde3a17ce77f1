//! one square mesh tile of the terrain
//!
//! A chunk mirrors `resolution²` vertices of the [`VertexMap`] into local
//! render buffers.  Topology never changes after construction; only heights,
//! normals and colours move.  Chunks leaving the load window are pooled and
//! later reused at a new coordinate.

use std::sync::Arc;

use bevy::log::{error, warn};
use bevy::math::{IVec2, Vec3};

use crate::budget::FrameBudget;
use crate::config::TerrainSettings;
use crate::error::{Result, TerrainError};
use crate::interfaces::RoadPath;
use crate::pool::Poolable;
use crate::spectrum::LinInt;
use crate::vertex::{DecorationId, Mirror};
use crate::vertex_map::{MirrorSink, VertexMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

/// Vertex colouring used by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DebugColors {
    /// per-vertex colours from the map
    #[default]
    Off,
    /// black where decorations are forbidden, white elsewhere
    Constrained,
}

/* ===========================================================
   shared topology
   =========================================================== */
/// Everything that depends only on the settings: built once, shared by
/// every chunk.
#[derive(Clone, Debug)]
pub struct ChunkTopology {
    pub resolution: usize,
    pub spacing: f32,
    pub chunk_size: f32,
    pub triangles: Arc<[u32]>,
    pub uvs: Arc<[[f32; 2]]>,
}

impl ChunkTopology {
    pub fn new(settings: &TerrainSettings) -> Self {
        let res = settings.chunk_resolution;
        let last = (res - 1) as f32;

        let mut triangles = Vec::with_capacity((res - 1) * (res - 1) * 6);
        for row in 0..res - 1 {
            for col in 0..res - 1 {
                let v = (row * res + col) as u32;
                let r = res as u32;
                // counter-clockwise seen from +Y
                triangles.extend_from_slice(&[v, v + r, v + 1]);
                triangles.extend_from_slice(&[v + 1, v + r, v + r + 1]);
            }
        }

        let uvs: Vec<[f32; 2]> = (0..res * res)
            .map(|i| {
                let (col, row) = ((i % res) as f32, (i / res) as f32);
                [col / last, (last - row) / last]
            })
            .collect();

        Self {
            resolution: res,
            spacing: settings.vertex_spacing(),
            chunk_size: settings.chunk_size,
            triangles: triangles.into(),
            uvs: uvs.into(),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.resolution * self.resolution
    }

    #[inline]
    fn stride(&self) -> i32 {
        self.resolution as i32 - 1
    }
}

/* ===========================================================
   incremental refresh
   =========================================================== */
/// What a refresh pass needs from the outside world this frame.
pub struct RefreshInput<'a> {
    pub player: Vec3,
    pub curve: Option<&'a LinInt>,
}

/// Cursor of a per-vertex "catch up with the music" walk over one chunk.
#[derive(Clone, Debug)]
pub struct RefreshPass {
    chunk: IVec2,
    first_vertex: IVec2,
    resolution: usize,
    next: usize,
}

impl RefreshPass {
    pub fn chunk(&self) -> IVec2 {
        self.chunk
    }

    /// Visit vertices until the budget runs out.  Each vertex first pulls its
    /// current height into the chunk; unconstrained vertices inside the
    /// update band then get the spectrum offset added.  Returns `true` once
    /// the pass is over.
    pub fn step(
        &mut self,
        vmap: &mut VertexMap,
        sink: &mut dyn MirrorSink,
        input: &RefreshInput,
        budget: &FrameBudget,
    ) -> bool {
        let settings = vmap.settings();
        let height_scale = settings.height_scale;
        let band = settings.vertex_update_distance;
        let margin = settings.chunk_size * 0.5;

        let res = self.resolution;
        let total = res * res;
        while self.next < total {
            let index = self.next;
            self.next += 1;
            let c = self.first_vertex + IVec2::new((index % res) as i32, (index / res) as i32);

            let Some(v) = vmap.vertex(c) else {
                warn!("refresh of chunk {:?}: vertex {:?} missing", self.chunk, c);
                continue;
            };
            let frozen = v.locked || v.is_constrained();
            sink.push_vertex(Mirror { chunk: self.chunk, index }, v.height, v.color, false);

            let Some(curve) = input.curve else {
                return true;
            };

            if !frozen {
                if let Some(pos) = vmap.world_position(c) {
                    let to_vertex = pos - input.player;
                    let dist = to_vertex.length();
                    if (dist - band).abs() < margin && dist > 0.0 {
                        let angle = Vec3::X.angle_between(to_vertex).to_degrees();
                        let dy = curve.sample(angle / 360.0) * height_scale;
                        if dy != 0.0 {
                            vmap.add_height(c, dy, sink);
                        }
                    }
                }
            }

            if self.next < total && budget.exhausted() {
                return false;
            }
        }
        true
    }
}

/* ===========================================================
   road proximity
   =========================================================== */
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoadCheck {
    pub near_road: bool,
    pub has_road: bool,
}

/* ===========================================================
   Chunk
   =========================================================== */
pub struct Chunk {
    id: ChunkId,
    coord: IVec2,
    topology: ChunkTopology,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Vec<[f32; 4]>,
    priority: f32,
    needs_rebuild: bool,
    needs_color_update: bool,
    has_checked_for_road: bool,
    near_road: bool,
    has_road: bool,
    decorations: Vec<DecorationId>,
    refresh: Option<RefreshPass>,
    debug_colors: DebugColors,
    active: bool,
    revision: u64,
}

impl Chunk {
    /// allocate buffers and bind to `coord`
    pub fn new(id: ChunkId, coord: IVec2, topology: &ChunkTopology, vmap: &mut VertexMap) -> Self {
        let n = topology.vertex_count();
        let mut chunk = Self {
            id,
            coord,
            topology: topology.clone(),
            positions: vec![Vec3::ZERO; n],
            normals: vec![Vec3::Y; n],
            colors: vec![[1.0; 4]; n],
            priority: 0.0,
            needs_rebuild: false,
            needs_color_update: false,
            has_checked_for_road: false,
            near_road: false,
            has_road: false,
            decorations: Vec::new(),
            refresh: None,
            debug_colors: DebugColors::Off,
            active: true,
            revision: 0,
        };
        chunk.bind(vmap);
        chunk
    }

    /// rebind a pooled chunk to a new coordinate, keeping its buffers
    pub fn reuse(&mut self, coord: IVec2, vmap: &mut VertexMap) {
        self.coord = coord;
        self.priority = 0.0;
        self.has_checked_for_road = false;
        self.near_road = false;
        self.has_road = false;
        self.decorations.clear();
        self.refresh = None;
        self.bind(vmap);
    }

    /// register every mirror and pull heights/colours from the map
    fn bind(&mut self, vmap: &mut VertexMap) {
        let spacing = self.topology.spacing;
        for index in 0..self.positions.len() {
            let local = self.local_coord(index);
            let v = vmap.register_mirror(self.first_vertex() + local, Mirror {
                chunk: self.coord,
                index,
            });
            self.positions[index] = Vec3::new(local.x as f32 * spacing, v.height, local.y as f32 * spacing);
            self.colors[index] = v.color;
        }
        if self.debug_colors != DebugColors::Off {
            self.apply_debug_colors(self.debug_colors, vmap);
        }
        self.rebuild();
        self.rebuild_colors();
    }

    /// Undo `bind`: drop every mirror registration and hand the chunk's
    /// decorations to the removal outbox.  Called before pooling.
    pub fn release(&mut self, vmap: &mut VertexMap) {
        for index in 0..self.positions.len() {
            let c = self.vertex_coord(index);
            if !self.decorations.is_empty() {
                vmap.forget_decorations(c, &self.decorations);
            }
            vmap.deregister_mirror(c, self.coord);
        }
        vmap.push_removed_decorations(self.decorations.drain(..));
    }

    /* -------- coordinates -------- */

    #[inline]
    fn local_coord(&self, index: usize) -> IVec2 {
        let res = self.topology.resolution;
        IVec2::new((index % res) as i32, (index / res) as i32)
    }

    pub fn first_vertex(&self) -> IVec2 {
        self.coord * self.topology.stride()
    }

    /// map coordinate mirrored by local vertex `index`
    pub fn vertex_coord(&self, index: usize) -> IVec2 {
        self.first_vertex() + self.local_coord(index)
    }

    /// local buffer index of a map coordinate
    pub fn local_index_of(&self, vertex: IVec2) -> Result<usize> {
        let local = vertex - self.first_vertex();
        let res = self.topology.resolution as i32;
        if local.x < 0 || local.y < 0 || local.x >= res || local.y >= res {
            return Err(TerrainError::VertexNotInChunk {
                vertex,
                chunk: self.coord,
            });
        }
        Ok((local.y * res + local.x) as usize)
    }

    /// world position of local index 0
    pub fn origin(&self) -> Vec3 {
        let size = self.topology.chunk_size;
        Vec3::new(
            self.coord.x as f32 * size - size * 0.5,
            0.0,
            self.coord.y as f32 * size - size * 0.5,
        )
    }

    /* -------- mirror updates -------- */

    /// Apply a pushed height.  Shared vertices rebuild right away so both
    /// sides of a seam change in the same frame.
    pub fn update_vertex(&mut self, index: usize, height: f32, immediate: bool) -> bool {
        let Some(p) = self.positions.get_mut(index) else {
            error!("chunk {:?}: invalid vertex index {}", self.coord, index);
            return false;
        };
        if p.y == height {
            return false;
        }
        p.y = height;
        self.priority += 1.0;
        if immediate {
            self.rebuild();
        } else {
            self.needs_rebuild = true;
        }
        true
    }

    pub fn update_color(&mut self, index: usize, color: [f32; 4]) {
        if self.debug_colors != DebugColors::Off {
            return;
        }
        match self.colors.get_mut(index) {
            Some(c) if *c != color => {
                *c = color;
                self.needs_color_update = true;
            }
            Some(_) => {}
            None => error!("chunk {:?}: invalid color index {}", self.coord, index),
        }
    }

    /// recompute normals from the height buffer
    pub fn rebuild(&mut self) {
        let res = self.topology.resolution;
        let spacing = self.topology.spacing;
        let h = |col: usize, row: usize| self.positions[row * res + col].y;

        for row in 0..res {
            for col in 0..res {
                let (l, r) = (col.saturating_sub(1), (col + 1).min(res - 1));
                let (d, u) = (row.saturating_sub(1), (row + 1).min(res - 1));
                let dx = (h(r, row) - h(l, row)) / ((r - l) as f32 * spacing);
                let dz = (h(col, u) - h(col, d)) / ((u - d) as f32 * spacing);
                self.normals[row * res + col] = Vec3::new(-dx, 1.0, -dz).normalize();
            }
        }
        self.needs_rebuild = false;
        self.revision += 1;
    }

    pub fn rebuild_colors(&mut self) {
        self.needs_color_update = false;
        self.revision += 1;
    }

    /* -------- service -------- */

    /// One budgeted service slot: flush dirty buffers, run the one-shot
    /// road check and start a refresh pass if none is running.
    pub fn chunk_update(&mut self, road: Option<(&dyn RoadPath, f32)>, check_resolution: f32) -> Option<RoadCheck> {
        if self.needs_rebuild {
            self.rebuild();
        }
        if self.needs_color_update {
            self.rebuild_colors();
        }

        let check = match road {
            Some((road, progress)) if !self.has_checked_for_road && road.is_loaded() => {
                Some(self.check_for_road(road, progress, check_resolution))
            }
            _ => None,
        };

        if self.refresh.is_none() {
            self.refresh = Some(RefreshPass {
                chunk: self.coord,
                first_vertex: self.first_vertex(),
                resolution: self.topology.resolution,
                next: 0,
            });
        }

        self.priority = 0.0;
        check
    }

    /// Sample the road from `start` to its end.  "Near" means inside the
    /// footprint grown by one chunk on every side; "has" means inside the
    /// footprint itself.
    pub fn check_for_road(&mut self, road: &dyn RoadPath, start: f32, check_resolution: f32) -> RoadCheck {
        self.has_checked_for_road = true;
        let size = self.topology.chunk_size;
        let origin = self.origin();
        let inside = |p: Vec3, lo: f32, hi: f32| {
            p.x >= origin.x + lo && p.x <= origin.x + hi && p.z >= origin.z + lo && p.z <= origin.z + hi
        };

        let samples = (1.0 - start) * check_resolution * road.segment_count().max(1) as f32;
        let step = if samples > 0.0 { 1.0 / samples } else { f32::INFINITY };

        let mut progress = start;
        while progress <= 1.0 {
            let sample = road.point(progress);
            if inside(sample, -size, size * 2.0) {
                self.near_road = true;
                if inside(sample, 0.0, size) {
                    self.has_road = true;
                    break;
                }
            }
            progress += step;
        }

        RoadCheck {
            near_road: self.near_road,
            has_road: self.has_road,
        }
    }

    /// re-arm the road latch (the road grew)
    pub fn rearm_road_check(&mut self) {
        if !self.near_road {
            self.has_checked_for_road = false;
        }
    }

    pub fn stop_updating(&mut self) {
        self.refresh = None;
    }

    pub fn take_refresh(&mut self) -> Option<RefreshPass> {
        self.refresh.take()
    }

    pub fn resume_refresh(&mut self, pass: RefreshPass) {
        if self.active && pass.chunk == self.coord {
            self.refresh = Some(pass);
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    pub fn apply_debug_colors(&mut self, mode: DebugColors, vmap: &VertexMap) {
        self.debug_colors = mode;
        for index in 0..self.colors.len() {
            let Some(v) = vmap.vertex(self.vertex_coord(index)) else {
                continue;
            };
            self.colors[index] = match mode {
                DebugColors::Off => v.color,
                DebugColors::Constrained if v.no_decorations => [0.0, 0.0, 0.0, 1.0],
                DebugColors::Constrained => [1.0; 4],
            };
        }
        self.needs_color_update = true;
    }

    /* -------- accessors -------- */

    pub fn id(&self) -> ChunkId {
        self.id
    }
    pub fn coord(&self) -> IVec2 {
        self.coord
    }
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.topology.uvs
    }
    pub fn triangles(&self) -> &[u32] {
        &self.topology.triangles
    }
    pub fn priority(&self) -> f32 {
        self.priority
    }
    pub fn age(&mut self) {
        self.priority += 1.0;
    }
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }
    pub fn near_road(&self) -> bool {
        self.near_road
    }
    pub fn has_road(&self) -> bool {
        self.has_road
    }
    pub fn has_checked_for_road(&self) -> bool {
        self.has_checked_for_road
    }
    pub fn is_active(&self) -> bool {
        self.active
    }
    /// bumped on every geometry or colour rebuild
    pub fn revision(&self) -> u64 {
        self.revision
    }
    pub fn decorations(&self) -> &[DecorationId] {
        &self.decorations
    }
    pub fn add_decoration(&mut self, id: DecorationId) {
        self.decorations.push(id);
    }

    pub fn remove_decorations(&mut self, ids: &[DecorationId]) {
        self.decorations.retain(|d| !ids.contains(d));
    }
}

impl Poolable for Chunk {
    fn on_pool(&mut self) {
        self.active = false;
        self.priority = 0.0;
        self.refresh = None;
    }

    fn on_depool(&mut self) {
        self.active = true;
    }
}
