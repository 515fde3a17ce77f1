//! diamond‑square mountain, run once after the first load
//!
//! The heightmap is generated a cell at a time and then blended into the
//! vertex map; both phases park between frames like every other terrain task.

use bevy::log::info;
use bevy::math::IVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::budget::FrameBudget;
use crate::config::MountainSettings;
use crate::error::{Result, TerrainError};
use crate::vertex_map::{MirrorSink, VertexMap};

/// Square `(size+1)²` float grid; out-of-range reads give `-∞`.
#[derive(Clone, Debug)]
pub struct Heightmap {
    size: i32,
    cells: Vec<f32>,
}

impl Heightmap {
    fn new(size: i32) -> Self {
        let side = (size + 1) as usize;
        Self {
            size,
            cells: vec![0.0; side * side],
        }
    }

    /// highest valid index on either axis
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn get(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x > self.size || y > self.size {
            return f32::NEG_INFINITY;
        }
        self.cells[(y * (self.size + 1) + x) as usize]
    }

    fn set(&mut self, x: i32, y: i32, h: f32) {
        if x >= 0 && y >= 0 && x <= self.size && y <= self.size {
            self.cells[(y * (self.size + 1) + x) as usize] = h;
        }
    }

    /// mean of the in-range samples
    fn average(&self, points: [(i32, i32); 4]) -> f32 {
        let (sum, count) = points
            .iter()
            .map(|&(x, y)| self.get(x, y))
            .filter(|h| *h != f32::NEG_INFINITY)
            .fold((0.0, 0), |(s, n), h| (s + h, n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// bilinear sample at fractional heightmap coordinates
    fn sample(&self, fx: f32, fy: f32) -> f32 {
        let (x0, y0) = (fx.floor() as i32, fy.floor() as i32);
        let (x1, y1) = ((x0 + 1).min(self.size), (y0 + 1).min(self.size));
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);
        let p00 = self.get(x0, y0);
        let p10 = self.get(x1, y0);
        let p01 = self.get(x0, y1);
        let p11 = self.get(x1, y1);
        (1.0 - tx) * (1.0 - ty) * p00 + tx * (1.0 - ty) * p10 + (1.0 - tx) * ty * p01 + tx * ty * p11
    }
}

/// Where the mountain goes, in vertex units.
#[derive(Clone, Copy, Debug)]
pub struct Footprint {
    pub center: IVec2,
    pub width: i32,
    pub depth: i32,
}

impl Footprint {
    /// smallest footprint covering the inclusive box `min..=max`
    pub fn covering(min: IVec2, max: IVec2) -> Self {
        Self {
            center: (min + max) / 2,
            width: max.x - min.x + 1,
            depth: max.y - min.y + 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Square { x: i32, y: i32 },
    Diamond { x: i32, y: i32 },
    Blend { x: i32, y: i32 },
    Done,
}

pub struct MountainTask {
    heightmap: Heightmap,
    min: IVec2,
    max: IVec2,
    step: i32,
    roughness: f32,
    range: (f32, f32),
    phase: Phase,
    rng: StdRng,
}

impl MountainTask {
    /// Seed the heightmap: corners from the map (0 where missing), centre at
    /// `settings.height`.
    pub fn new(footprint: Footprint, settings: &MountainSettings, vmap: &VertexMap, seed: u64) -> Result<Self> {
        let width = footprint.width | 1;
        let depth = footprint.depth | 1;
        let n = width.max(depth) - 1;
        // a single row or column leaves nothing to interpolate across
        if width.min(depth) < 3 {
            return Err(TerrainError::FootprintTooSmall {
                width: footprint.width,
                depth: footprint.depth,
            });
        }
        let size = (n as u32).next_power_of_two() as i32;

        let min = footprint.center - IVec2::new(width / 2, depth / 2);
        let max = footprint.center + IVec2::new(width / 2, depth / 2);

        let mut heightmap = Heightmap::new(size);
        let corner = |c: IVec2| {
            let h = vmap.get_height(c);
            if h.is_nan() {
                0.0
            } else {
                h
            }
        };
        heightmap.set(0, 0, corner(min));
        heightmap.set(size, 0, corner(IVec2::new(max.x, min.y)));
        heightmap.set(size, size, corner(max));
        heightmap.set(0, size, corner(IVec2::new(min.x, max.y)));
        heightmap.set(size / 2, size / 2, settings.height);

        Ok(Self {
            heightmap,
            min,
            max,
            step: size,
            roughness: settings.roughness,
            range: (settings.range_min, settings.range_max),
            phase: Phase::Square {
                x: size / 2,
                y: size / 2,
            },
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    fn offset(&mut self) -> f32 {
        let (lo, hi) = self.range;
        let r = if lo < hi { self.rng.gen_range(lo..hi) } else { lo };
        r * self.step as f32 * self.roughness
    }

    /// Run until done or out of budget.  Returns `true` when the mountain has
    /// been fully blended into the map.
    pub fn step(&mut self, vmap: &mut VertexMap, sink: &mut dyn MirrorSink, budget: &FrameBudget) -> bool {
        let size = self.heightmap.size;
        loop {
            let half = self.step / 2;
            match self.phase {
                Phase::Square { .. } if half < 1 => {
                    self.phase = Phase::Blend {
                        x: self.min.x,
                        y: self.min.y,
                    };
                    continue;
                }
                Phase::Square { y, .. } if y >= size || self.step == size => {
                    // the centre was seeded, skip the first square pass
                    self.phase = Phase::Diamond { x: half, y: 0 };
                    continue;
                }
                Phase::Square { x, y } if x >= size => {
                    self.phase = Phase::Square {
                        x: half,
                        y: y + self.step,
                    };
                    continue;
                }
                Phase::Square { x, y } => {
                    let avg = self.heightmap.average([
                        (x - half, y - half),
                        (x + half, y - half),
                        (x + half, y + half),
                        (x - half, y + half),
                    ]);
                    let h = avg + self.offset();
                    self.heightmap.set(x, y, h);
                    self.phase = Phase::Square { x: x + self.step, y };
                }
                Phase::Diamond { y, .. } if y > size => {
                    self.step = half;
                    let next = self.step / 2;
                    self.phase = Phase::Square { x: next, y: next };
                    continue;
                }
                Phase::Diamond { x, y } if x > size => {
                    let y = y + half;
                    self.phase = Phase::Diamond {
                        x: (y + half) % self.step,
                        y,
                    };
                    continue;
                }
                Phase::Diamond { x, y } => {
                    let avg = self.heightmap.average([
                        (x, y - half),
                        (x + half, y),
                        (x, y + half),
                        (x - half, y),
                    ]);
                    let h = avg + self.offset();
                    self.heightmap.set(x, y, h);
                    self.phase = Phase::Diamond { x: x + self.step, y };
                }
                Phase::Blend { x, .. } if x > self.max.x => {
                    info!(
                        "mountain blended over ({}, {})..=({}, {})",
                        self.min.x, self.min.y, self.max.x, self.max.y
                    );
                    self.phase = Phase::Done;
                    continue;
                }
                Phase::Blend { x, y } if y > self.max.y => {
                    self.phase = Phase::Blend { x: x + 1, y: self.min.y };
                    continue;
                }
                Phase::Blend { x, y } => {
                    self.blend(IVec2::new(x, y), vmap, sink);
                    self.phase = Phase::Blend { x, y: y + 1 };
                }
                Phase::Done => return true,
            }

            if budget.exhausted() {
                return false;
            }
        }
    }

    fn blend(&self, c: IVec2, vmap: &mut VertexMap, sink: &mut dyn MirrorSink) {
        if !vmap.contains(c) || vmap.is_constrained(c) || vmap.is_locked(c) {
            return;
        }
        let span = (self.max - self.min).max(IVec2::ONE).as_vec2();
        let rel = (c - self.min).as_vec2() / span;
        let size = self.heightmap.size as f32;
        let h = self.heightmap.sample(rel.x * size, rel.y * size);
        vmap.set_height(c, h, sink);
    }
}
