use bevy::math::IVec2;

/// Opaque handle to a decoration (prop, sign, rock) owned by the
/// decoration system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecorationId(pub u64);

/// A chunk-local copy of a logical vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mirror {
    pub chunk: IVec2,
    pub index: usize,
}

/// One sample of the infinite height field.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub coord: IVec2,
    pub height: f32,
    /// set once the road flattened this point; height never changes again
    pub locked: bool,
    pub near_road: bool,
    pub no_decorations: bool,
    /// true after the first real height write
    pub loaded: bool,
    /// rgba; alpha carries the slope blend
    pub color: [f32; 4],
    pub mirrors: Vec<Mirror>,
    pub decorations: Vec<DecorationId>,
}

impl Vertex {
    pub fn new(coord: IVec2, color: [f32; 4]) -> Self {
        Self {
            coord,
            height: 0.0,
            locked: false,
            near_road: false,
            no_decorations: false,
            loaded: false,
            color,
            mirrors: Vec::new(),
            decorations: Vec::new(),
        }
    }

    /// register a mesh copy; duplicates are ignored
    pub fn add_mirror(&mut self, mirror: Mirror) {
        if !self.mirrors.contains(&mirror) {
            self.mirrors.push(mirror);
        }
    }

    pub fn remove_mirrors_of(&mut self, chunk: IVec2) {
        self.mirrors.retain(|m| m.chunk != chunk);
    }

    /// a vertex is constrained once the road claimed it
    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.near_road
    }
}
