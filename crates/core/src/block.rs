//! Static block-property model.
//!
//! The world store never interprets block semantics itself: solidity,
//! collision shapes and fluid behavior all come from an external asset
//! registry, reached through the [`BlockRegistry`] trait. Registries are
//! read-only after startup and shared by reference across threads.

use std::collections::BTreeSet;

use crate::aabb::AABB;
use crate::position::Position;

/// Opaque flattened-era blockstate identifier, straight off the wire.
///
/// Meaning lives in the registry, not here. The only convention the store
/// itself relies on is that freshly allocated chunk sections are filled
/// with [`BlockstateId::AIR`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockstateId(pub u32);

impl BlockstateId {
    pub const AIR: BlockstateId = BlockstateId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Opaque biome identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u32);

impl BiomeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluidKind {
    Water,
    Lava,
}

/// Static properties of one blockstate.
///
/// `fluid_level` follows the vanilla encoding: 0 is a source, 1..=7 get
/// progressively thinner, 8+ is a falling column. `collision_shapes` are
/// unit-local boxes, offset to world space by [`Blockstate::colliders_at`].
#[derive(Debug, Clone)]
pub struct Blockstate {
    pub name: String,
    pub air: bool,
    pub solid: bool,
    pub fluid: Option<FluidKind>,
    pub fluid_level: u8,
    pub waterlogged: bool,
    pub collision_shapes: Vec<AABB>,
}

impl Blockstate {
    pub fn air(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            air: true,
            solid: false,
            fluid: None,
            fluid_level: 0,
            waterlogged: false,
            collision_shapes: Vec::new(),
        }
    }

    /// A plain full-cube solid block.
    pub fn cube(name: &str) -> Self {
        Self::solid(name, vec![AABB::unit_cube()])
    }

    pub fn solid(name: &str, shapes: Vec<AABB>) -> Self {
        Self {
            name: name.to_owned(),
            air: false,
            solid: true,
            fluid: None,
            fluid_level: 0,
            waterlogged: false,
            collision_shapes: shapes,
        }
    }

    pub fn fluid(name: &str, kind: FluidKind, level: u8) -> Self {
        Self {
            name: name.to_owned(),
            air: false,
            solid: false,
            fluid: Some(kind),
            fluid_level: level,
            waterlogged: false,
            collision_shapes: Vec::new(),
        }
    }

    /// Mark a (non-fluid) state as waterlogged.
    #[must_use]
    pub fn waterlogged(mut self) -> Self {
        self.waterlogged = true;
        self
    }

    pub fn is_air(&self) -> bool {
        self.air
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    pub fn is_fluid(&self) -> bool {
        self.fluid.is_some()
    }

    pub fn is_fluid_or_waterlogged(&self) -> bool {
        self.is_fluid() || self.waterlogged
    }

    pub fn is_water(&self) -> bool {
        self.fluid == Some(FluidKind::Water)
    }

    pub fn is_water_or_waterlogged(&self) -> bool {
        self.is_water() || self.waterlogged
    }

    /// Falling fluid column (vanilla level >= 8).
    pub fn is_fluid_falling(&self) -> bool {
        self.is_fluid() && self.fluid_level >= 8
    }

    /// Fluid surface height within the voxel, in `0.0..=8/9`.
    ///
    /// Sources and falling columns sit at 8/9, flowing levels shrink by
    /// 1/9 per level. Waterlogged states count as full-height water.
    pub fn fluid_height(&self) -> f32 {
        if self.waterlogged {
            return 8.0 / 9.0;
        }
        match self.fluid {
            Some(_) if self.fluid_level >= 8 => 8.0 / 9.0,
            Some(_) => (8 - self.fluid_level) as f32 / 9.0,
            None => 0.0,
        }
    }

    /// Collision boxes offset to the given voxel position, deduplicated.
    /// A block can expose several sub-boxes (stairs, fences); duplicates
    /// from symmetric shape definitions collapse in the ordered set.
    pub fn colliders_at(&self, pos: Position) -> BTreeSet<AABB> {
        let offset = pos.to_vec3();
        self.collision_shapes.iter().map(|s| *s + offset).collect()
    }
}

/// The external asset registry's interface: immutable blockstate lookup.
///
/// Implementations are read-only after startup and shared by reference;
/// the store holds an `Arc<dyn BlockRegistry>` and never mutates it.
pub trait BlockRegistry: Send + Sync {
    /// Static properties behind an id, `None` for ids this registry does
    /// not know (tolerated: unknown blocks are treated like unloaded
    /// terrain by spatial queries).
    fn blockstate(&self, id: BlockstateId) -> Option<&Blockstate>;

    /// The canonical air id reported for unloaded or unallocated terrain.
    fn air_id(&self) -> BlockstateId;
}

/// Dense table-backed registry for tests and simple hosts.
///
/// Id 0 is always air. Real clients would populate this from generated
/// asset data; the store only ever sees the trait.
pub struct TableRegistry {
    states: Vec<Blockstate>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self {
            states: vec![Blockstate::air("minecraft:air")],
        }
    }

    /// Append a state, returning its assigned id.
    pub fn register(&mut self, state: Blockstate) -> BlockstateId {
        let id = BlockstateId(self.states.len() as u32);
        self.states.push(state);
        id
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry for TableRegistry {
    fn blockstate(&self, id: BlockstateId) -> Option<&Blockstate> {
        self.states.get(id.0 as usize)
    }

    fn air_id(&self) -> BlockstateId {
        BlockstateId::AIR
    }
}
