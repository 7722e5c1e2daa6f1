//! Concurrent voxel-world store: a chunk-partitioned, multi-dimension
//! spatial database for a live Minecraft-protocol world, plus the spatial
//! query engine built on top of it (collision sweep, voxel raycasting,
//! fluid-flow sampling).
//!
//! The network layer feeds decoded mutation events into
//! [`World::handle`](world::World::handle); bot/physics threads call the
//! read queries concurrently. One reader/writer lock guards the whole
//! store, so every query observes a consistent snapshot and every write is
//! linearized.

use uuid::Uuid;

pub mod chunk;
pub mod world;

pub use world::events::WorldEvent;
pub use world::{DimensionInfo, RaycastHit, World};

/// Opaque token identifying one chunk-loading session.
///
/// Chunks stay resident while at least one loader holds them; removing the
/// last loader destroys the chunk. Several sessions sharing one [`World`]
/// each mint their own token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(Uuid);

impl LoaderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LoaderId {
    fn default() -> Self {
        Self::new()
    }
}
