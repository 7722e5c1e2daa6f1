//! Value types shared by every layer of the forage stack: integer voxel
//! coordinates, axis-aligned bounding boxes, and the static block-property
//! model the world store queries through the [`block::BlockRegistry`] trait.
//!
//! Nothing in this crate locks, allocates per-query, or owns mutable state.

pub mod aabb;
pub mod block;
pub mod position;

pub use aabb::AABB;
pub use block::{BiomeId, BlockRegistry, Blockstate, BlockstateId, FluidKind, TableRegistry};
pub use position::{CHUNK_WIDTH, ChunkPos, Position, SECTION_HEIGHT, SectionPos};

/// Continuous world-space vector (positions, velocities, ray directions).
pub type Vec3 = cgmath::Vector3<f64>;
