//! Mutation events consumed from the network collaborator.
//!
//! The protocol layer decodes raw packets into these shapes and feeds them
//! to [`World::handle`]; each event runs as one write-locked critical
//! section. Anomalies (data for unloaded chunks, undecodable payloads) are
//! logged and absorbed here -- nothing propagates back to the decoder.

use fastnbt::Value;
use forage_core::{BiomeId, BlockstateId, Position, SectionPos};
use tracing::warn;

use super::{ChunkPos, DimensionInfo, World};
use crate::LoaderId;
use crate::chunk::BlockEntityRecord;

/// One decoded world-mutation event.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    /// Attach a loader to a chunk coordinate, creating the chunk on first
    /// attach.
    ChunkLoad {
        x: i32,
        z: i32,
        dimension: String,
        loader: LoaderId,
    },
    /// Detach a loader; the chunk is destroyed when the last one leaves.
    ChunkUnload { x: i32, z: i32, loader: LoaderId },
    /// Single-voxel write.
    BlockSet { pos: Position, block: BlockstateId },
    /// Batched voxel writes within one 16^3 section; positions are
    /// section-local.
    BulkBlockSet {
        section: SectionPos,
        changes: Vec<(Position, BlockstateId)>,
    },
    /// Full block/biome replacement of one chunk, plus its block entities.
    ChunkBulkData {
        x: i32,
        z: i32,
        data: Vec<u8>,
        block_entities: Vec<BlockEntityRecord>,
    },
    /// Per-section light replace/clear; queued if the chunk is absent.
    LightUpdate {
        x: i32,
        z: i32,
        dimension: String,
        present_mask: Vec<u64>,
        empty_mask: Vec<u64>,
        payload: Vec<Vec<u8>>,
        is_sky: bool,
    },
    /// Whole-chunk biome replacement.
    ChunkBiomes { x: i32, z: i32, data: Vec<u8> },
    /// Single-position biome write.
    BiomeSet { pos: Position, biome: BiomeId },
    /// Set (`Some`) or remove (`None`) a block-entity blob.
    BlockEntityData {
        pos: Position,
        data: Option<Value>,
    },
    /// Dimension switch (login/respawn): record the dimension's metadata,
    /// drop the issuing loader's chunks, make it current.
    DimensionChange {
        dimension: String,
        height: i32,
        min_y: i32,
        ultrawarm: bool,
        loader: LoaderId,
    },
}

impl World {
    /// Apply one decoded protocol event.
    pub fn handle(&self, event: WorldEvent) {
        match event {
            WorldEvent::ChunkLoad {
                x,
                z,
                dimension,
                loader,
            } => {
                self.load_chunk(x, z, &dimension, loader);
            }
            WorldEvent::ChunkUnload { x, z, loader } => {
                self.unload_chunk(x, z, loader);
            }
            WorldEvent::BlockSet { pos, block } => {
                self.set_block(pos, block);
            }
            WorldEvent::BulkBlockSet { section, changes } => {
                let origin = section.origin();
                let mut state = self.state.write();
                for (local, block) in changes {
                    Self::set_block_impl(&mut state, origin + local, block);
                }
            }
            WorldEvent::ChunkBulkData {
                x,
                z,
                data,
                block_entities,
            } => {
                let mut state = self.state.write();
                let Some(chunk) = state.terrain.get_mut(&ChunkPos::new(x, z)) else {
                    warn!(x, z, "bulk chunk data for an unloaded chunk dropped");
                    return;
                };
                if let Err(err) = chunk.load_chunk_data(&data) {
                    warn!(x, z, %err, "undecodable chunk data dropped");
                    return;
                }
                chunk.load_block_entities(block_entities);
            }
            WorldEvent::LightUpdate {
                x,
                z,
                dimension,
                present_mask,
                empty_mask,
                payload,
                is_sky,
            } => {
                self.update_chunk_light(
                    x,
                    z,
                    &dimension,
                    &present_mask,
                    &empty_mask,
                    &payload,
                    is_sky,
                );
            }
            WorldEvent::ChunkBiomes { x, z, data } => {
                let mut state = self.state.write();
                let Some(chunk) = state.terrain.get_mut(&ChunkPos::new(x, z)) else {
                    warn!(x, z, "biome data for an unloaded chunk dropped");
                    return;
                };
                if let Err(err) = chunk.load_biomes(&data) {
                    warn!(x, z, %err, "undecodable biome data dropped");
                }
            }
            WorldEvent::BiomeSet { pos, biome } => {
                self.set_biome(pos, biome);
            }
            WorldEvent::BlockEntityData { pos, data } => {
                self.set_block_entity_data(pos, data);
            }
            WorldEvent::DimensionChange {
                dimension,
                height,
                min_y,
                ultrawarm,
                loader,
            } => {
                let mut state = self.state.write();
                state.dim_index(&dimension);
                state.dimension_info.insert(
                    dimension.clone(),
                    DimensionInfo {
                        height,
                        min_y,
                        ultrawarm,
                    },
                );
                Self::unload_all_chunks_impl(&mut state, loader);
                self.set_current_dimension_impl(&mut state, &dimension);
            }
        }
    }
}
