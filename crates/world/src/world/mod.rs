//! The top-level store: a reader/writer-locked map from chunk column
//! coordinate to [`Chunk`], the per-dimension metadata registry, and the
//! pending-light queue. Spatial queries live in the [`spatial`] sibling,
//! the protocol event surface in [`events`].
//!
//! Locking discipline: every read query takes the shared lock, every
//! mutation the exclusive lock, for the whole duration of the call. Writes
//! are linearized; a query never observes a torn cross-chunk state. No
//! call blocks on I/O while holding the lock.

pub mod events;
mod spatial;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use forage_core::{
    BiomeId, BlockRegistry, Blockstate, BlockstateId, CHUNK_WIDTH, ChunkPos, Position,
    SECTION_HEIGHT,
};
use indexmap::IndexSet;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::warn;

use crate::LoaderId;
use crate::chunk::Chunk;

pub use spatial::RaycastHit;

/// Vertical bounds assumed for dimensions the server has not described yet
/// (the modern overworld's).
pub const DEFAULT_HEIGHT: i32 = 384;
pub const DEFAULT_MIN_Y: i32 = -64;

/// Per-dimension metadata delivered by registry/respawn data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionInfo {
    pub height: i32,
    pub min_y: i32,
    pub ultrawarm: bool,
}

impl Default for DimensionInfo {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            min_y: DEFAULT_MIN_Y,
            ultrawarm: false,
        }
    }
}

/// A light update that arrived before its chunk; replayed on load.
struct PendingLightUpdate {
    dimension: String,
    present_mask: Vec<u64>,
    empty_mask: Vec<u64>,
    payload: Vec<Vec<u8>>,
    is_sky: bool,
}

/// Everything guarded by the world lock.
struct WorldState {
    terrain: HashMap<ChunkPos, Chunk>,
    current_dimension: String,
    /// Append-only bidirectional dimension registry: the set index is the
    /// dimension's small integer id.
    dimensions: IndexSet<String>,
    dimension_info: HashMap<String, DimensionInfo>,
    pending_light: HashMap<ChunkPos, Vec<PendingLightUpdate>>,
}

impl WorldState {
    /// Index for a dimension name, assigning the next id on first sight.
    fn dim_index(&mut self, dimension: &str) -> usize {
        if let Some(index) = self.dimensions.get_index_of(dimension) {
            return index;
        }
        self.dimensions.insert_full(dimension.to_owned()).0
    }

    fn info(&self, dimension: &str) -> DimensionInfo {
        self.dimension_info
            .get(dimension)
            .copied()
            .unwrap_or_default()
    }

    /// Block id at a world position. `None` means the chunk is unloaded;
    /// an unallocated section inside a loaded chunk reads as `air`.
    fn block_at(&self, pos: Position, air: BlockstateId) -> Option<BlockstateId> {
        let chunk = self.terrain.get(&pos.chunk())?;
        Some(chunk.get_block(pos.local()).unwrap_or(air))
    }
}

/// The concurrent voxel-world store. One instance per logical game
/// connection, or one shared across several sessions (see
/// [`World::shared`]).
pub struct World {
    state: RwLock<WorldState>,
    registry: Arc<dyn BlockRegistry>,
    /// Canonical air id, looked up from the registry once.
    air: BlockstateId,
    is_shared: bool,
    /// Tags outgoing player interactions for server acknowledgment.
    /// Lock-free; unrelated to terrain storage.
    interaction_sequence_id: AtomicI32,
}

impl World {
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        Self::build(registry, false)
    }

    /// A world attached to several independent client sessions. Disables
    /// nothing functionally, but dimension changes get flagged: the
    /// cached-dimension bookkeeping assumes one dimension at a time.
    pub fn shared(registry: Arc<dyn BlockRegistry>) -> Self {
        Self::build(registry, true)
    }

    fn build(registry: Arc<dyn BlockRegistry>, is_shared: bool) -> Self {
        let air = registry.air_id();
        Self {
            state: RwLock::new(WorldState {
                terrain: HashMap::new(),
                current_dimension: String::new(),
                dimensions: IndexSet::new(),
                dimension_info: HashMap::new(),
                pending_light: HashMap::new(),
            }),
            registry,
            air,
            is_shared,
            interaction_sequence_id: AtomicI32::new(0),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    /// Next interaction sequence id (starts at 1). Atomic, no world lock.
    pub fn next_interaction_sequence_id(&self) -> i32 {
        self.interaction_sequence_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    // ── Dimension register ──────────────────────────────────────────────

    pub fn get_current_dimension(&self) -> String {
        self.state.read().current_dimension.clone()
    }

    pub fn set_current_dimension(&self, dimension: &str) {
        let mut state = self.state.write();
        self.set_current_dimension_impl(&mut state, dimension);
    }

    fn set_current_dimension_impl(&self, state: &mut WorldState, dimension: &str) {
        if self.is_shared
            && !state.current_dimension.is_empty()
            && state.current_dimension != dimension
        {
            warn!(
                from = %state.current_dimension,
                to = %dimension,
                "changing dimension on a shared world is not supported and can corrupt world data"
            );
        }
        state.current_dimension = dimension.to_owned();
        // Queued light updates were keyed to the old dimension context.
        state.pending_light.clear();
    }

    pub fn set_dimension_info(&self, dimension: &str, info: DimensionInfo) {
        let mut state = self.state.write();
        state.dim_index(dimension);
        state.dimension_info.insert(dimension.to_owned(), info);
    }

    /// Current dimension's total height, [`DEFAULT_HEIGHT`] if unknown.
    pub fn get_height(&self) -> i32 {
        let state = self.state.read();
        state.info(&state.current_dimension).height
    }

    /// Current dimension's lowest buildable y, [`DEFAULT_MIN_Y`] if unknown.
    pub fn get_min_y(&self) -> i32 {
        let state = self.state.read();
        state.info(&state.current_dimension).min_y
    }

    pub fn is_ultrawarm(&self) -> bool {
        let state = self.state.read();
        state.info(&state.current_dimension).ultrawarm
    }

    /// Dimension name of the chunk at (x, z), if that chunk is loaded.
    pub fn get_dimension(&self, x: i32, z: i32) -> Option<String> {
        let state = self.state.read();
        let chunk = state.terrain.get(&ChunkPos::new(x, z))?;
        state
            .dimensions
            .get_index(chunk.dimension_index())
            .cloned()
    }

    // ── Chunk residency ─────────────────────────────────────────────────

    pub fn load_chunk(&self, x: i32, z: i32, dimension: &str, loader: LoaderId) {
        let mut state = self.state.write();
        self.load_chunk_impl(&mut state, x, z, dimension, loader);
    }

    fn load_chunk_impl(
        &self,
        state: &mut WorldState,
        x: i32,
        z: i32,
        dimension: &str,
        loader: LoaderId,
    ) {
        let has_sky_light = dimension == "minecraft:overworld";
        let dim_index = state.dim_index(dimension);
        let info = state.info(dimension);
        let pos = ChunkPos::new(x, z);

        match state.terrain.entry(pos) {
            Entry::Vacant(entry) => {
                let mut chunk = Chunk::new(info.min_y, info.height, dim_index, has_sky_light);
                chunk.add_loader(loader);
                entry.insert(chunk);
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.dimension_index() != dim_index {
                    // A loaded coordinate changing dimension under us is
                    // not sound; rebuild in place rather than crash on
                    // misbehaving servers. Loaders attached to the old
                    // chunk are dropped with it.
                    warn!(
                        x,
                        z,
                        dimension,
                        "chunk reloaded under a different dimension; rebuilding in place"
                    );
                    if self.is_shared {
                        warn!(
                            "changing dimension with a shared world is not supported and can corrupt world data"
                        );
                    }
                    let mut chunk = Chunk::new(info.min_y, info.height, dim_index, has_sky_light);
                    chunk.add_loader(loader);
                    *existing = chunk;
                } else {
                    existing.add_loader(loader);
                }
            }
        }

        // Replay light that raced ahead of this chunk, in arrival order,
        // inside the same critical section as the load itself.
        if let Some(pending) = state.pending_light.remove(&pos) {
            for update in pending {
                self.update_chunk_light_impl(
                    state,
                    x,
                    z,
                    &update.dimension,
                    &update.present_mask,
                    &update.empty_mask,
                    &update.payload,
                    update.is_sky,
                    false,
                );
            }
        }
    }

    pub fn unload_chunk(&self, x: i32, z: i32, loader: LoaderId) {
        let mut state = self.state.write();
        Self::unload_chunk_impl(&mut state, x, z, loader);
    }

    fn unload_chunk_impl(state: &mut WorldState, x: i32, z: i32, loader: LoaderId) {
        let pos = ChunkPos::new(x, z);
        let remaining = match state.terrain.get_mut(&pos) {
            Some(chunk) => chunk.remove_loader(loader),
            None => return,
        };
        if remaining == 0 {
            state.terrain.remove(&pos);
        }
    }

    /// Detach a loader from every chunk, dropping the ones it held alone.
    pub fn unload_all_chunks(&self, loader: LoaderId) {
        let mut state = self.state.write();
        Self::unload_all_chunks_impl(&mut state, loader);
    }

    fn unload_all_chunks_impl(state: &mut WorldState, loader: LoaderId) {
        state
            .terrain
            .retain(|_, chunk| chunk.remove_loader(loader) != 0);
    }

    pub fn is_loaded(&self, pos: Position) -> bool {
        self.state.read().terrain.contains_key(&pos.chunk())
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.state.read().terrain.len()
    }

    // ── Voxel mutation ──────────────────────────────────────────────────

    pub fn set_block(&self, pos: Position, id: BlockstateId) {
        let mut state = self.state.write();
        Self::set_block_impl(&mut state, pos, id);
    }

    fn set_block_impl(state: &mut WorldState, pos: Position, id: BlockstateId) {
        let Some(chunk) = state.terrain.get_mut(&pos.chunk()) else {
            // Dropped, not buffered: the server will resend the chunk.
            warn!(?pos, "block update for an unloaded chunk dropped");
            return;
        };
        chunk.set_block(pos.local(), id);
    }

    pub fn set_biome(&self, pos: Position, biome: BiomeId) {
        let mut state = self.state.write();
        if let Some(chunk) = state.terrain.get_mut(&pos.chunk()) {
            chunk.set_biome(pos.local(), biome);
        }
    }

    pub fn set_sky_light(&self, pos: Position, level: u8) {
        let mut state = self.state.write();
        if let Some(chunk) = state.terrain.get_mut(&pos.chunk()) {
            chunk.set_sky_light(pos.local(), level);
        }
    }

    pub fn set_block_light(&self, pos: Position, level: u8) {
        let mut state = self.state.write();
        if let Some(chunk) = state.terrain.get_mut(&pos.chunk()) {
            chunk.set_block_light(pos.local(), level);
        }
    }

    /// Set (`Some`) or remove (`None`) a block-entity blob.
    pub fn set_block_entity_data(&self, pos: Position, data: Option<fastnbt::Value>) {
        let mut state = self.state.write();
        let Some(chunk) = state.terrain.get_mut(&pos.chunk()) else {
            return;
        };
        match data {
            Some(value) => chunk.set_block_entity_data(pos.local(), value),
            None => chunk.remove_block_entity_data(pos.local()),
        }
    }

    // ── Voxel queries ───────────────────────────────────────────────────

    /// Block at a position. Unloaded chunks and unallocated sections read
    /// as the canonical air id; use [`World::is_loaded`] to tell "known
    /// air" from "unknown".
    pub fn get_block(&self, pos: Position) -> BlockstateId {
        let state = self.state.read();
        state.block_at(pos, self.air).unwrap_or(self.air)
    }

    /// Batched [`World::get_block`] under a single lock acquisition.
    pub fn get_blocks(&self, positions: &[Position]) -> Vec<BlockstateId> {
        let state = self.state.read();
        positions
            .iter()
            .map(|pos| state.block_at(*pos, self.air).unwrap_or(self.air))
            .collect()
    }

    pub fn get_biome(&self, pos: Position) -> Option<BiomeId> {
        let state = self.state.read();
        state.terrain.get(&pos.chunk())?.get_biome(pos.local())
    }

    pub fn get_sky_light(&self, pos: Position) -> u8 {
        let state = self.state.read();
        state
            .terrain
            .get(&pos.chunk())
            .map_or(0, |chunk| chunk.get_sky_light(pos.local()))
    }

    pub fn get_block_light(&self, pos: Position) -> u8 {
        let state = self.state.read();
        state
            .terrain
            .get(&pos.chunk())
            .map_or(0, |chunk| chunk.get_block_light(pos.local()))
    }

    pub fn get_block_entity_data(&self, pos: Position) -> Option<fastnbt::Value> {
        let state = self.state.read();
        state
            .terrain
            .get(&pos.chunk())?
            .get_block_entity_data(pos.local())
            .cloned()
    }

    // ── Bulk light ──────────────────────────────────────────────────────

    /// Apply a bulk light payload. Per section: an index set in
    /// `present_mask` is rewritten from the next payload array, one set in
    /// `empty_mask` is zeroed, one in neither is left untouched. The mask
    /// space covers `height / 16 + 2` slots -- one padding slot below and
    /// above the world, carried by the protocol but not stored.
    ///
    /// If the chunk is not loaded yet the whole update is queued and
    /// replayed when it loads.
    #[allow(clippy::too_many_arguments)]
    pub fn update_chunk_light(
        &self,
        x: i32,
        z: i32,
        dimension: &str,
        present_mask: &[u64],
        empty_mask: &[u64],
        payload: &[Vec<u8>],
        is_sky: bool,
    ) {
        let mut state = self.state.write();
        self.update_chunk_light_impl(
            &mut state,
            x,
            z,
            dimension,
            present_mask,
            empty_mask,
            payload,
            is_sky,
            true,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn update_chunk_light_impl(
        &self,
        state: &mut WorldState,
        x: i32,
        z: i32,
        dimension: &str,
        present_mask: &[u64],
        empty_mask: &[u64],
        payload: &[Vec<u8>],
        is_sky: bool,
        queue_if_absent: bool,
    ) {
        let pos = ChunkPos::new(x, z);
        let Some(chunk) = state.terrain.get_mut(&pos) else {
            if queue_if_absent {
                warn!(x, z, is_sky, "light update for an unloaded chunk queued");
                state
                    .pending_light
                    .entry(pos)
                    .or_default()
                    .push(PendingLightUpdate {
                        dimension: dimension.to_owned(),
                        present_mask: present_mask.to_vec(),
                        empty_mask: empty_mask.to_vec(),
                        payload: payload.to_vec(),
                        is_sky,
                    });
            }
            return;
        };

        let min_y = chunk.min_y();
        let mask_slots = chunk.height() / SECTION_HEIGHT + 2;
        let mut payload_index = 0;

        for slot in 0..mask_slots {
            let interior = slot > 0 && slot < mask_slots - 1;
            if mask_bit(present_mask, slot as usize) {
                if interior {
                    let Some(data) = payload.get(payload_index) else {
                        warn!(x, z, "light payload shorter than its section mask");
                        return;
                    };
                    if data.len() < 2048 {
                        warn!(x, z, len = data.len(), "light section array too short");
                        return;
                    }
                    let base_y = (slot - 1) * SECTION_HEIGHT + min_y;
                    fill_section_light(chunk, base_y, is_sky, |index| {
                        nibble(data, index)
                    });
                }
                payload_index += 1;
            } else if mask_bit(empty_mask, slot as usize) && interior {
                let base_y = (slot - 1) * SECTION_HEIGHT + min_y;
                fill_section_light(chunk, base_y, is_sky, |_| 0);
            }
        }
    }

    // ── Render collaborator ─────────────────────────────────────────────

    /// Whether the chunk changed since the renderer last snapshotted it.
    /// Unloaded chunks report true so the renderer drops stale meshes.
    pub fn has_chunk_been_modified(&self, x: i32, z: i32) -> bool {
        let state = self.state.read();
        state
            .terrain
            .get(&ChunkPos::new(x, z))
            .is_none_or(|chunk| chunk.modified_since_render())
    }

    /// Clear the dirty flag and hand the renderer its own copy.
    pub fn reset_chunk_modification_state(&self, x: i32, z: i32) -> Option<Chunk> {
        let mut state = self.state.write();
        let chunk = state.terrain.get_mut(&ChunkPos::new(x, z))?;
        chunk.set_modified_since_render(false);
        Some(chunk.clone())
    }

    /// Read-locked view of the whole chunk map. The lock is held until the
    /// guard drops; keep it short-lived.
    pub fn chunks(&self) -> MappedRwLockReadGuard<'_, HashMap<ChunkPos, Chunk>> {
        RwLockReadGuard::map(self.state.read(), |state| &state.terrain)
    }

    // ── Shared internals ────────────────────────────────────────────────

    /// Blockstate properties at a world position. `None` when the chunk is
    /// unloaded or the id is unknown to the registry.
    fn blockstate_at(&self, state: &WorldState, pos: Position) -> Option<&Blockstate> {
        let id = state.block_at(pos, self.air)?;
        self.registry.blockstate(id)
    }
}

fn mask_bit(mask: &[u64], index: usize) -> bool {
    mask.get(index / 64)
        .is_some_and(|word| (word >> (index % 64)) & 1 == 1)
}

#[inline]
fn nibble(data: &[u8], index: usize) -> u8 {
    let byte = data[index / 2];
    if index % 2 == 0 { byte & 0x0F } else { byte >> 4 }
}

/// Write one section's worth of light values through the chunk API.
fn fill_section_light(chunk: &mut Chunk, base_y: i32, is_sky: bool, value: impl Fn(usize) -> u8) {
    for y in 0..SECTION_HEIGHT {
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                let index = ((y * CHUNK_WIDTH + z) * CHUNK_WIDTH + x) as usize;
                let pos = Position::new(x, base_y + y, z);
                if is_sky {
                    chunk.set_sky_light(pos, value(index));
                } else {
                    chunk.set_block_light(pos, value(index));
                }
            }
        }
    }
}
