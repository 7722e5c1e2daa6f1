//! Store-level tests: chunk residency and loader refcounts, coordinate
//! wrapping, voxel/biome/light/block-entity round-trips, the dimension
//! register, and the render dirty-flag lifecycle.

use std::sync::Arc;

use fastnbt::Value;
use forage_core::{BiomeId, Blockstate, BlockstateId, ChunkPos, Position, TableRegistry};
use forage_world::world::DimensionInfo;
use forage_world::{LoaderId, World};

const OVERWORLD: &str = "minecraft:overworld";
const NETHER: &str = "minecraft:the_nether";

struct Fixture {
    world: World,
    stone: BlockstateId,
}

fn fixture() -> Fixture {
    let mut registry = TableRegistry::new();
    let stone = registry.register(Blockstate::cube("minecraft:stone"));
    Fixture {
        world: World::new(Arc::new(registry)),
        stone,
    }
}

// ---------------------------------------------------------------------------
// Residency and refcounts
// ---------------------------------------------------------------------------

#[test]
fn block_round_trip_in_loaded_chunk() {
    let f = fixture();
    let loader = LoaderId::new();
    f.world.load_chunk(0, 0, OVERWORLD, loader);

    for pos in [
        Position::new(3, 64, 5),
        Position::new(0, -64, 0),
        Position::new(15, 319, 15),
    ] {
        f.world.set_block(pos, f.stone);
        assert_eq!(f.world.get_block(pos), f.stone, "round trip at {pos:?}");
    }
}

#[test]
fn unloaded_chunk_reads_as_air() {
    let f = fixture();
    let pos = Position::new(100, 64, 100);
    assert_eq!(f.world.get_block(pos), BlockstateId::AIR);
    assert!(!f.world.is_loaded(pos));

    let loader = LoaderId::new();
    f.world.load_chunk(6, 6, OVERWORLD, loader);
    assert!(f.world.is_loaded(pos));
    // Loaded but never written: still air, but now "known" air.
    assert_eq!(f.world.get_block(pos), BlockstateId::AIR);
}

#[test]
fn chunk_survives_until_last_loader_leaves() {
    let f = fixture();
    let a = LoaderId::new();
    let b = LoaderId::new();
    let pos = Position::new(1, 64, 1);

    f.world.load_chunk(0, 0, OVERWORLD, a);
    f.world.load_chunk(0, 0, OVERWORLD, b);
    f.world.unload_chunk(0, 0, a);
    assert!(f.world.is_loaded(pos));
    f.world.unload_chunk(0, 0, b);
    assert!(!f.world.is_loaded(pos));
}

#[test]
fn duplicate_attach_of_same_loader_counts_once() {
    let f = fixture();
    let a = LoaderId::new();
    f.world.load_chunk(0, 0, OVERWORLD, a);
    f.world.load_chunk(0, 0, OVERWORLD, a);
    f.world.unload_chunk(0, 0, a);
    assert!(!f.world.is_loaded(Position::new(0, 64, 0)));
}

#[test]
fn unload_all_only_drops_chunks_held_alone() {
    let f = fixture();
    let a = LoaderId::new();
    let b = LoaderId::new();
    f.world.load_chunk(0, 0, OVERWORLD, a);
    f.world.load_chunk(1, 0, OVERWORLD, a);
    f.world.load_chunk(0, 0, OVERWORLD, b);

    f.world.unload_all_chunks(a);
    assert!(f.world.is_loaded(Position::new(0, 64, 0)));
    assert!(!f.world.is_loaded(Position::new(16, 64, 0)));
    assert_eq!(f.world.loaded_chunk_count(), 1);
}

#[test]
fn negative_coordinates_wrap_into_the_right_chunk() {
    let f = fixture();
    let loader = LoaderId::new();
    f.world.load_chunk(-1, -1, OVERWORLD, loader);

    let pos = Position::new(-1, 64, -1);
    f.world.set_block(pos, f.stone);
    assert_eq!(f.world.get_block(pos), f.stone);
    // The write landed in chunk (-1, -1), not (0, 0).
    assert!(f.world.chunks().contains_key(&ChunkPos::new(-1, -1)));
    assert!(!f.world.chunks().contains_key(&ChunkPos::new(0, 0)));
    // And at column-local (15, 15).
    assert_eq!(pos.local(), Position::new(15, 64, 15));
}

#[test]
fn write_to_unloaded_chunk_is_dropped_not_buffered() {
    let f = fixture();
    let pos = Position::new(500, 64, 500);
    f.world.set_block(pos, f.stone);
    assert_eq!(f.world.get_block(pos), BlockstateId::AIR);

    // Loading afterwards must not resurrect the dropped write.
    f.world
        .load_chunk(pos.chunk().x, pos.chunk().z, OVERWORLD, LoaderId::new());
    assert_eq!(f.world.get_block(pos), BlockstateId::AIR);
}

// ---------------------------------------------------------------------------
// Biomes, light, block entities
// ---------------------------------------------------------------------------

#[test]
fn biome_round_trip_at_voxel_resolution() {
    let f = fixture();
    assert_eq!(f.world.get_biome(Position::new(0, 64, 0)), None);

    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    let pos = Position::new(5, 70, 9);
    f.world.set_biome(pos, BiomeId(3));
    assert_eq!(f.world.get_biome(pos), Some(BiomeId(3)));
    // Biomes are stored per 4x4x4 cell; a voxel in the same cell agrees.
    assert_eq!(f.world.get_biome(Position::new(6, 69, 10)), Some(BiomeId(3)));
}

#[test]
fn light_round_trip_and_defaults() {
    let f = fixture();
    let pos = Position::new(2, 80, 2);
    assert_eq!(f.world.get_sky_light(pos), 0);
    assert_eq!(f.world.get_block_light(pos), 0);

    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    f.world.set_sky_light(pos, 13);
    f.world.set_block_light(pos, 7);
    assert_eq!(f.world.get_sky_light(pos), 13);
    assert_eq!(f.world.get_block_light(pos), 7);
    // Neighboring voxel in the same nibble byte is untouched.
    assert_eq!(f.world.get_sky_light(Position::new(3, 80, 2)), 0);
}

#[test]
fn sky_light_writes_are_ignored_in_skyless_dimensions() {
    let f = fixture();
    f.world.load_chunk(0, 0, NETHER, LoaderId::new());
    let pos = Position::new(1, 70, 1);
    f.world.set_sky_light(pos, 15);
    assert_eq!(f.world.get_sky_light(pos), 0);
    // Block light still works.
    f.world.set_block_light(pos, 9);
    assert_eq!(f.world.get_block_light(pos), 9);
}

#[test]
fn block_entity_set_get_remove() {
    let f = fixture();
    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    let pos = Position::new(4, 64, 4);
    assert_eq!(f.world.get_block_entity_data(pos), None);

    f.world
        .set_block_entity_data(pos, Some(Value::String("forage:chest".into())));
    assert_eq!(
        f.world.get_block_entity_data(pos),
        Some(Value::String("forage:chest".into()))
    );

    f.world.set_block_entity_data(pos, None);
    assert_eq!(f.world.get_block_entity_data(pos), None);
}

// ---------------------------------------------------------------------------
// Dimension register
// ---------------------------------------------------------------------------

#[test]
fn dimension_metadata_defaults_and_overrides() {
    let f = fixture();
    f.world.set_current_dimension(OVERWORLD);
    // Nothing described yet: modern-overworld defaults.
    assert_eq!(f.world.get_height(), 384);
    assert_eq!(f.world.get_min_y(), -64);
    assert!(!f.world.is_ultrawarm());

    f.world.set_dimension_info(
        NETHER,
        DimensionInfo {
            height: 256,
            min_y: 0,
            ultrawarm: true,
        },
    );
    f.world.set_current_dimension(NETHER);
    assert_eq!(f.world.get_height(), 256);
    assert_eq!(f.world.get_min_y(), 0);
    assert!(f.world.is_ultrawarm());
    assert_eq!(f.world.get_current_dimension(), NETHER);
}

#[test]
fn per_chunk_dimension_lookup() {
    let f = fixture();
    assert_eq!(f.world.get_dimension(0, 0), None);
    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    f.world.load_chunk(1, 0, OVERWORLD, LoaderId::new());
    assert_eq!(f.world.get_dimension(0, 0).as_deref(), Some(OVERWORLD));
}

#[test]
fn reload_under_other_dimension_rebuilds_in_place() {
    let f = fixture();
    let a = LoaderId::new();
    let b = LoaderId::new();
    let pos = Position::new(3, 64, 3);

    f.world.load_chunk(0, 0, OVERWORLD, a);
    f.world.set_block(pos, f.stone);
    assert_eq!(f.world.get_block(pos), f.stone);

    // Same coordinate arrives for another dimension while still loaded:
    // contents are rebuilt, old block data is gone.
    f.world.load_chunk(0, 0, NETHER, b);
    assert_eq!(f.world.get_block(pos), BlockstateId::AIR);
    assert_eq!(f.world.get_dimension(0, 0).as_deref(), Some(NETHER));
}

// ---------------------------------------------------------------------------
// Batched reads, snapshots, counters
// ---------------------------------------------------------------------------

#[test]
fn get_blocks_matches_single_reads() {
    let f = fixture();
    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    let a = Position::new(1, 64, 1);
    let b = Position::new(2, 64, 2);
    let unloaded = Position::new(400, 64, 400);
    f.world.set_block(a, f.stone);

    let blocks = f.world.get_blocks(&[a, b, unloaded]);
    assert_eq!(blocks, vec![f.stone, BlockstateId::AIR, BlockstateId::AIR]);
}

#[test]
fn chunk_map_snapshot_sees_all_loaded_chunks() {
    let f = fixture();
    let loader = LoaderId::new();
    for x in 0..3 {
        f.world.load_chunk(x, 0, OVERWORLD, loader);
    }
    let chunks = f.world.chunks();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.contains_key(&ChunkPos::new(2, 0)));
}

#[test]
fn render_dirty_flag_lifecycle() {
    let f = fixture();
    // Unloaded chunks always report modified so stale meshes get dropped.
    assert!(f.world.has_chunk_been_modified(0, 0));

    f.world.load_chunk(0, 0, OVERWORLD, LoaderId::new());
    assert!(f.world.has_chunk_been_modified(0, 0));

    let snapshot = f.world.reset_chunk_modification_state(0, 0);
    assert!(snapshot.is_some());
    assert!(!f.world.has_chunk_been_modified(0, 0));

    f.world.set_block(Position::new(0, 64, 0), f.stone);
    assert!(f.world.has_chunk_been_modified(0, 0));
}

#[test]
fn interaction_sequence_ids_are_monotonic() {
    let f = fixture();
    assert_eq!(f.world.next_interaction_sequence_id(), 1);
    assert_eq!(f.world.next_interaction_sequence_id(), 2);
    assert_eq!(f.world.next_interaction_sequence_id(), 3);
}

// ---------------------------------------------------------------------------
// Concurrency smoke test
// ---------------------------------------------------------------------------

#[test]
fn concurrent_writers_and_readers_settle() {
    let f = fixture();
    let loader = LoaderId::new();
    for x in 0..4 {
        f.world.load_chunk(x, 0, OVERWORLD, loader);
    }

    std::thread::scope(|scope| {
        for t in 0..4i32 {
            let world = &f.world;
            let stone = f.stone;
            scope.spawn(move || {
                for i in 0..500 {
                    world.set_block(Position::new(t * 16 + i % 16, 64 + i / 16, 0), stone);
                }
            });
        }
        let world = &f.world;
        scope.spawn(move || {
            for i in 0..500 {
                // Reads interleave with the writers; values are either air
                // or stone, never torn.
                let _ = world.get_block(Position::new(i % 64, 64, 0));
                let _ = world.is_free(
                    &forage_core::AABB::unit_cube(),
                    false,
                );
            }
        });
    });

    // Every written voxel is visible afterwards.
    for t in 0..4i32 {
        for i in 0..500 {
            assert_eq!(
                f.world
                    .get_block(Position::new(t * 16 + i % 16, 64 + i / 16, 0)),
                f.stone
            );
        }
    }
}
