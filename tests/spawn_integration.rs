// Ember Engine Spawn Pipeline Integration Tests
//
// End-to-end tests driving the spawn scheduler and particle store together
// the way a component runtime does each frame: compute batches, reserve the
// spawn region, commit, then age and remove particles.

use ember_engine::constants::particles::INVALID_ID;
use ember_engine::{
    FrameParams, FrameScratch, ParticleAttr, ParticleStore, RateMode, SpawnBatch, SpawnConfig,
    SpawnHost, SpawnMode, SpawnParam, SpawnScheduler,
};

struct Host;

impl SpawnHost for Host {}

fn run_spawn_frame(
    scheduler: &mut SpawnScheduler,
    store: &mut ParticleStore,
    scratch: &mut FrameScratch,
    dt: f32,
) -> (u32, bool) {
    let frame = FrameParams {
        delta_time: dt,
        ..FrameParams::default()
    };
    let mut batches: Vec<SpawnBatch> = Vec::new();
    let alive = scheduler.compute_frame_batches(&frame, &Host, scratch, &mut batches);
    store.reserve_spawn_region(&batches);
    let spawned = store.num_spawned();
    store.commit_spawn_region();
    (spawned, alive)
}

#[test]
fn test_count_mode_pipeline_spawns_target_over_duration() {
    println!("Testing count mode pipeline...");

    let mut config = SpawnConfig::new(SpawnMode::Count, SpawnParam::fixed(10.0));
    config.duration = SpawnParam::fixed(2.0);
    let mut scheduler = SpawnScheduler::new(config).expect("valid config");
    let mut scratch = FrameScratch::new();
    scheduler.add_instances(1, &Host, &mut scratch);

    let mut store = ParticleStore::new();
    store.add_attribute(ParticleAttr::NormalAge);
    store.add_attribute(ParticleAttr::SpawnFraction);

    let (spawned, alive) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 1.0);
    assert_eq!(spawned, 5);
    assert!(alive);
    assert_eq!(store.live_count(), 5);

    // Life fractions record where in the episode each newborn was born
    let fractions = store.data::<f32>(ParticleAttr::SpawnFraction);
    assert_eq!(fractions[0], 0.0);
    assert!(fractions[4] < 0.5);

    let (spawned, alive) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 1.0);
    assert_eq!(spawned, 5);
    assert!(alive);
    assert_eq!(store.live_count(), 10);

    let (spawned, _) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 1.0);
    assert_eq!(spawned, 0);

    let (spawned, alive) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 1.0);
    assert_eq!(spawned, 0);
    assert!(!alive, "instance expires once its timer passes the duration");

    println!("✅ Count mode pipeline test passed");
}

#[test]
fn test_rate_mode_pipeline_staggers_newborn_ages() {
    println!("Testing rate mode pipeline...");

    let config = SpawnConfig::new(
        SpawnMode::Rate(RateMode::ParticlesPerSecond),
        SpawnParam::fixed(4.0),
    );
    let mut scheduler = SpawnScheduler::new(config).expect("valid config");
    let mut scratch = FrameScratch::new();
    scheduler.add_instances(1, &Host, &mut scratch);

    let mut store = ParticleStore::new();
    store.add_attribute(ParticleAttr::NormalAge);
    store.add_attribute(ParticleAttr::SpawnSerial);

    for frame_index in 1..=4 {
        let (spawned, _) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 0.5);
        assert_eq!(spawned, 2, "4/s at 0.5s steps is exactly 2 per frame");
        assert_eq!(store.live_count(), frame_index * 2);
    }

    // Newborns are staggered across the frame, not clumped at one age
    let live = store.live_count() as usize;
    let ages = &store.data::<f32>(ParticleAttr::NormalAge)[..live];
    let newest = &ages[live - 2..];
    assert!(newest[0] < newest[1]);
    assert!(newest.iter().all(|&age| (-1.0..=0.0).contains(&age)));

    // Spawn serials are globally unique and ordered
    let serials = &store.data::<u32>(ParticleAttr::SpawnSerial)[..live];
    let mut sorted = serials.to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..live as u32).collect::<Vec<_>>());

    println!("✅ Rate mode pipeline test passed");
}

#[test]
fn test_removal_swap_map_remaps_parent_references() {
    println!("Testing removal swap-map remapping...");

    // Parent store: 6 particles tagged by age
    let mut parents = ParticleStore::new();
    parents.add_attribute(ParticleAttr::NormalAge);
    parents.reserve_spawn_region(&[SpawnBatch {
        count: 6,
        age_begin: 0.0,
        age_increment: 1.0,
        ..SpawnBatch::default()
    }]);
    parents.commit_spawn_region();

    // Child store: each child points at parent (i % 6)
    let mut children = ParticleStore::new();
    children.add_attribute(ParticleAttr::ParentId);
    let child_batches: Vec<SpawnBatch> = (0..12)
        .map(|i| SpawnBatch {
            count: 1,
            parent_id: i % 6,
            ..SpawnBatch::default()
        })
        .collect();
    children.reserve_spawn_region(&child_batches);
    children.commit_spawn_region();

    // Remember which parent age each child follows
    let parent_ages = parents.data::<f32>(ParticleAttr::NormalAge)[..6].to_vec();
    let expected: Vec<f32> = (0..12).map(|i| parent_ages[i % 6]).collect();

    let mut swap_map = Vec::new();
    parents.remove(&[1, 4], Some(&mut swap_map));
    assert_eq!(parents.live_count(), 4);

    // Orchestration-side fixup: rewrite child parent ids through the map
    let child_count = children.live_count() as usize;
    let parent_ids = &mut children.data_mut::<u32>(ParticleAttr::ParentId)[..child_count];
    for parent_id in parent_ids.iter_mut() {
        *parent_id = swap_map[*parent_id as usize];
    }

    let parent_ids = &children.data::<u32>(ParticleAttr::ParentId)[..child_count];
    let parent_ages = parents.data::<f32>(ParticleAttr::NormalAge);
    for (child, (&parent_id, &expected_age)) in
        parent_ids.iter().zip(&expected).enumerate()
    {
        if expected_age == 1.0 || expected_age == 4.0 {
            assert_eq!(parent_id, INVALID_ID, "child {} lost its parent", child);
        } else {
            assert_eq!(
                parent_ages[parent_id as usize], expected_age,
                "child {} must still follow the same parent",
                child
            );
        }
    }

    println!("✅ Swap-map remapping test passed");
}

#[test]
fn test_restarting_emitter_reaches_steady_state() {
    println!("Testing restarting emitter...");

    let mut config = SpawnConfig::new(SpawnMode::Count, SpawnParam::fixed(3.0));
    config.duration = SpawnParam::fixed(1.0);
    config.restart = SpawnParam::fixed(2.0);
    let mut scheduler = SpawnScheduler::new(config).expect("valid config");
    let mut scratch = FrameScratch::new();
    scheduler.add_instances(1, &Host, &mut scratch);

    let mut store = ParticleStore::new();
    store.add_attribute(ParticleAttr::NormalAge);

    // Episode spawns 3 over 1s, then idles until the 2s restart
    let mut per_frame = Vec::new();
    for _ in 0..8 {
        let (spawned, alive) = run_spawn_frame(&mut scheduler, &mut store, &mut scratch, 0.5);
        assert!(alive, "restart keeps the runtime alive between episodes");
        per_frame.push(spawned);
    }

    // Episodes start at 0s, 2s and 4s; the first two complete their 3
    // particles, the third only gets its opening frame in
    assert_eq!(per_frame, vec![2, 1, 0, 2, 1, 0, 0, 2]);
    assert_eq!(store.live_count(), 8);

    println!("✅ Restarting emitter test passed");
}
