use std::time::Instant;

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

use ember_engine::{
    FrameParams, FrameScratch, ParticleAttr, ParticleStore, RateMode, SpawnBatch, SpawnConfig,
    SpawnHost, SpawnMode, SpawnParam, SpawnScheduler,
};

const FRAME_COUNT: usize = 10_000;
const INSTANCE_COUNT: usize = 64;
const DELTA_TIME: f32 = 1.0 / 60.0;
const MAX_AGE_FRAMES: f32 = 120.0;
const CHURN_CHANCE: f64 = 0.002;

struct BenchHost;

impl SpawnHost for BenchHost {}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Spawn Pipeline Benchmark ===\n");
    println!("Test parameters:");
    println!("  Frames: {}", FRAME_COUNT);
    println!("  Instances: {}", INSTANCE_COUNT);
    println!("  Delta time: {:.4}s\n", DELTA_TIME);

    let config = SpawnConfig::new(
        SpawnMode::Rate(RateMode::ParticlesPerSecond),
        SpawnParam::fixed(37.5),
    );
    let mut scheduler = SpawnScheduler::new(config)?;
    let mut scratch = FrameScratch::new();
    let host = BenchHost;
    scheduler.add_instances(INSTANCE_COUNT, &host, &mut scratch);

    let mut store = ParticleStore::new();
    store.add_attribute(ParticleAttr::ParentId);
    store.add_attribute(ParticleAttr::SpawnSerial);
    store.add_attribute(ParticleAttr::State);
    store.add_attribute(ParticleAttr::NormalAge);
    store.add_attribute(ParticleAttr::SpawnFraction);

    let frame = FrameParams {
        delta_time: DELTA_TIME,
        ..FrameParams::default()
    };

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut batches: Vec<SpawnBatch> = Vec::new();
    let mut to_remove: Vec<u32> = Vec::new();
    let mut swap_map: Vec<u32> = Vec::new();

    let mut total_spawned: u64 = 0;
    let mut total_removed: u64 = 0;
    let mut peak_live: u32 = 0;

    let start = Instant::now();
    for _ in 0..FRAME_COUNT {
        // Spawn phase
        batches.clear();
        scheduler.compute_frame_batches(&frame, &host, &mut scratch, &mut batches);
        store.reserve_spawn_region(&batches);
        total_spawned += u64::from(store.num_spawned());
        store.commit_spawn_region();

        // Age the live range one frame
        let live = store.live_count() as usize;
        for age in &mut store.data_mut::<f32>(ParticleAttr::NormalAge)[..live] {
            *age += 1.0;
        }

        // Expire old particles plus a little random churn
        to_remove.clear();
        {
            let ages = store.data::<f32>(ParticleAttr::NormalAge);
            for id in 0..live {
                if ages[id] > MAX_AGE_FRAMES || rng.gen_bool(CHURN_CHANCE) {
                    to_remove.push(id as u32);
                }
            }
        }
        total_removed += to_remove.len() as u64;
        store.remove(&to_remove, Some(&mut swap_map));

        store.clear_state_flag(ember_engine::constants::state_flags::NEW_BORN);
        peak_live = peak_live.max(store.live_count());
    }
    let elapsed = start.elapsed();

    println!("Results:");
    println!("  Total spawned: {}", total_spawned);
    println!("  Total removed: {}", total_removed);
    println!("  Live at end: {}", store.live_count());
    println!("  Peak live: {}", peak_live);
    println!("  Store capacity: {}", store.capacity());
    println!(
        "  Frame time: {:.3}us avg",
        elapsed.as_secs_f64() * 1e6 / FRAME_COUNT as f64
    );
    println!(
        "  Throughput: {:.1}M particle-frames/s",
        peak_live as f64 * FRAME_COUNT as f64 / elapsed.as_secs_f64() / 1e6
    );

    Ok(())
}
