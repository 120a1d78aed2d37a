#![allow(dead_code, unused_imports)]

use stage_scheduler::prelude::*;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32);

#[derive(Debug, Clone, Copy)]
struct Sprite(u32);

const ENTITIES: usize = 100_000;
const FRAMES: usize = 300;

struct MovementSystem {
    query: ParallelQueryExecutor,
}

impl System<World> for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn access(&self) -> SystemAccess {
        SystemAccess::new().read::<Velocity>().write::<Position>()
    }

    fn update(&mut self, world: &World, dt: f32) -> Result<()> {
        let mut positions = world.write::<Position>()?;
        let velocities = world.read::<Velocity>()?;
        self.query
            .for_each_zip_mut(&mut positions, &velocities, |p, v| {
                p.0 += v.0 * dt;
                p.1 += v.1 * dt;
            })
    }
}

struct DragSystem;

impl System<World> for DragSystem {
    fn name(&self) -> &str {
        "drag"
    }

    fn priority(&self) -> i32 {
        150
    }

    fn access(&self) -> SystemAccess {
        SystemAccess::new().write::<Velocity>()
    }

    fn update(&mut self, world: &World, _dt: f32) -> Result<()> {
        for v in world.write::<Velocity>()?.iter_mut() {
            v.0 *= 0.999;
            v.1 *= 0.999;
        }
        Ok(())
    }
}

struct AnimationSystem {
    query: ParallelQueryExecutor,
}

impl System<World> for AnimationSystem {
    fn name(&self) -> &str {
        "animation"
    }

    fn priority(&self) -> i32 {
        200
    }

    fn access(&self) -> SystemAccess {
        SystemAccess::new().write::<Sprite>()
    }

    fn update(&mut self, world: &World, _dt: f32) -> Result<()> {
        let mut sprites = world.write::<Sprite>()?;
        self.query.for_each_mut(&mut sprites, |s| s.0 = (s.0 + 1) % 8);
        Ok(())
    }
}

fn build_world() -> Result<World> {
    let mut world = World::new();
    world.insert_column((0..ENTITIES).map(|i| Position(i as f32, 0.0)).collect())?;
    world.insert_column(vec![Velocity(1.0, 0.5); ENTITIES])?;
    world.insert_column(vec![Sprite(0); ENTITIES])?;
    Ok(world)
}

#[cfg(feature = "profiling")]
fn main() -> Result<()> {
    let _guard = stage_scheduler::profiling::init_file_tracing("trace.json")?;

    let config = SchedulerConfig::default();
    let world = build_world()?;
    let mut scheduler = ParallelScheduler::new(config.clone())?
        .with_system(Box::new(MovementSystem {
            query: ParallelQueryExecutor::new(config.query),
        }))?
        .with_system(Box::new(DragSystem))?
        .with_system(Box::new(AnimationSystem {
            query: ParallelQueryExecutor::new(config.query),
        }))?;

    let schedule = scheduler.describe();
    println!("Schedule: {}", schedule.to_json()?);
    schedule.export_json("schedule.json")?;
    println!("Schedule written to schedule.json");
    scheduler.initialize(&world)?;

    let start = Instant::now();
    {
        let _span = tracing::info_span!("frames", count = FRAMES).entered();
        for _ in 0..FRAMES {
            let report = scheduler.update(&world, 1.0 / 60.0)?;
            if !report.is_clean() {
                tracing::warn!(failed = ?report.failed_systems(), "frame had failures");
            }
        }
    }
    println!(
        "{FRAMES} frames over {ENTITIES} entities in {:?}",
        start.elapsed()
    );

    scheduler.tracker().log_performance_stats();
    for row in scheduler.tracker().performance_report() {
        println!(
            "  {:<12} avg {:>8.3}ms  max {:>8.3}ms",
            row.system,
            row.metrics.average_ms(),
            row.metrics.max_update_ms
        );
    }
    Ok(())
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("stage_profile binary requires --features profiling");
}
