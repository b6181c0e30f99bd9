//! # orbit — a small tessera demo
//!
//! Spawns a ring of bodies orbiting the origin. Three systems drive the
//! simulation:
//!
//! 1. Movement — integrates positions from velocities every tick.
//! 2. Expiry — counts lifetimes down and removes dead bodies mid-iteration
//!    (exercising the deferred-operation path).
//! 3. Telemetry — an interval system reporting population once per
//!    simulated second.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tessera_engine::{
    Component, Engine, EntityId, Family, IntervalIteratingSystem, IteratingSystem,
};

#[derive(Debug, Default)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }

    fn reset(&mut self) {
        *self = Position::default();
    }
}

#[derive(Debug, Default)]
struct Velocity {
    dx: f32,
    dy: f32,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }

    fn reset(&mut self) {
        *self = Velocity::default();
    }
}

#[derive(Debug, Default)]
struct Lifetime {
    remaining: f32,
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }

    fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

const BODIES: u32 = 64;
const DELTA: f32 = 1.0 / 60.0;
const SIMULATED_SECONDS: u32 = 10;

fn spawn_ring(engine: &mut Engine) -> Result<()> {
    for i in 0..BODIES {
        let angle = i as f32 / BODIES as f32 * std::f32::consts::TAU;
        let mut body = engine.create_entity();
        body.emplace(Position {
            x: angle.cos() * 10.0,
            y: angle.sin() * 10.0,
        })?;
        body.emplace(Velocity {
            dx: -angle.sin(),
            dy: angle.cos(),
        })?;
        // Half the ring is short-lived.
        body.emplace(Lifetime {
            remaining: if i % 2 == 0 { 3.0 } else { f32::INFINITY },
        })?;
        engine.add_entity(body);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("orbit=info".parse()?))
        .init();

    let mut engine = Engine::new();

    engine
        .add_system(IteratingSystem::new(
            Family::new().all::<Position>().all::<Velocity>(),
            |engine: &mut Engine, entity: EntityId, delta: f32| {
                let (dx, dy) = {
                    let velocity = engine.get_component::<Velocity>(entity).unwrap();
                    (velocity.dx, velocity.dy)
                };
                let position = engine.get_component_mut::<Position>(entity).unwrap();
                position.x += dx * delta;
                position.y += dy * delta;
            },
        ))?;

    engine
        .add_system(
            IteratingSystem::new(
                Family::new().all::<Lifetime>(),
                |engine: &mut Engine, entity: EntityId, delta: f32| {
                    let lifetime = engine.get_component_mut::<Lifetime>(entity).unwrap();
                    lifetime.remaining -= delta;
                    if lifetime.remaining <= 0.0 {
                        let _ = engine.remove_entity(entity);
                    }
                },
            )
            .with_priority(10),
        )?;

    engine
        .add_system(
            IntervalIteratingSystem::new(
                Family::new().all::<Position>(),
                1.0,
                |engine: &mut Engine, entity: EntityId, _delta: f32| {
                    let position = engine.get_component::<Position>(entity).unwrap();
                    tracing::debug!(
                        entity = %entity,
                        x = position.x,
                        y = position.y,
                        "body position"
                    );
                },
            )
            .with_priority(100),
        )?;

    spawn_ring(&mut engine)?;
    info!(bodies = engine.entity_count(), "simulation start");

    for frame in 0..(SIMULATED_SECONDS * 60) {
        engine.update(DELTA)?;
        if frame % 60 == 59 {
            info!(
                second = (frame + 1) / 60,
                alive = engine.entity_count(),
                pooled = engine.pooled_entities(),
                "tick"
            );
        }
    }

    info!(alive = engine.entity_count(), "simulation end");
    Ok(())
}
