//! # tessera_engine
//!
//! The tessera ECS runtime. The [`Engine`] owns entities, components,
//! family lists, pools, and systems, and drives everything through a
//! single-threaded cooperative update loop:
//!
//! - [`Engine`] — entity/component store, family index, update loop.
//! - [`Entity`] / [`EntityId`] — component containers and their handles.
//! - [`System`] — the behavior contract, plus the [`IteratingSystem`] and
//!   [`IntervalIteratingSystem`] building blocks.
//! - [`EntitySignal`] / [`ComponentSignal`] — synchronous state-transition
//!   callbacks.
//!
//! Structural mutations made while an update or a signal dispatch is in
//! progress are deferred and applied at well-defined drain points, so
//! systems can freely add and remove entities and components from inside
//! iteration.
//!
//! ```rust
//! use tessera_engine::{Component, Engine, EntityId, Family, IteratingSystem};
//!
//! #[derive(Debug, Default)]
//! struct Position { x: f32 }
//! impl Component for Position {
//!     fn type_name() -> &'static str { "Position" }
//! }
//!
//! let mut engine = Engine::new();
//! engine.add_system(IteratingSystem::new(
//!     Family::new().all::<Position>(),
//!     |engine: &mut Engine, entity: EntityId, delta: f32| {
//!         engine.get_component_mut::<Position>(entity).unwrap().x += delta;
//!     },
//! )).unwrap();
//!
//! let mut entity = engine.create_entity();
//! entity.emplace(Position::default()).unwrap();
//! let id = engine.add_entity(entity);
//!
//! engine.update(0.16).unwrap();
//! assert!(engine.get_component::<Position>(id).unwrap().x > 0.0);
//! ```

pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod families;
mod ops;
pub mod signal;
pub mod system;
pub mod systems;

pub use config::EngineConfig;
pub use engine::Engine;
pub use entity::{Entity, EntityId};
pub use error::EngineError;
pub use families::FamilyId;
pub use signal::{ComponentSignal, EntitySignal, ListenerId};
pub use system::System;
pub use systems::{EntityProcessor, IntervalIteratingSystem, IteratingSystem};

pub use tessera_component::{
    AllocError, Allocator, Bits, Component, ComponentHandle, ComponentTypeId, CountingAllocator,
    ErasedComponent, Family, GlobalAllocator,
};
