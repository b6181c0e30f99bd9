//! The system contract.
//!
//! A system is a unit of behavior driven by the engine's update loop.
//! Systems run sequentially in ascending priority order; within one
//! priority, insertion order is preserved. At most one system of each
//! concrete type can be registered.

use std::any::Any;

use tessera_component::SystemTypeId;

use crate::engine::Engine;

/// Behavior invoked by [`Engine::update`](crate::Engine::update).
///
/// Implementations carry their own priority and processing state:
///
/// ```rust
/// use tessera_engine::{Engine, System};
///
/// struct Gravity {
///     strength: f32,
/// }
///
/// impl System for Gravity {
///     fn update(&mut self, _engine: &mut Engine, delta: f32) {
///         let _ = self.strength * delta;
///     }
/// }
/// ```
pub trait System: Any + Send {
    /// Execution order key; lower priorities run first. Sampled when the
    /// system is added.
    fn priority(&self) -> i32 {
        0
    }

    /// Gates [`System::update`]; a system returning `false` is skipped for
    /// that tick but stays registered.
    fn check_processing(&self) -> bool {
        true
    }

    /// Called when the system is registered with an engine.
    fn added_to_engine(&mut self, engine: &mut Engine) {
        let _ = engine;
    }

    /// Called when the system is removed from its engine.
    fn removed_from_engine(&mut self, engine: &mut Engine) {
        let _ = engine;
    }

    /// One tick of work. Structural mutations performed through `engine`
    /// are deferred until this system's update returns.
    fn update(&mut self, engine: &mut Engine, delta: f32);
}

/// A registered system together with its identity, as stored by the engine.
pub(crate) struct SystemEntry {
    pub(crate) ty: SystemTypeId,
    pub(crate) name: &'static str,
    pub(crate) system: Box<dyn System>,
}

impl std::fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEntry")
            .field("name", &self.name)
            .field("priority", &self.system.priority())
            .finish()
    }
}
