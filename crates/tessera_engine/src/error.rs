//! Engine-level error types.

use crate::entity::EntityId;
use tessera_component::AllocError;

/// Errors surfaced by the engine's public API.
///
/// Lookup misses ([`Engine::get_entity`](crate::Engine::get_entity),
/// [`Engine::get_system`](crate::Engine::get_system), component getters) are
/// not errors — they return `None`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A system of the same concrete type is already registered.
    #[error("a system of kind `{0}` is already registered")]
    SystemKindAlreadyRegistered(&'static str),

    /// The system being removed is not registered.
    #[error("no system of kind `{0}` is registered")]
    SystemNotRegistered(&'static str),

    /// The addressed entity is not registered with this engine.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// `update` was called from within a running update.
    #[error("update() called while the engine is already updating")]
    ReentrantUpdate,

    /// The allocator could not provide component storage.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}
