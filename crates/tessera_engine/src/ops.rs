//! Deferred structural operations.
//!
//! While the engine is updating or dispatching signals, structural
//! mutations are recorded here instead of touching the stores, so live
//! iteration never observes a change mid-pass. The engine drains the
//! component queue before the entity queue at every drain point — component
//! changes can alter family membership that pending entity work then
//! observes — and repeats until both queues are empty, since applying
//! operations can enqueue more.
//!
//! Each queue is FIFO. Operations that no longer make sense when they are
//! applied (the target entity has since been removed) are dropped silently;
//! a dropped `Add` releases its component back to the type pool.

use tessera_component::{ComponentBox, ComponentTypeId};

use crate::entity::EntityId;

/// A deferred component mutation.
#[derive(Debug)]
pub(crate) enum ComponentOp {
    /// Attach `component` to `entity`, with replacement semantics.
    Add {
        entity: EntityId,
        component: ComponentBox,
    },
    /// Detach the component of type `ty` from `entity`.
    Remove {
        entity: EntityId,
        ty: ComponentTypeId,
    },
}

/// A deferred entity mutation.
///
/// An entity scheduled here already holds its id and is visible through
/// lookups; `Add` completes its registration (entity list, families,
/// `entity_added`), `Remove` tears it down.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EntityOp {
    Add(EntityId),
    Remove(EntityId),
    RemoveAll,
}
