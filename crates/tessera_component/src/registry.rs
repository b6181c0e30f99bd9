//! Dense runtime type identities.
//!
//! The ECS addresses component and system types by small dense integers so
//! that type-indexed lookups reduce to array indexing. Ids are assigned the
//! first time a concrete type is observed and are stable for the lifetime of
//! the process.
//!
//! Two independent id spaces exist: one for component types and one for
//! system types. Both are backed by the same [`DenseTypeRegistry`] mechanism,
//! keyed by [`std::any::TypeId`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;
use tracing::debug;

use crate::component::Component;

/// Registry assigning dense `u32` ids to Rust types on first use.
#[derive(Debug, Default)]
pub struct DenseTypeRegistry {
    ids: HashMap<TypeId, u32>,
    names: Vec<&'static str>,
}

impl DenseTypeRegistry {
    /// Returns the id for `token`, assigning the next dense id if the type
    /// has not been seen before.
    pub fn get_or_assign(&mut self, token: TypeId, name: &'static str) -> u32 {
        if let Some(&id) = self.ids.get(&token) {
            return id;
        }
        let id = self.names.len() as u32;
        self.ids.insert(token, id);
        self.names.push(name);
        debug!(name, id, "registered runtime type");
        id
    }

    /// Returns the id for `token` if it has been assigned.
    #[must_use]
    pub fn lookup(&self, token: TypeId) -> Option<u32> {
        self.ids.get(&token).copied()
    }

    /// Returns the recorded name for an assigned id.
    #[must_use]
    pub fn name(&self, id: u32) -> Option<&'static str> {
        self.names.get(id as usize).copied()
    }

    /// Number of types assigned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no type has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

static COMPONENT_TYPES: LazyLock<RwLock<DenseTypeRegistry>> =
    LazyLock::new(|| RwLock::new(DenseTypeRegistry::default()));

static SYSTEM_TYPES: LazyLock<RwLock<DenseTypeRegistry>> =
    LazyLock::new(|| RwLock::new(DenseTypeRegistry::default()));

fn get_or_assign(registry: &RwLock<DenseTypeRegistry>, token: TypeId, name: &'static str) -> u32 {
    if let Some(id) = registry.read().lookup(token) {
        return id;
    }
    registry.write().get_or_assign(token, name)
}

/// A dense identifier for a component type.
///
/// Assigned on first observation of the concrete type and used as an index
/// into per-entity component slots and per-type component pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Returns the dense id for the component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self(get_or_assign(
            &COMPONENT_TYPES,
            TypeId::of::<T>(),
            T::type_name(),
        ))
    }

    /// The id as an array index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The recorded [`Component::type_name`] for this id.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        COMPONENT_TYPES.read().name(self.0)
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}#{}", self.0),
            None => write!(f, "#{}", self.0),
        }
    }
}

/// A dense identifier for a concrete system type.
///
/// Used by the engine's at-most-one-per-type system map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemTypeId(u32);

impl SystemTypeId {
    /// Returns the dense id for the system type identified by `token`.
    ///
    /// The caller provides the type token and display name because the
    /// system trait lives in the engine crate; see
    /// `tessera_engine::system`.
    #[must_use]
    pub fn of_token(token: TypeId, name: &'static str) -> Self {
        Self(get_or_assign(&SYSTEM_TYPES, token, name))
    }

    /// The id as an array index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Position {
        _x: f32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Default)]
    struct Velocity {
        _x: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        let a = ComponentTypeId::of::<Position>();
        let b = ComponentTypeId::of::<Position>();
        assert_eq!(a, b);
    }

    #[test]
    fn test_component_type_ids_differ_between_types() {
        assert_ne!(
            ComponentTypeId::of::<Position>(),
            ComponentTypeId::of::<Velocity>()
        );
    }

    #[test]
    fn test_component_type_name_recorded() {
        let id = ComponentTypeId::of::<Position>();
        assert_eq!(id.name(), Some("Position"));
    }

    #[test]
    fn test_dense_registry_assigns_sequential_ids() {
        let mut registry = DenseTypeRegistry::default();
        let a = registry.get_or_assign(TypeId::of::<u8>(), "u8");
        let b = registry.get_or_assign(TypeId::of::<u16>(), "u16");
        let c = registry.get_or_assign(TypeId::of::<u8>(), "u8");
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name(1), Some("u16"));
    }

    #[test]
    fn test_system_token_ids_are_stable() {
        struct Movement;
        let a = SystemTypeId::of_token(TypeId::of::<Movement>(), "Movement");
        let b = SystemTypeId::of_token(TypeId::of::<Movement>(), "Movement");
        assert_eq!(a, b);
    }
}
