//! Entity identifiers and the entity record.
//!
//! An [`EntityId`] is a lightweight `u64` handle; the [`Entity`] record it
//! addresses is owned by the [`Engine`](crate::Engine). Between
//! [`Engine::create_entity`](crate::Engine::create_entity) and
//! [`Engine::add_entity`](crate::Engine::add_entity) the caller owns the
//! `Entity` value and populates it directly; once added, the engine owns it
//! and all structural mutation goes through the engine so it can be deferred
//! while iteration is in progress.

use std::sync::Arc;

use tessera_component::{
    AllocError, Allocator, Bits, Component, ComponentBox, ComponentHandle, ComponentTypeId,
    ErasedComponent,
};

/// A unique entity identifier.
///
/// Entities are pure identities — components attached to them carry the
/// data. Ids are assigned by the engine when the entity is added, starting
/// at 1 and increasing monotonically. An id of 0 means "not registered with
/// an engine".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an entity id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (engine-assigned) id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A container of components.
///
/// Component slots are indexed by dense [`ComponentTypeId`]; the attach
/// order of the currently present components is kept so iteration is
/// deterministic. The component mask and family mask mirror the slot state
/// and the engine's family lists respectively.
pub struct Entity {
    /// A user-managed flag word. The engine never touches it.
    pub flags: u32,
    uuid: EntityId,
    scheduled_for_removal: bool,
    added: bool,
    slots: Vec<Option<ComponentBox>>,
    order: Vec<ComponentTypeId>,
    component_bits: Bits,
    family_bits: Bits,
    allocator: Arc<dyn Allocator>,
}

impl Entity {
    pub(crate) fn new(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            flags: 0,
            uuid: EntityId::INVALID,
            scheduled_for_removal: false,
            added: false,
            slots: Vec::new(),
            order: Vec::new(),
            component_bits: Bits::new(),
            family_bits: Bits::new(),
            allocator,
        }
    }

    /// The entity's unique id, [`EntityId::INVALID`] until it is added to an
    /// engine.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.uuid
    }

    /// Returns `true` if the entity has been added to an engine.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.uuid.is_valid()
    }

    /// Returns `true` if a deferred removal has been scheduled for this
    /// entity.
    #[must_use]
    pub fn is_scheduled_for_removal(&self) -> bool {
        self.scheduled_for_removal
    }

    /// Retrieve a component by type, or `None` if the entity does not carry
    /// one.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        let index = ComponentTypeId::of::<T>().index();
        self.slots.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    /// Mutable component access by type.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = ComponentTypeId::of::<T>().index();
        self.slots.get_mut(index)?.as_mut()?.downcast_mut::<T>()
    }

    /// Returns `true` if the entity carries a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.component_bits.get(ComponentTypeId::of::<T>().index())
    }

    /// Iterates the attached components in attach order.
    pub fn components(&self) -> impl Iterator<Item = &dyn ErasedComponent> {
        self.order.iter().filter_map(|ty| {
            self.slots
                .get(ty.index())
                .and_then(|slot| slot.as_deref())
        })
    }

    /// Number of attached components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.order.len()
    }

    /// The entity's component mask.
    #[must_use]
    pub fn component_bits(&self) -> &Bits {
        &self.component_bits
    }

    /// The entity's family-membership mask.
    #[must_use]
    pub fn family_bits(&self) -> &Bits {
        &self.family_bits
    }

    /// Creates a component through this entity's allocator without
    /// attaching it.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the allocator cannot provide storage.
    pub fn create<T: Component>(&self, value: T) -> Result<ComponentHandle<T>, AllocError> {
        ComponentHandle::new(value, self.allocator.clone())
    }

    /// Creates and attaches a component in one step.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the allocator cannot provide storage.
    ///
    /// # Panics
    ///
    /// Panics if the entity has been added to an engine; attached entities
    /// are mutated through the [`Engine`](crate::Engine).
    pub fn emplace<T: Component>(&mut self, value: T) -> Result<&mut T, AllocError> {
        let component = self.create(value)?;
        Ok(self.add(component))
    }

    /// Attaches a created component, replacing any existing component of
    /// the same type.
    ///
    /// # Panics
    ///
    /// Panics if the entity has been added to an engine; attached entities
    /// are mutated through the [`Engine`](crate::Engine).
    pub fn add<T: Component>(&mut self, component: ComponentHandle<T>) -> &mut T {
        self.assert_detached("add");
        let ptr = component.typed_ptr();
        // A replaced component of the same type is dropped; detached
        // entities have no engine to pool it through.
        drop(self.insert_slot(component.into_box()));
        // SAFETY: the slot now owns the allocation the pointer refers to,
        // and the returned borrow is tied to &mut self.
        unsafe { &mut *ptr.as_ptr() }
    }

    /// Detaches and drops the component of type `T`. Returns `true` if one
    /// was present.
    ///
    /// # Panics
    ///
    /// Panics if the entity has been added to an engine; attached entities
    /// are mutated through the [`Engine`](crate::Engine).
    pub fn remove<T: Component>(&mut self) -> bool {
        self.assert_detached("remove");
        self.take_slot(ComponentTypeId::of::<T>()).is_some()
    }

    /// Detaches and drops every component.
    ///
    /// # Panics
    ///
    /// Panics if the entity has been added to an engine; attached entities
    /// are mutated through the [`Engine`](crate::Engine).
    pub fn remove_all(&mut self) {
        self.assert_detached("remove_all");
        drop(self.take_all_slots());
    }

    fn assert_detached(&self, operation: &str) {
        assert!(
            !self.is_valid(),
            "cannot {operation} components directly on {}: entities added to an engine are \
             mutated through the Engine",
            self.uuid
        );
    }

    // -- engine-side access --

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.uuid = id;
    }

    pub(crate) fn is_added(&self) -> bool {
        self.added
    }

    pub(crate) fn mark_added(&mut self, added: bool) {
        self.added = added;
    }

    pub(crate) fn mark_scheduled(&mut self, scheduled: bool) {
        self.scheduled_for_removal = scheduled;
    }

    pub(crate) fn family_bits_mut(&mut self) -> &mut Bits {
        &mut self.family_bits
    }

    pub(crate) fn has_type(&self, ty: ComponentTypeId) -> bool {
        self.component_bits.get(ty.index())
    }

    /// Places a component into its type slot, maintaining the mask and the
    /// attach-order list. Returns the previous occupant, if any.
    pub(crate) fn insert_slot(&mut self, component: ComponentBox) -> Option<ComponentBox> {
        let ty = component.component_type();
        let index = ty.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        let previous = self.slots[index].replace(component);
        if previous.is_none() {
            self.order.push(ty);
        }
        self.component_bits.set(index);
        previous
    }

    /// Takes the component of type `ty` out of its slot, clearing the mask
    /// and the attach-order entry.
    pub(crate) fn take_slot(&mut self, ty: ComponentTypeId) -> Option<ComponentBox> {
        let index = ty.index();
        let component = self.slots.get_mut(index)?.take()?;
        self.component_bits.clear(index);
        if let Some(pos) = self.order.iter().position(|&t| t == ty) {
            self.order.remove(pos);
        }
        Some(component)
    }

    /// Empties every slot, in attach order.
    pub(crate) fn take_all_slots(&mut self) -> Vec<ComponentBox> {
        let order = std::mem::take(&mut self.order);
        let mut taken = Vec::with_capacity(order.len());
        for ty in order {
            if let Some(component) = self.slots.get_mut(ty.index()).and_then(Option::take) {
                taken.push(component);
            }
        }
        self.component_bits.clear_all();
        taken
    }

    /// The attached component types in attach order.
    pub(crate) fn component_types(&self) -> Vec<ComponentTypeId> {
        self.order.clone()
    }

    /// Restores the entity to a clean state before it returns to the entity
    /// pool. Slots are expected to be empty by the time this runs.
    pub(crate) fn reset_for_pool(&mut self) {
        debug_assert!(self.order.is_empty());
        self.flags = 0;
        self.uuid = EntityId::INVALID;
        self.scheduled_for_removal = false;
        self.added = false;
        for slot in &mut self.slots {
            *slot = None;
        }
        self.order.clear();
        self.component_bits.clear_all();
        self.family_bits.clear_all();
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.uuid)
            .field("flags", &self.flags)
            .field("components", &self.order)
            .field("scheduled_for_removal", &self.scheduled_for_removal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tessera_component::GlobalAllocator;

    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Default)]
    struct Velocity {
        dx: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    fn detached() -> Entity {
        Entity::new(Arc::new(GlobalAllocator))
    }

    #[test]
    fn test_new_entity_is_empty_and_invalid() {
        let entity = detached();
        assert!(!entity.is_valid());
        assert_eq!(entity.id(), EntityId::INVALID);
        assert_eq!(entity.component_count(), 0);
        assert!(entity.component_bits().is_empty());
    }

    #[test]
    fn test_emplace_get_has() {
        let mut entity = detached();
        entity.emplace(Position { x: 1.0, y: 2.0 }).unwrap();

        assert!(entity.has::<Position>());
        assert!(!entity.has::<Velocity>());
        assert_eq!(entity.get::<Position>().unwrap().x, 1.0);
        assert!(entity.get::<Velocity>().is_none());
    }

    #[test]
    fn test_mask_mirrors_slots() {
        let mut entity = detached();
        entity.emplace(Position::default()).unwrap();
        entity.emplace(Velocity::default()).unwrap();

        let pos = ComponentTypeId::of::<Position>().index();
        let vel = ComponentTypeId::of::<Velocity>().index();
        assert!(entity.component_bits().get(pos));
        assert!(entity.component_bits().get(vel));

        entity.remove::<Position>();
        assert!(!entity.component_bits().get(pos));
        assert!(entity.component_bits().get(vel));
        assert!(entity.get::<Position>().is_none());
    }

    #[test]
    fn test_add_replaces_same_type() {
        let mut entity = detached();
        entity.emplace(Position { x: 1.0, y: 1.0 }).unwrap();
        entity.emplace(Position { x: 9.0, y: 9.0 }).unwrap();

        assert_eq!(entity.component_count(), 1);
        assert_eq!(entity.get::<Position>().unwrap().x, 9.0);
    }

    #[test]
    fn test_components_iterate_in_attach_order() {
        let mut entity = detached();
        entity.emplace(Velocity::default()).unwrap();
        entity.emplace(Position::default()).unwrap();

        let types: Vec<ComponentTypeId> =
            entity.components().map(|c| c.component_type()).collect();
        assert_eq!(
            types,
            vec![
                ComponentTypeId::of::<Velocity>(),
                ComponentTypeId::of::<Position>()
            ]
        );
    }

    #[test]
    fn test_remove_all_clears_everything() {
        let mut entity = detached();
        entity.emplace(Position::default()).unwrap();
        entity.emplace(Velocity::default()).unwrap();

        entity.remove_all();
        assert_eq!(entity.component_count(), 0);
        assert!(entity.component_bits().is_empty());
    }

    #[test]
    fn test_remove_missing_returns_false() {
        let mut entity = detached();
        assert!(!entity.remove::<Position>());
    }

    #[test]
    #[should_panic(expected = "mutated through the Engine")]
    fn test_direct_mutation_panics_once_added() {
        let mut entity = detached();
        entity.assign_id(EntityId(7));
        entity.emplace(Position::default()).unwrap();
    }

    #[test]
    fn test_reset_for_pool() {
        let mut entity = detached();
        entity.flags = 0xFF;
        entity.emplace(Position::default()).unwrap();
        entity.remove_all();
        entity.assign_id(EntityId(3));
        entity.mark_added(true);
        entity.family_bits_mut().set(0);

        entity.reset_for_pool();
        assert_eq!(entity.flags, 0);
        assert!(!entity.is_valid());
        assert!(!entity.is_added());
        assert!(entity.family_bits().is_empty());
    }
}
