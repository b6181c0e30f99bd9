//! The engine: entity ownership, family maintenance, deferred operations,
//! and the system update loop.
//!
//! The [`Engine`] owns every live [`Entity`], every attached component,
//! every pool, every family list, and every registered system. User code
//! holds [`EntityId`]s and borrows.
//!
//! Structural mutations (entity add/remove, component attach/detach) apply
//! immediately while the engine is idle. While an update or a signal
//! dispatch is in progress they are queued and applied at the next drain
//! point, so iteration always sees a stable view. Drain points are: the top
//! of [`Engine::update`], after each system, and the end of every public
//! mutating call that ran listeners while the engine was otherwise idle.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use tessera_component::{
    Allocator, Component, ComponentBox, ComponentHandle, ComponentPool, ComponentTypeId, Family,
    GlobalAllocator, SystemTypeId,
};

use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::error::EngineError;
use crate::families::{FamilyId, FamilyIndex};
use crate::ops::{ComponentOp, EntityOp};
use crate::signal::{ComponentSignal, EntitySignal};
use crate::system::{System, SystemEntry};

#[derive(Clone, Copy)]
enum EntityEvent {
    Added,
    Removed,
    FamilyJoined(FamilyId),
    FamilyLeft(FamilyId),
}

#[derive(Clone, Copy)]
enum ComponentEvent {
    Added,
    Removed,
}

/// The heart of the framework.
///
/// Create entities and components through the engine so they flow through
/// its pools and allocator, add systems, then drive everything with
/// [`Engine::update`] once per tick.
pub struct Engine {
    entities: Vec<EntityId>,
    entities_by_id: HashMap<EntityId, Entity>,
    next_entity_id: u64,

    systems: Vec<SystemEntry>,
    system_index: HashMap<SystemTypeId, usize>,
    inflight_system: Option<SystemTypeId>,
    inflight_removed: bool,

    families: FamilyIndex,
    family_added_signals: HashMap<FamilyId, EntitySignal>,
    family_removed_signals: HashMap<FamilyId, EntitySignal>,

    /// Dispatches when a component is attached to a registered entity.
    pub component_added: ComponentSignal,
    /// Dispatches when a component is detached, before the slot is cleared.
    pub component_removed: ComponentSignal,
    /// Dispatches when an entity completes registration.
    pub entity_added: EntitySignal,
    /// Dispatches when an entity is removed, while it is still readable.
    pub entity_removed: EntitySignal,

    component_pools: Vec<Option<ComponentPool>>,
    entity_pool: Vec<Entity>,

    component_ops: Vec<ComponentOp>,
    entity_ops: Vec<EntityOp>,

    updating: bool,
    notifying: bool,

    allocator: Arc<dyn Allocator>,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with default pool sizes and the global allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given pool configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_allocator(config, Arc::new(GlobalAllocator))
    }

    /// Creates an engine whose component storage flows through `allocator`.
    #[must_use]
    pub fn with_allocator(config: EngineConfig, allocator: Arc<dyn Allocator>) -> Self {
        Self {
            entities: Vec::new(),
            entities_by_id: HashMap::new(),
            next_entity_id: 1,
            systems: Vec::new(),
            system_index: HashMap::new(),
            inflight_system: None,
            inflight_removed: false,
            families: FamilyIndex::default(),
            family_added_signals: HashMap::new(),
            family_removed_signals: HashMap::new(),
            component_added: ComponentSignal::default(),
            component_removed: ComponentSignal::default(),
            entity_added: EntitySignal::default(),
            entity_removed: EntitySignal::default(),
            component_pools: Vec::new(),
            entity_pool: Vec::with_capacity(
                config.entity_pool_initial_size.min(config.entity_pool_max_size),
            ),
            component_ops: Vec::new(),
            entity_ops: Vec::new(),
            updating: false,
            notifying: false,
            allocator,
            config,
        }
    }

    /// The allocator component storage flows through.
    #[must_use]
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    // -- entity lifecycle --

    /// Takes a clean entity from the pool. Populate it, then hand it to
    /// [`Engine::add_entity`].
    pub fn create_entity(&mut self) -> Entity {
        self.entity_pool
            .pop()
            .unwrap_or_else(|| Entity::new(self.allocator.clone()))
    }

    /// Registers an entity, assigning its id.
    ///
    /// The id is live immediately: the entity can be looked up and receive
    /// component operations. If the engine is mid-update or mid-dispatch,
    /// joining the entity list and families — and the `entity_added`
    /// signal — happen at the next drain point.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        entity.assign_id(id);
        self.entities_by_id.insert(id, entity);
        if self.updating || self.notifying {
            self.entity_ops.push(EntityOp::Add(id));
        } else {
            self.add_entity_internal(id);
            self.flush_if_idle();
        }
        id
    }

    /// Removes an entity, releasing its components to their pools and the
    /// entity itself to the entity pool.
    ///
    /// Deferred while the engine is busy; the entity's
    /// `scheduled_for_removal` flag is set immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] for an unknown id.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<(), EngineError> {
        let Some(entity) = self.entities_by_id.get_mut(&id) else {
            return Err(EngineError::EntityNotFound(id));
        };
        if self.updating || self.notifying {
            if !entity.is_scheduled_for_removal() {
                entity.mark_scheduled(true);
                self.entity_ops.push(EntityOp::Remove(id));
            }
        } else {
            self.remove_entity_internal(id);
            self.flush_if_idle();
        }
        Ok(())
    }

    /// Removes every registered entity.
    pub fn remove_all_entities(&mut self) {
        if self.updating || self.notifying {
            for &id in &self.entities {
                if let Some(entity) = self.entities_by_id.get_mut(&id) {
                    entity.mark_scheduled(true);
                }
            }
            self.entity_ops.push(EntityOp::RemoveAll);
        } else {
            while let Some(&id) = self.entities.first() {
                self.remove_entity_internal(id);
            }
            self.flush_if_idle();
        }
    }

    /// Looks up a registered entity.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities_by_id.get(&id)
    }

    /// Mutable entity lookup, for flag updates and component data access.
    /// Structural changes still go through the engine's component
    /// operations.
    #[must_use]
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities_by_id.get_mut(&id)
    }

    /// All registered entities, in registration order.
    #[must_use]
    pub fn get_entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Number of registered entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // -- component factory and pools --

    /// Obtains a `T` from its pool, or default-constructs one through the
    /// allocator when the pool is empty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Alloc`] if the allocator cannot provide
    /// storage for a fresh instance.
    pub fn create_component<T: Component + Default>(
        &mut self,
    ) -> Result<ComponentHandle<T>, EngineError> {
        let ty = ComponentTypeId::of::<T>();
        if let Some(pooled) = self.pool_mut(ty).and_then(ComponentPool::obtain) {
            if let Ok(handle) = ComponentHandle::from_box(pooled) {
                return Ok(handle);
            }
        }
        Ok(ComponentHandle::new(T::default(), self.allocator.clone())?)
    }

    /// Returns an unused created component to its pool.
    pub fn free_component<T: Component>(&mut self, component: ComponentHandle<T>) {
        self.release_component(component.into_box());
    }

    /// Number of pooled instances of `T`.
    #[must_use]
    pub fn pooled_components<T: Component>(&self) -> usize {
        let index = ComponentTypeId::of::<T>().index();
        self.component_pools
            .get(index)
            .and_then(Option::as_ref)
            .map_or(0, ComponentPool::len)
    }

    /// Number of pooled entities.
    #[must_use]
    pub fn pooled_entities(&self) -> usize {
        self.entity_pool.len()
    }

    /// Drops every pooled entity and component.
    pub fn clear_pools(&mut self) {
        for pool in self.component_pools.iter_mut().flatten() {
            pool.clear();
        }
        self.entity_pool.clear();
    }

    // -- component operations on registered entities --

    /// Attaches a created component to a registered entity, replacing any
    /// existing component of the same type. Deferred while the engine is
    /// busy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] for an unknown id; the
    /// component is released to its pool.
    pub fn add_component<T: Component>(
        &mut self,
        id: EntityId,
        component: ComponentHandle<T>,
    ) -> Result<(), EngineError> {
        self.add_component_boxed(id, component.into_box())
    }

    /// Creates a component from `value` and attaches it, in one step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] for an unknown id, or
    /// [`EngineError::Alloc`] if storage cannot be provided.
    pub fn emplace_component<T: Component>(
        &mut self,
        id: EntityId,
        value: T,
    ) -> Result<(), EngineError> {
        let boxed = ComponentBox::new(value, self.allocator.clone())?;
        self.add_component_boxed(id, boxed)
    }

    fn add_component_boxed(&mut self, id: EntityId, boxed: ComponentBox) -> Result<(), EngineError> {
        if !self.entities_by_id.contains_key(&id) {
            self.release_component(boxed);
            return Err(EngineError::EntityNotFound(id));
        }
        if self.updating || self.notifying {
            self.component_ops.push(ComponentOp::Add {
                entity: id,
                component: boxed,
            });
        } else {
            self.add_component_internal(id, boxed);
            self.flush_if_idle();
        }
        Ok(())
    }

    /// Detaches the component of type `T`, releasing it to its pool. A
    /// missing component is not an error. Deferred while the engine is
    /// busy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] for an unknown id.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Result<(), EngineError> {
        let ty = ComponentTypeId::of::<T>();
        if !self.entities_by_id.contains_key(&id) {
            return Err(EngineError::EntityNotFound(id));
        }
        if self.updating || self.notifying {
            self.component_ops.push(ComponentOp::Remove { entity: id, ty });
        } else {
            self.remove_component_internal(id, ty);
            self.flush_if_idle();
        }
        Ok(())
    }

    /// Detaches every component, equivalent to removing each in attach
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] for an unknown id.
    pub fn remove_all_components(&mut self, id: EntityId) -> Result<(), EngineError> {
        let Some(entity) = self.entities_by_id.get(&id) else {
            return Err(EngineError::EntityNotFound(id));
        };
        let types = entity.component_types();
        if self.updating || self.notifying {
            for ty in types {
                self.component_ops.push(ComponentOp::Remove { entity: id, ty });
            }
        } else {
            for ty in types {
                self.remove_component_internal(id, ty);
            }
            self.flush_if_idle();
        }
        Ok(())
    }

    /// Reads a component off a registered entity.
    #[must_use]
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities_by_id.get(&id)?.get::<T>()
    }

    /// Mutable component data access. Field mutation is not structural and
    /// never defers.
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities_by_id.get_mut(&id)?.get_mut::<T>()
    }

    /// Returns `true` if the entity is registered and carries a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.entities_by_id.get(&id).is_some_and(Entity::has::<T>)
    }

    // -- families --

    /// Registers a family (canonicalizing by value) and returns its id.
    /// New registrations backfill their entity list from the live entities.
    pub fn register_family(&mut self, family: &Family) -> FamilyId {
        let (id, is_new) = self.families.get_or_register(family);
        if is_new {
            debug!(family = id.index(), "registered family");
            for position in 0..self.entities.len() {
                let entity_id = self.entities[position];
                let matches = self
                    .entities_by_id
                    .get(&entity_id)
                    .is_some_and(|entity| self.families.family(id).matches(entity.component_bits()));
                if matches {
                    self.families.insert_entity(id, entity_id);
                    if let Some(entity) = self.entities_by_id.get_mut(&entity_id) {
                        entity.family_bits_mut().set(id.index());
                    }
                }
            }
        }
        id
    }

    /// The entities currently matching `family`, in join order. The same
    /// family always resolves to the same shared list.
    pub fn get_entities_for(&mut self, family: &Family) -> &[EntityId] {
        let id = self.register_family(family);
        self.families.entities(id)
    }

    /// The entity list for an already registered family.
    #[must_use]
    pub fn entities_for_id(&self, id: FamilyId) -> &[EntityId] {
        self.families.entities(id)
    }

    /// The signal dispatched when an entity joins `family`.
    pub fn entity_added_signal(&mut self, family: &Family) -> &mut EntitySignal {
        let id = self.register_family(family);
        self.family_added_signals.entry(id).or_default()
    }

    /// The signal dispatched when an entity leaves `family`.
    pub fn entity_removed_signal(&mut self, family: &Family) -> &mut EntitySignal {
        let id = self.register_family(family);
        self.family_removed_signals.entry(id).or_default()
    }

    // -- systems --

    /// Registers a system, ordered by ascending priority with insertion
    /// order breaking ties.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SystemKindAlreadyRegistered`] if a system of
    /// the same concrete type is present.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EngineError> {
        let name = std::any::type_name::<S>();
        let ty = SystemTypeId::of_token(TypeId::of::<S>(), name);
        let registered = self.system_index.contains_key(&ty)
            || (self.inflight_system == Some(ty) && !self.inflight_removed);
        if registered {
            return Err(EngineError::SystemKindAlreadyRegistered(name));
        }
        let mut boxed: Box<dyn System> = Box::new(system);
        boxed.added_to_engine(self);
        let position = self
            .systems
            .iter()
            .position(|entry| entry.system.priority() > boxed.priority())
            .unwrap_or(self.systems.len());
        self.systems.insert(
            position,
            SystemEntry {
                ty,
                name,
                system: boxed,
            },
        );
        self.rebuild_system_index();
        debug!(system = name, "system added");
        Ok(())
    }

    /// Removes the system of type `S`. A system may remove itself during
    /// its own update; the removal takes effect when its update returns.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SystemNotRegistered`] if no such system is
    /// present.
    pub fn remove_system<S: System>(&mut self) -> Result<(), EngineError> {
        let name = std::any::type_name::<S>();
        let ty = SystemTypeId::of_token(TypeId::of::<S>(), name);
        if self.inflight_system == Some(ty) && !self.inflight_removed {
            self.inflight_removed = true;
            return Ok(());
        }
        let Some(&index) = self.system_index.get(&ty) else {
            return Err(EngineError::SystemNotRegistered(name));
        };
        let mut entry = self.systems.remove(index);
        self.rebuild_system_index();
        entry.system.removed_from_engine(self);
        debug!(system = entry.name, "system removed");
        Ok(())
    }

    /// Typed lookup of a registered system.
    #[must_use]
    pub fn get_system<S: System>(&self) -> Option<&S> {
        let ty = SystemTypeId::of_token(TypeId::of::<S>(), std::any::type_name::<S>());
        let &index = self.system_index.get(&ty)?;
        let system: &dyn System = self.systems[index].system.as_ref();
        (system as &dyn std::any::Any).downcast_ref::<S>()
    }

    /// Typed mutable lookup of a registered system.
    #[must_use]
    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        let ty = SystemTypeId::of_token(TypeId::of::<S>(), std::any::type_name::<S>());
        let &index = self.system_index.get(&ty)?;
        let system: &mut dyn System = self.systems[index].system.as_mut();
        (system as &mut dyn std::any::Any).downcast_mut::<S>()
    }

    /// The registered systems in execution order.
    pub fn systems(&self) -> impl Iterator<Item = &dyn System> {
        self.systems.iter().map(|entry| entry.system.as_ref())
    }

    /// Number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // -- update loop --

    /// Runs one tick: drains pending operations, then every processing
    /// system in priority order, draining between systems.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReentrantUpdate`] when called from within a
    /// running update.
    pub fn update(&mut self, delta: f32) -> Result<(), EngineError> {
        if self.updating {
            return Err(EngineError::ReentrantUpdate);
        }
        self.updating = true;
        trace!(delta, systems = self.systems.len(), "update begin");
        self.process_operations();

        let mut index = 0;
        while index < self.systems.len() {
            let mut entry = self.systems.remove(index);
            self.rebuild_system_index();
            self.inflight_system = Some(entry.ty);
            self.inflight_removed = false;

            if entry.system.check_processing() {
                entry.system.update(self, delta);
            }

            let removed = self.inflight_removed;
            self.inflight_system = None;
            self.inflight_removed = false;
            if removed {
                entry.system.removed_from_engine(self);
                debug!(system = entry.name, "system removed");
            } else {
                let at = index.min(self.systems.len());
                self.systems.insert(at, entry);
                index += 1;
            }
            self.rebuild_system_index();
            self.process_operations();
        }

        self.updating = false;
        trace!("update end");
        Ok(())
    }

    /// Drains pending operations, removes all entities, and clears the
    /// pools. Also runs on drop.
    pub fn clear(&mut self) {
        if self.updating {
            warn!("clear() ignored while the engine is updating");
            return;
        }
        self.process_operations();
        self.remove_all_entities();
        self.clear_pools();
    }

    // -- internal: deferred operation drains --

    fn flush_if_idle(&mut self) {
        if !self.updating && !self.notifying {
            self.process_operations();
        }
    }

    /// Applies queued operations until both queues are empty. The
    /// component queue drains first at every pass: component changes can
    /// alter family membership that pending entity work then observes.
    fn process_operations(&mut self) {
        while !self.component_ops.is_empty() || !self.entity_ops.is_empty() {
            while !self.component_ops.is_empty() {
                let ops = std::mem::take(&mut self.component_ops);
                for op in ops {
                    match op {
                        ComponentOp::Add { entity, component } => {
                            self.add_component_internal(entity, component);
                        }
                        ComponentOp::Remove { entity, ty } => {
                            self.remove_component_internal(entity, ty);
                        }
                    }
                }
            }
            let ops = std::mem::take(&mut self.entity_ops);
            for op in ops {
                match op {
                    EntityOp::Add(id) => self.add_entity_internal(id),
                    EntityOp::Remove(id) => self.remove_entity_internal(id),
                    EntityOp::RemoveAll => {
                        while let Some(&id) = self.entities.first() {
                            self.remove_entity_internal(id);
                        }
                    }
                }
            }
        }
    }

    // -- internal: direct mutations --

    fn add_entity_internal(&mut self, id: EntityId) {
        match self.entities_by_id.get_mut(&id) {
            Some(entity) if !entity.is_added() => entity.mark_added(true),
            // Removed while its registration was queued, or already added.
            _ => return,
        }
        self.entities.push(id);
        debug!(entity = %id, "entity added");
        self.update_family_membership(id);
        self.dispatch_entity_event(EntityEvent::Added, id);
    }

    fn remove_entity_internal(&mut self, id: EntityId) {
        let Some(entity) = self.entities_by_id.get_mut(&id) else {
            return;
        };
        entity.mark_scheduled(false);
        let was_added = entity.is_added();

        if was_added {
            let member_of: Vec<usize> = entity.family_bits().ones().collect();
            for index in member_of {
                let family = FamilyId::from_index(index);
                self.families.remove_entity(family, id);
                if let Some(entity) = self.entities_by_id.get_mut(&id) {
                    entity.family_bits_mut().clear(index);
                }
                self.dispatch_entity_event(EntityEvent::FamilyLeft(family), id);
            }
            self.dispatch_entity_event(EntityEvent::Removed, id);
        }

        let Some(mut entity) = self.entities_by_id.remove(&id) else {
            return;
        };
        if was_added {
            if let Some(position) = self.entities.iter().position(|&e| e == id) {
                self.entities.remove(position);
            }
        }
        debug!(entity = %id, "entity removed");
        for component in entity.take_all_slots() {
            self.release_component(component);
        }
        entity.reset_for_pool();
        if self.entity_pool.len() < self.config.entity_pool_max_size {
            self.entity_pool.push(entity);
        }
    }

    fn add_component_internal(&mut self, id: EntityId, boxed: ComponentBox) {
        let ty = boxed.component_type();
        let occupied = match self.entities_by_id.get(&id) {
            Some(entity) => entity.has_type(ty),
            None => {
                // The entity died before this operation drained.
                self.release_component(boxed);
                return;
            }
        };
        if occupied {
            self.dispatch_component_event(ComponentEvent::Removed, id, ty);
            let old = self
                .entities_by_id
                .get_mut(&id)
                .and_then(|entity| entity.take_slot(ty));
            if let Some(old) = old {
                self.release_component(old);
            }
        }
        let replaced = match self.entities_by_id.get_mut(&id) {
            Some(entity) => entity.insert_slot(boxed),
            None => {
                self.release_component(boxed);
                return;
            }
        };
        if let Some(replaced) = replaced {
            self.release_component(replaced);
        }
        trace!(entity = %id, component = %ty, "component added");
        self.dispatch_component_event(ComponentEvent::Added, id, ty);
        self.update_family_membership(id);
    }

    fn remove_component_internal(&mut self, id: EntityId, ty: ComponentTypeId) {
        let present = self
            .entities_by_id
            .get(&id)
            .is_some_and(|entity| entity.has_type(ty));
        if !present {
            return;
        }
        // Listeners observe the component still attached.
        self.dispatch_component_event(ComponentEvent::Removed, id, ty);
        let taken = self
            .entities_by_id
            .get_mut(&id)
            .and_then(|entity| entity.take_slot(ty));
        let Some(component) = taken else {
            return;
        };
        self.release_component(component);
        trace!(entity = %id, component = %ty, "component removed");
        self.update_family_membership(id);
    }

    /// Re-evaluates one entity against every registered family, in
    /// family-id order, applying membership transitions and firing the
    /// per-family signals.
    fn update_family_membership(&mut self, id: EntityId) {
        let family_count = self.families.len();
        for index in 0..family_count {
            let family = FamilyId::from_index(index);
            let transition = {
                let Some(entity) = self.entities_by_id.get(&id) else {
                    return;
                };
                if !entity.is_added() {
                    return;
                }
                let matches = self.families.family(family).matches(entity.component_bits());
                let member = entity.family_bits().get(index);
                match (member, matches) {
                    (false, true) => Some(true),
                    (true, false) => Some(false),
                    _ => None,
                }
            };
            match transition {
                Some(true) => {
                    self.families.insert_entity(family, id);
                    if let Some(entity) = self.entities_by_id.get_mut(&id) {
                        entity.family_bits_mut().set(index);
                    }
                    self.dispatch_entity_event(EntityEvent::FamilyJoined(family), id);
                }
                Some(false) => {
                    self.families.remove_entity(family, id);
                    if let Some(entity) = self.entities_by_id.get_mut(&id) {
                        entity.family_bits_mut().clear(index);
                    }
                    self.dispatch_entity_event(EntityEvent::FamilyLeft(family), id);
                }
                None => {}
            }
        }
    }

    fn release_component(&mut self, component: ComponentBox) {
        let ty = component.component_type();
        self.ensure_pool(ty).release(component);
    }

    fn pool_mut(&mut self, ty: ComponentTypeId) -> Option<&mut ComponentPool> {
        self.component_pools.get_mut(ty.index())?.as_mut()
    }

    fn ensure_pool(&mut self, ty: ComponentTypeId) -> &mut ComponentPool {
        let index = ty.index();
        if index >= self.component_pools.len() {
            self.component_pools.resize_with(index + 1, || None);
        }
        self.component_pools[index].get_or_insert_with(|| {
            ComponentPool::new(
                ty,
                self.config.component_pool_initial_size,
                self.config.component_pool_max_size,
            )
        })
    }

    fn rebuild_system_index(&mut self) {
        self.system_index.clear();
        for (index, entry) in self.systems.iter().enumerate() {
            self.system_index.insert(entry.ty, index);
        }
    }

    // -- internal: signal dispatch --

    fn entity_signal_slot(&mut self, event: EntityEvent) -> &mut EntitySignal {
        match event {
            EntityEvent::Added => &mut self.entity_added,
            EntityEvent::Removed => &mut self.entity_removed,
            EntityEvent::FamilyJoined(family) => {
                self.family_added_signals.entry(family).or_default()
            }
            EntityEvent::FamilyLeft(family) => {
                self.family_removed_signals.entry(family).or_default()
            }
        }
    }

    fn dispatch_entity_event(&mut self, event: EntityEvent, id: EntityId) {
        let mut dispatched = self.entity_signal_slot(event).begin_dispatch();
        if dispatched.is_empty() {
            self.entity_signal_slot(event).end_dispatch(dispatched);
            return;
        }
        let was_notifying = self.notifying;
        self.notifying = true;
        for (_, listener) in dispatched.iter_mut() {
            listener(self, id);
        }
        self.notifying = was_notifying;
        self.entity_signal_slot(event).end_dispatch(dispatched);
    }

    fn component_signal_slot(&mut self, event: ComponentEvent) -> &mut ComponentSignal {
        match event {
            ComponentEvent::Added => &mut self.component_added,
            ComponentEvent::Removed => &mut self.component_removed,
        }
    }

    fn dispatch_component_event(
        &mut self,
        event: ComponentEvent,
        id: EntityId,
        ty: ComponentTypeId,
    ) {
        let mut dispatched = self.component_signal_slot(event).begin_dispatch();
        if dispatched.is_empty() {
            self.component_signal_slot(event).end_dispatch(dispatched);
            return;
        }
        let was_notifying = self.notifying;
        self.notifying = true;
        for (_, listener) in dispatched.iter_mut() {
            listener(self, id, ty);
        }
        self.notifying = was_notifying;
        self.component_signal_slot(event).end_dispatch(dispatched);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.updating {
            self.clear();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entities", &self.entities.len())
            .field("systems", &self.systems.len())
            .field("updating", &self.updating)
            .finish()
    }
}
