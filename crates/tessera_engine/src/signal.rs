//! Synchronous multicast signals.
//!
//! The engine announces state transitions — entity added/removed, component
//! added/removed, family membership changes — through signals. Listeners
//! run synchronously at the transition point and receive a mutable engine
//! reference; any structural mutation they perform is deferred by the
//! engine's `notifying` guard and applied at the next drain point.
//!
//! Dispatch is re-entrancy safe: while a signal is being dispatched its
//! listener list is detached, so a listener may connect further listeners
//! (they join after the dispatch) or disconnect existing ones (honored
//! after the dispatch).

use tessera_component::ComponentTypeId;

use crate::engine::Engine;
use crate::entity::EntityId;

/// Identifies a connected listener for later disconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type EntityListener = Box<dyn FnMut(&mut Engine, EntityId) + Send>;
type ComponentListener = Box<dyn FnMut(&mut Engine, EntityId, ComponentTypeId) + Send>;

/// A signal whose listeners receive `(engine, entity)`.
#[derive(Default)]
pub struct EntitySignal {
    next_id: u64,
    pub(crate) listeners: Vec<(ListenerId, EntityListener)>,
    pending_disconnects: Vec<ListenerId>,
}

impl EntitySignal {
    /// Connects a listener; returns its id for [`EntitySignal::disconnect`].
    pub fn connect<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&mut Engine, EntityId) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Disconnects a listener.
    ///
    /// Returns `true` if the listener was removed immediately. During a
    /// dispatch of this signal the removal is recorded and applied when the
    /// dispatch completes, and `false` is returned.
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.listeners.iter().position(|(lid, _)| *lid == id) {
            self.listeners.remove(pos);
            true
        } else {
            self.pending_disconnects.push(id);
            false
        }
    }

    /// Number of connected listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nothing is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Detaches the listener list for a dispatch.
    pub(crate) fn begin_dispatch(&mut self) -> Vec<(ListenerId, EntityListener)> {
        std::mem::take(&mut self.listeners)
    }

    /// Restores the listener list after a dispatch, keeping listeners that
    /// connected during it and dropping ones that disconnected during it.
    pub(crate) fn end_dispatch(&mut self, dispatched: Vec<(ListenerId, EntityListener)>) {
        let connected_during = std::mem::replace(&mut self.listeners, dispatched);
        self.listeners.extend(connected_during);
        if !self.pending_disconnects.is_empty() {
            let dead = std::mem::take(&mut self.pending_disconnects);
            self.listeners.retain(|(id, _)| !dead.contains(id));
        }
    }
}

impl std::fmt::Debug for EntitySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySignal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A signal whose listeners receive `(engine, entity, component type)`.
///
/// `component_removed` dispatches before the slot is cleared, so a listener
/// can still read the departing component through the engine.
#[derive(Default)]
pub struct ComponentSignal {
    next_id: u64,
    pub(crate) listeners: Vec<(ListenerId, ComponentListener)>,
    pending_disconnects: Vec<ListenerId>,
}

impl ComponentSignal {
    /// Connects a listener; returns its id for
    /// [`ComponentSignal::disconnect`].
    pub fn connect<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&mut Engine, EntityId, ComponentTypeId) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Disconnects a listener; same semantics as
    /// [`EntitySignal::disconnect`].
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.listeners.iter().position(|(lid, _)| *lid == id) {
            self.listeners.remove(pos);
            true
        } else {
            self.pending_disconnects.push(id);
            false
        }
    }

    /// Number of connected listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nothing is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn begin_dispatch(&mut self) -> Vec<(ListenerId, ComponentListener)> {
        std::mem::take(&mut self.listeners)
    }

    pub(crate) fn end_dispatch(&mut self, dispatched: Vec<(ListenerId, ComponentListener)>) {
        let connected_during = std::mem::replace(&mut self.listeners, dispatched);
        self.listeners.extend(connected_during);
        if !self.pending_disconnects.is_empty() {
            let dead = std::mem::take(&mut self.pending_disconnects);
            self.listeners.retain(|(id, _)| !dead.contains(id));
        }
    }
}

impl std::fmt::Debug for ComponentSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSignal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
