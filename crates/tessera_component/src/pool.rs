//! Bounded free lists for component reuse.
//!
//! Attaching and detaching components is frequent in simulation workloads;
//! pooling keeps detached instances around for reuse instead of hitting the
//! allocator on every churn. A pool holds instances of exactly one component
//! type. Pools never construct: when a pool is empty, the typed factory
//! call site creates a fresh instance through the allocator.

use crate::component::ComponentBox;
use crate::registry::ComponentTypeId;

/// A bounded free list of detached component instances of a single type.
#[derive(Debug)]
pub struct ComponentPool {
    ty: ComponentTypeId,
    free: Vec<ComponentBox>,
    max_size: usize,
}

impl ComponentPool {
    /// Creates a pool for `ty` with free-list capacity `initial_size` and a
    /// retention bound of `max_size` instances.
    #[must_use]
    pub fn new(ty: ComponentTypeId, initial_size: usize, max_size: usize) -> Self {
        Self {
            ty,
            free: Vec::with_capacity(initial_size.min(max_size)),
            max_size,
        }
    }

    /// The component type this pool serves.
    #[must_use]
    pub fn component_type(&self) -> ComponentTypeId {
        self.ty
    }

    /// Takes a previously released instance, if any is cached.
    ///
    /// Returned instances have had their [`reset`](crate::Component::reset)
    /// hook run at release time.
    pub fn obtain(&mut self) -> Option<ComponentBox> {
        self.free.pop()
    }

    /// Returns a detached instance to the pool.
    ///
    /// Runs the component's `reset` hook, then stores the instance if the
    /// pool is below its retention bound; otherwise the instance is dropped
    /// and its memory returns to the allocator.
    pub fn release(&mut self, mut component: ComponentBox) {
        debug_assert_eq!(component.component_type(), self.ty);
        component.reset_component();
        if self.free.len() < self.max_size {
            self.free.push(component);
        }
    }

    /// Number of cached instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns `true` if no instance is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Drops every cached instance.
    pub fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Component;
    use crate::allocator::{Allocator, CountingAllocator, GlobalAllocator};

    #[derive(Debug, Default)]
    struct Charge {
        level: u32,
    }

    impl Component for Charge {
        fn type_name() -> &'static str {
            "Charge"
        }

        fn reset(&mut self) {
            self.level = 0;
        }
    }

    fn boxed(level: u32, alloc: &Arc<dyn Allocator>) -> ComponentBox {
        ComponentBox::new(Charge { level }, alloc.clone()).unwrap()
    }

    #[test]
    fn test_obtain_from_empty_pool() {
        let mut pool = ComponentPool::new(ComponentTypeId::of::<Charge>(), 4, 16);
        assert!(pool.obtain().is_none());
    }

    #[test]
    fn test_release_resets_and_reuses() {
        let alloc: Arc<dyn Allocator> = Arc::new(GlobalAllocator);
        let mut pool = ComponentPool::new(ComponentTypeId::of::<Charge>(), 4, 16);

        pool.release(boxed(9, &alloc));
        assert_eq!(pool.len(), 1);

        let reused = pool.obtain().unwrap();
        assert_eq!(reused.downcast_ref::<Charge>().unwrap().level, 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_release_beyond_max_frees() {
        let counting = CountingAllocator::default();
        let alloc: Arc<dyn Allocator> = Arc::new(counting.clone());
        let mut pool = ComponentPool::new(ComponentTypeId::of::<Charge>(), 0, 2);

        pool.release(boxed(1, &alloc));
        pool.release(boxed(2, &alloc));
        pool.release(boxed(3, &alloc));

        assert_eq!(pool.len(), 2);
        // The third release fell out of the pool and went back to the
        // allocator.
        assert_eq!(counting.live(), 2);
    }

    #[test]
    fn test_clear_frees_cached_instances() {
        let counting = CountingAllocator::default();
        let alloc: Arc<dyn Allocator> = Arc::new(counting.clone());
        let mut pool = ComponentPool::new(ComponentTypeId::of::<Charge>(), 0, 8);

        pool.release(boxed(1, &alloc));
        pool.release(boxed(2, &alloc));
        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(counting.live(), 0);
    }
}
