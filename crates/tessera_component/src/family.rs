//! Family predicates over component-type sets.
//!
//! A [`Family`] declares which entities a system is interested in: entities
//! whose component mask contains **all** of one set, intersects a second
//! (when non-empty), and avoids a third. Families are immutable values;
//! the engine canonicalizes them so that equal triples share one entity
//! list.

use crate::Component;
use crate::bits::Bits;
use crate::registry::ComponentTypeId;

/// An `all / one / exclude` predicate over component types.
///
/// Built with chained single-type calls:
///
/// ```rust
/// use tessera_component::{Component, Family};
///
/// # #[derive(Default)] struct Position;
/// # impl Component for Position { fn type_name() -> &'static str { "Position" } }
/// # #[derive(Default)] struct Velocity;
/// # impl Component for Velocity { fn type_name() -> &'static str { "Velocity" } }
/// # #[derive(Default)] struct Frozen;
/// # impl Component for Frozen { fn type_name() -> &'static str { "Frozen" } }
/// let family = Family::new()
///     .all::<Position>()
///     .all::<Velocity>()
///     .exclude::<Frozen>();
/// ```
///
/// The empty family matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Family {
    all: Bits,
    one: Bits,
    exclude: Bits,
}

impl Family {
    /// Creates the empty family, which matches every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires entities to have a component of type `T`.
    #[must_use]
    pub fn all<T: Component>(mut self) -> Self {
        self.all.set(ComponentTypeId::of::<T>().index());
        self
    }

    /// Adds `T` to the one-of set: entities must have at least one of the
    /// types added through `one`.
    #[must_use]
    pub fn one<T: Component>(mut self) -> Self {
        self.one.set(ComponentTypeId::of::<T>().index());
        self
    }

    /// Rejects entities that have a component of type `T`.
    #[must_use]
    pub fn exclude<T: Component>(mut self) -> Self {
        self.exclude.set(ComponentTypeId::of::<T>().index());
        self
    }

    /// Evaluates the predicate against an entity's component mask.
    #[must_use]
    pub fn matches(&self, component_bits: &Bits) -> bool {
        if !component_bits.contains_all(&self.all) {
            return false;
        }
        if !self.one.is_empty() && !component_bits.intersects(&self.one) {
            return false;
        }
        if component_bits.intersects(&self.exclude) {
            return false;
        }
        true
    }

    /// The required-component mask.
    #[must_use]
    pub fn all_bits(&self) -> &Bits {
        &self.all
    }

    /// The one-of mask.
    #[must_use]
    pub fn one_bits(&self) -> &Bits {
        &self.one
    }

    /// The excluded-component mask.
    #[must_use]
    pub fn exclude_bits(&self) -> &Bits {
        &self.exclude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct A;
    impl Component for A {
        fn type_name() -> &'static str {
            "A"
        }
    }

    #[derive(Default)]
    struct B;
    impl Component for B {
        fn type_name() -> &'static str {
            "B"
        }
    }

    #[derive(Default)]
    struct C;
    impl Component for C {
        fn type_name() -> &'static str {
            "C"
        }
    }

    fn mask(types: &[ComponentTypeId]) -> Bits {
        types.iter().map(|t| t.index()).collect()
    }

    #[test]
    fn test_empty_family_matches_everything() {
        let family = Family::new();
        assert!(family.matches(&Bits::new()));
        assert!(family.matches(&mask(&[ComponentTypeId::of::<A>()])));
    }

    #[test]
    fn test_all_requires_every_type() {
        let family = Family::new().all::<A>().all::<B>();
        let a = ComponentTypeId::of::<A>();
        let b = ComponentTypeId::of::<B>();
        let c = ComponentTypeId::of::<C>();

        assert!(!family.matches(&mask(&[a])));
        assert!(family.matches(&mask(&[a, b])));
        assert!(family.matches(&mask(&[a, b, c])));
        assert!(!family.matches(&mask(&[b, c])));
    }

    #[test]
    fn test_one_requires_any_of_the_set() {
        let family = Family::new().one::<A>().one::<B>();
        let a = ComponentTypeId::of::<A>();
        let b = ComponentTypeId::of::<B>();
        let c = ComponentTypeId::of::<C>();

        assert!(family.matches(&mask(&[a])));
        assert!(family.matches(&mask(&[b, c])));
        assert!(!family.matches(&mask(&[c])));
        assert!(!family.matches(&Bits::new()));
    }

    #[test]
    fn test_exclude_rejects() {
        let family = Family::new().all::<A>().exclude::<C>();
        let a = ComponentTypeId::of::<A>();
        let c = ComponentTypeId::of::<C>();

        assert!(family.matches(&mask(&[a])));
        assert!(!family.matches(&mask(&[a, c])));
    }

    #[test]
    fn test_equal_triples_are_equal_values() {
        let first = Family::new().all::<A>().all::<B>().exclude::<C>();
        let second = Family::new().all::<B>().exclude::<C>().all::<A>();
        assert_eq!(first, second);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        first.hash(&mut ha);
        second.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn test_different_kinds_of_constraint_differ() {
        assert_ne!(Family::new().all::<A>(), Family::new().one::<A>());
        assert_ne!(Family::new().all::<A>(), Family::new().exclude::<A>());
    }
}
