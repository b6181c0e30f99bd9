//! # tessera_component
//!
//! The "C" in ECS — defines what a component is, how it is stored, and how
//! component sets are described and matched.
//!
//! This crate provides:
//!
//! - [`Component`] trait — the contract all ECS data must satisfy.
//! - [`ComponentTypeId`] / [`SystemTypeId`] — dense runtime type identities.
//! - [`Bits`] — variable-width bitset used for component and family masks.
//! - [`Family`] — declarative `all / one / exclude` predicates over
//!   component types.
//! - [`Allocator`] — the memory backend every engine-created component flows
//!   through.
//! - [`ComponentBox`] / [`ComponentHandle`] — owning component storage.
//! - [`ComponentPool`] — bounded free lists for component reuse.

pub mod allocator;
pub mod bits;
pub mod component;
pub mod family;
pub mod pool;
pub mod registry;

pub use allocator::{AllocError, Allocator, CountingAllocator, GlobalAllocator};
pub use bits::Bits;
pub use component::{Component, ComponentBox, ComponentHandle, ErasedComponent};
pub use family::Family;
pub use pool::ComponentPool;
pub use registry::{ComponentTypeId, SystemTypeId};
