//! Memory allocation backend.
//!
//! Every component instance the engine creates on a user's behalf flows
//! through an [`Allocator`]. The default [`GlobalAllocator`] defers to
//! `std::alloc`; embedders with arena or budgeted allocation plug in their
//! own implementation. [`CountingAllocator`] wraps any backend with
//! live-allocation accounting, which the test suites use to bracket
//! scenarios and assert that nothing leaked.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An allocation request could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("allocation of {size} bytes (align {align}) failed")]
pub struct AllocError {
    /// Requested size in bytes.
    pub size: usize,
    /// Requested alignment in bytes.
    pub align: usize,
}

impl AllocError {
    pub(crate) fn for_layout(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

/// The memory backend for engine-created components.
///
/// Implementations never see zero-sized layouts; the component layer handles
/// those without touching the allocator.
pub trait Allocator: Send + Sync {
    /// Allocates a block for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the backend cannot satisfy the request.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Returns a block previously handed out by [`Allocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this same allocator
    /// with an identical `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocator backed by `std::alloc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalAllocator;

impl Allocator for GlobalAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0, "zero-sized layouts bypass the allocator");
        // SAFETY: layout has nonzero size, checked above.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::for_layout(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract — ptr came from `alloc` with `layout`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Wraps another allocator and counts outstanding allocations.
///
/// `live()` returning zero after a scenario proves every engine-created
/// component was released.
#[derive(Clone)]
pub struct CountingAllocator {
    inner: Arc<dyn Allocator>,
    live: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl CountingAllocator {
    /// Wraps `inner` with counters starting at zero.
    #[must_use]
    pub fn new(inner: Arc<dyn Allocator>) -> Self {
        Self {
            inner,
            live: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of allocations not yet deallocated.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Number of allocations performed over the allocator's lifetime.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new(Arc::new(GlobalAllocator))
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        self.live.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        // SAFETY: forwarded contract.
        unsafe { self.inner.deallocate(ptr, layout) };
    }
}
