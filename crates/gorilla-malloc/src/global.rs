//! `#[global_allocator]` support.
//!
//! Wraps one lazily created [`Heap`] in a spin lock:
//!
//! ```rust,ignore
//! use gorilla_malloc::GorillaAlloc;
//!
//! #[global_allocator]
//! static GLOBAL: GorillaAlloc = GorillaAlloc::new();
//! ```

use core::alloc::{GlobalAlloc, Layout};
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::{Mutex, MutexGuard};

use crate::config::HeapConfig;
use crate::heap::Heap;
use crate::util::MIN_ALIGN;

const UNINIT: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// A thread-safe allocator: one [`Heap`] behind a spin lock, created on
/// first use. Construction reads the `GORILLA_*` environment knobs through
/// the allocation-free parser, so it is safe even when this *is* the global
/// allocator.
pub struct GorillaAlloc {
    init: AtomicU8,
    heap: MaybeUninit<Mutex<Heap>>,
}

impl GorillaAlloc {
    pub const fn new() -> Self {
        GorillaAlloc {
            init: AtomicU8::new(UNINIT),
            heap: MaybeUninit::uninit(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Heap> {
        match self
            .init
            .compare_exchange(UNINIT, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let slot = self.heap.as_ptr() as *mut Mutex<Heap>;
                unsafe { slot.write(Mutex::new(Heap::with_config(HeapConfig::from_env()))) };
                self.init.store(READY, Ordering::Release);
            }
            Err(INITIALIZING) => {
                while self.init.load(Ordering::Acquire) == INITIALIZING {
                    core::hint::spin_loop();
                }
            }
            Err(_) => {}
        }

        unsafe { (*self.heap.as_ptr()).lock() }
    }
}

impl Default for GorillaAlloc {
    fn default() -> Self {
        GorillaAlloc::new()
    }
}

unsafe impl GlobalAlloc for GorillaAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        let align = layout.align();

        // Zero-size types: a well-aligned dangling pointer, the pattern the
        // standard library itself uses.
        if size == 0 {
            return align as *mut u8;
        }

        let mut heap = self.lock();
        if align <= MIN_ALIGN {
            heap.alloc(size)
        } else {
            heap.alloc_aligned(size, align)
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.alloc(layout);
        // Recycled arena blocks may hold stale bytes, so zero explicitly
        // even though fresh mappings arrive zeroed.
        if !ptr.is_null() {
            ptr::write_bytes(ptr, 0, layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        self.lock().dealloc(ptr);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        let align = layout.align();

        // The old allocation was zero-sized, so this is a fresh allocation.
        if old_size == 0 {
            return self.alloc(Layout::from_size_align_unchecked(new_size, align));
        }

        // GlobalAlloc's contract guarantees new_size > 0 here.
        debug_assert!(new_size > 0);

        if align <= MIN_ALIGN {
            return self.lock().realloc(ptr, new_size);
        }

        // Over-aligned realloc: the heap's realloc only preserves MIN_ALIGN,
        // so go through alloc_aligned and copy.
        let mut heap = self.lock();
        let new_ptr = heap.alloc_aligned(new_size, align);
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(ptr, new_ptr, old_size.min(new_size));
            heap.dealloc(ptr);
        }
        new_ptr
    }
}
