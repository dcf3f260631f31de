//! C-callable facade over [`Heap`].
//!
//! Every function keeps the classic null-returning allocator contract:
//! allocation failure is a null pointer, never a panic across the FFI
//! boundary. Handles are heap-allocated `Heap` values; a null handle makes
//! every call a no-op.

use core::ffi::c_void;
use core::ptr;

use crate::config::HeapConfig;
use crate::heap::Heap;

/// Opaque handle for the C surface.
pub type GorillaHeap = Heap;

/// Create a heap configured from the `GORILLA_*` environment variables.
#[no_mangle]
pub extern "C" fn gorilla_heap_init() -> *mut GorillaHeap {
    Box::into_raw(Box::new(Heap::with_config(HeapConfig::from_env())))
}

/// Destroy a heap, releasing every region it still owns. Returns 0
/// unconditionally, whether or not allocations were still outstanding.
///
/// # Safety
/// `heap` must be null or a handle from `gorilla_heap_init` that has not
/// been destroyed. Every pointer the heap vended is invalidated.
#[no_mangle]
pub unsafe extern "C" fn gorilla_heap_destroy(heap: *mut GorillaHeap) -> libc::c_int {
    if !heap.is_null() {
        drop(Box::from_raw(heap));
    }
    0
}

/// Allocate `size` bytes from `heap`. Null on failure.
///
/// # Safety
/// `heap` must be a live handle, used from one thread at a time.
#[no_mangle]
pub unsafe extern "C" fn gorilla_malloc(heap: *mut GorillaHeap, size: usize) -> *mut c_void {
    match heap.as_mut() {
        Some(heap) => heap.alloc(size) as *mut c_void,
        None => ptr::null_mut(),
    }
}

/// Release a pointer previously returned by this heap. Null is a no-op.
///
/// # Safety
/// `ptr` must be null or a live pointer vended by `heap`.
#[no_mangle]
pub unsafe extern "C" fn gorilla_free(heap: *mut GorillaHeap, ptr: *mut c_void) {
    if let Some(heap) = heap.as_mut() {
        heap.dealloc(ptr as *mut u8);
    }
}

/// Resize an allocation. Returns the (possibly moved) pointer, null on
/// failure with the original allocation intact, or null after
/// `gorilla_realloc(heap, ptr, 0)`, which frees the pointer.
///
/// # Safety
/// `ptr` must be null or a live pointer vended by `heap`; if the call
/// returns a different pointer the old one is invalidated.
#[no_mangle]
pub unsafe extern "C" fn gorilla_realloc(
    heap: *mut GorillaHeap,
    ptr: *mut c_void,
    size: usize,
) -> *mut c_void {
    match heap.as_mut() {
        Some(heap) => heap.realloc(ptr as *mut u8, size) as *mut c_void,
        None => ptr::null_mut(),
    }
}

/// Walk the heap's outstanding allocations. Pass null to get the first
/// in-use pointer, or a previously returned pointer to get the one after
/// it; null marks the end of the walk. A heap with no outstanding
/// allocations returns null immediately.
///
/// # Safety
/// `heap` must be a live handle and must not be mutated between the calls
/// of one walk.
#[no_mangle]
pub unsafe extern "C" fn gorilla_check_leaks(
    heap: *mut GorillaHeap,
    cursor: *mut c_void,
) -> *mut c_void {
    match heap.as_ref() {
        Some(heap) => heap.leak_after(cursor as *mut u8) as *mut c_void,
        None => ptr::null_mut(),
    }
}
