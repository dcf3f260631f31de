#![no_main]

use gorilla_malloc::Heap;
use libfuzzer_sys::fuzz_target;

/// Fuzz target over raw size sequences: allocate every decoded size, then
/// free in reverse, checking alignment and usable-size promises throughout.
fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    let mut live = Vec::new();

    for chunk in data.chunks_exact(3) {
        // 0..=2^18, biased toward small sizes like real workloads.
        let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], 0]) as usize;
        let size = raw & 0x3FFFF;

        unsafe {
            let ptr = heap.alloc(size);
            if ptr.is_null() {
                continue;
            }
            assert_eq!(ptr as usize % gorilla_malloc::MIN_ALIGN, 0);
            assert!(heap.usable_size(ptr) >= size);
            live.push(ptr);
        }
    }

    unsafe {
        while let Some(ptr) = live.pop() {
            heap.dealloc(ptr);
        }
    }
    assert!(heap.leaks().next().is_none());
    assert!(heap.check_consistency().is_consistent());
});
