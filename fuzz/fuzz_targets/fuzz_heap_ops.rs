#![no_main]

use gorilla_malloc::Heap;
use libfuzzer_sys::fuzz_target;

/// Fuzz target that interprets a byte slice as a sequence of heap operations.
///
/// Each operation is encoded as:
///   byte 0: opcode (0=alloc, 1=free, 2=realloc)
///   byte 1-2: size (little-endian u16)
///   byte 3: slot index (which tracked pointer to operate on)
///
/// We track up to 64 live pointers and verify a write pattern survives.
const MAX_SLOTS: usize = 64;

fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    let mut slots: [*mut u8; MAX_SLOTS] = [std::ptr::null_mut(); MAX_SLOTS];
    let mut sizes: [usize; MAX_SLOTS] = [0; MAX_SLOTS];

    let mut i = 0;
    while i + 4 <= data.len() {
        let opcode = data[i] % 3;
        let size = u16::from_le_bytes([data[i + 1], data[i + 2]]) as usize;
        let slot = (data[i + 3] as usize) % MAX_SLOTS;
        i += 4;

        unsafe {
            match opcode {
                0 => {
                    if !slots[slot].is_null() {
                        heap.dealloc(slots[slot]);
                    }
                    let ptr = heap.alloc(size);
                    slots[slot] = ptr;
                    sizes[slot] = size;
                    if !ptr.is_null() && size > 0 {
                        let touch = size.min(256);
                        std::ptr::write_bytes(ptr, 0xAA, touch);
                        for j in 0..touch {
                            assert_eq!(*ptr.add(j), 0xAA);
                        }
                    }
                }
                1 => {
                    if !slots[slot].is_null() {
                        heap.dealloc(slots[slot]);
                        slots[slot] = std::ptr::null_mut();
                        sizes[slot] = 0;
                    }
                }
                2 => {
                    if !slots[slot].is_null() {
                        let old = sizes[slot].min(size).min(256);
                        std::ptr::write_bytes(slots[slot], 0xBB, sizes[slot].min(256));
                        let ptr = heap.realloc(slots[slot], size);
                        if !ptr.is_null() {
                            for j in 0..old {
                                assert_eq!(*ptr.add(j), 0xBB, "byte lost across realloc");
                            }
                            slots[slot] = ptr;
                            sizes[slot] = size;
                        } else if size == 0 {
                            slots[slot] = std::ptr::null_mut();
                            sizes[slot] = 0;
                        }
                        // Null for non-zero size: original still valid.
                    } else {
                        let ptr = heap.realloc(std::ptr::null_mut(), size);
                        slots[slot] = ptr;
                        sizes[slot] = size;
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    // Cleanup and invariant sweep.
    unsafe {
        for slot in &mut slots {
            if !slot.is_null() {
                heap.dealloc(*slot);
                *slot = std::ptr::null_mut();
            }
        }
    }
    assert!(heap.leaks().next().is_none());
    assert!(heap.check_consistency().is_consistent());
});
