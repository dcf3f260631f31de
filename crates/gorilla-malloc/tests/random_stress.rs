//! Seeded randomized stress: 128 slots churned through allocate, reallocate
//! and free, with sizes drawn from a mixture spanning a word up to eight
//! pages. Every live payload is filled with self-referential word marks so
//! any cross-block corruption or lost byte on a moving realloc is caught at
//! the next touch.

use core::ptr;

use gorilla_malloc::{Heap, HeapConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

const SLOTS: usize = 128;
const SEED: u64 = 1728263374;
const WORD: usize = core::mem::size_of::<usize>();

#[cfg(debug_assertions)]
const ROUNDS: usize = 1 << 16;
#[cfg(not(debug_assertions))]
const ROUNDS: usize = 1 << 20;

/// Draw a size from the mixture: 40% word..256, 20% 256..page,
/// 20% page..4 pages, 20% 4..8 pages, rounded down to a word.
fn random_size(rng: &mut StdRng, page: usize) -> usize {
    let p: f64 = rng.gen();
    let (lo, hi) = if p >= 0.8 {
        (page * 4, page * 8)
    } else if p >= 0.6 {
        (page, page * 4)
    } else if p >= 0.4 {
        (256, page)
    } else {
        (WORD, 256)
    };
    rng.gen_range(lo..=hi) / WORD * WORD
}

/// Write each word of the payload as its own address.
unsafe fn mark(ptr: *mut u8, size: usize) {
    let base = ptr as *mut usize;
    for i in 0..size / WORD {
        base.add(i).write(base.add(i) as usize);
    }
}

/// Verify every marked word still holds its own address.
unsafe fn marks_intact(ptr: *mut u8, size: usize) -> bool {
    let base = ptr as *mut usize;
    (0..size / WORD).all(|i| base.add(i).read() == base.add(i) as usize)
}

unsafe fn storm(heap: &mut Heap, rounds: usize, check_every: usize) {
    let page = heap.page_size();
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut slots: [(*mut u8, usize); SLOTS] = [(ptr::null_mut(), 0); SLOTS];

    for round in 0..rounds {
        let slot = rng.gen_range(0..SLOTS);
        let size = random_size(&mut rng, page);
        let resize: bool = rng.gen();

        let (live, old_size) = slots[slot];
        if live.is_null() {
            let p = heap.alloc(size);
            assert!(!p.is_null(), "round {}: alloc({}) failed", round, size);
            mark(p, size);
            slots[slot] = (p, size);
        } else if resize {
            assert!(
                marks_intact(live, old_size),
                "round {}: payload corrupted before realloc",
                round
            );
            let p = heap.realloc(live, size);
            assert!(!p.is_null(), "round {}: realloc({}) failed", round, size);
            mark(p, size);
            slots[slot] = (p, size);
        } else {
            assert!(
                marks_intact(live, old_size),
                "round {}: payload corrupted before free",
                round
            );
            heap.dealloc(live);
            slots[slot] = (ptr::null_mut(), 0);
        }

        if round % check_every == 0 {
            let report = heap.check_consistency();
            assert!(report.is_consistent(), "round {}: {:?}", round, report);
        }
    }

    for (live, size) in slots.iter_mut() {
        if !live.is_null() {
            assert!(marks_intact(*live, *size));
            heap.dealloc(*live);
            *live = ptr::null_mut();
        }
    }
}

#[test]
fn randomized_allocation_storm() {
    let mut heap = Heap::new();
    unsafe {
        storm(&mut heap, ROUNDS, 1 << 16);
    }
    assert!(heap.leaks().next().is_none());
    assert!(heap.check_consistency().is_consistent());
    assert_eq!(heap.stats().live_blocks, 0);
}

#[test]
fn randomized_storm_with_region_release() {
    let mut heap = Heap::with_config(HeapConfig {
        release_empty_regions: true,
        ..HeapConfig::default()
    });
    unsafe {
        storm(&mut heap, 1 << 14, 1 << 12);
    }
    assert!(heap.leaks().next().is_none());
    assert!(heap.check_consistency().is_consistent());
}
