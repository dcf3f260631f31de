use core::mem;
use core::ptr::{self, NonNull};

use log::debug;
use static_assertions::const_assert;

use crate::block::{BlockHeader, BlockState, BLOCK_HEADER_SIZE, MIN_PAYLOAD};
use crate::platform;
use crate::util::{align_up, MIN_ALIGN};

/// In-band region header, placed at the page-aligned base of every mapping.
/// The registry is an intrusive doubly linked list threaded through these
/// headers, so the allocator needs no auxiliary storage of its own.
#[repr(C)]
pub(crate) struct RegionHeader {
    pub prev: *mut RegionHeader,
    pub next: *mut RegionHeader,
    /// Mapped length in bytes. Always a whole multiple of the page size.
    pub len: usize,
    pub kind: RegionKind,
}

/// Classification of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegionKind {
    /// Subdivided into a chain of adjacent, coalescable blocks.
    Arena,
    /// Holds exactly one block; released to the OS as a unit.
    Large,
}

/// Overhead of the region header, rounded so the first block header (and
/// with it every payload) keeps `MIN_ALIGN`.
pub(crate) const REGION_HEADER_SIZE: usize = align_up(mem::size_of::<RegionHeader>(), MIN_ALIGN);

const_assert!(REGION_HEADER_SIZE % MIN_ALIGN == 0);

impl RegionHeader {
    /// One-past-the-end address of the mapping.
    #[inline]
    pub unsafe fn end(this: NonNull<RegionHeader>) -> *mut u8 {
        (this.as_ptr() as *mut u8).add(this.as_ref().len)
    }

    /// The first block header, directly after the region header.
    #[inline]
    pub unsafe fn first_block(this: NonNull<RegionHeader>) -> NonNull<BlockHeader> {
        let base = (this.as_ptr() as *mut u8).add(REGION_HEADER_SIZE);
        NonNull::new_unchecked(base as *mut BlockHeader)
    }

    /// Bytes available for blocks (mapped length minus the region header).
    #[inline]
    pub unsafe fn capacity(this: NonNull<RegionHeader>) -> usize {
        this.as_ref().len - REGION_HEADER_SIZE
    }
}

/// Map a fresh arena region able to hold a block of `min_block_bytes`,
/// rounded up to the arena granularity. The whole capacity is initialized
/// as a single free block, which the caller is expected to index.
pub(crate) unsafe fn map_arena(
    min_block_bytes: usize,
    granularity: usize,
) -> Option<(NonNull<RegionHeader>, NonNull<BlockHeader>)> {
    let raw = REGION_HEADER_SIZE.checked_add(min_block_bytes)?;
    let len = raw.checked_add(granularity - 1)? / granularity * granularity;

    let base = platform::map_anonymous(len);
    let region = NonNull::new(base as *mut RegionHeader)?;

    region.as_ptr().write(RegionHeader {
        prev: ptr::null_mut(),
        next: ptr::null_mut(),
        len,
        kind: RegionKind::Arena,
    });

    let block = RegionHeader::first_block(region);
    let capacity = RegionHeader::capacity(region);
    block.as_ptr().write(BlockHeader {
        region,
        prev_phys: ptr::null_mut(),
        total: capacity,
        payload: 0,
        state: BlockState::Free,
    });

    debug!("mapped arena region {:p}, {} bytes", base, len);
    Some((region, block))
}

/// Map a dedicated region for one large allocation of `n` payload bytes.
/// The single block is initialized in-use and spans the whole capacity.
pub(crate) unsafe fn map_large(
    n: usize,
    page_size: usize,
) -> Option<(NonNull<RegionHeader>, NonNull<BlockHeader>)> {
    let payload = if n < MIN_PAYLOAD { MIN_PAYLOAD } else { n };
    let raw = REGION_HEADER_SIZE
        .checked_add(BLOCK_HEADER_SIZE)?
        .checked_add(payload)?;
    let len = raw.checked_add(page_size - 1)? & !(page_size - 1);

    let base = platform::map_anonymous(len);
    let region = NonNull::new(base as *mut RegionHeader)?;

    region.as_ptr().write(RegionHeader {
        prev: ptr::null_mut(),
        next: ptr::null_mut(),
        len,
        kind: RegionKind::Large,
    });

    let block = RegionHeader::first_block(region);
    block.as_ptr().write(BlockHeader {
        region,
        prev_phys: ptr::null_mut(),
        total: RegionHeader::capacity(region),
        payload: n,
        state: BlockState::InUse,
    });

    debug!("mapped large region {:p}, {} bytes", base, len);
    Some((region, block))
}

/// Return a region's pages to the OS. The caller must already have unlinked
/// it from the registry and dropped every reference into it.
pub(crate) unsafe fn unmap_region(region: NonNull<RegionHeader>) {
    let len = region.as_ref().len;
    debug!("unmapping region {:p}, {} bytes", region.as_ptr(), len);
    platform::unmap(region.as_ptr() as *mut u8, len);
}

/// The registry: an intrusive list of every region a heap currently owns.
/// Append order is preserved, which gives leak reports a stable order.
pub(crate) struct RegionList {
    head: *mut RegionHeader,
    tail: *mut RegionHeader,
    len: usize,
}

impl RegionList {
    pub const fn new() -> Self {
        RegionList {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn first(&self) -> Option<NonNull<RegionHeader>> {
        NonNull::new(self.head)
    }

    pub unsafe fn push_back(&mut self, mut region: NonNull<RegionHeader>) {
        let node = region.as_mut();
        node.prev = self.tail;
        node.next = ptr::null_mut();
        if self.tail.is_null() {
            self.head = region.as_ptr();
        } else {
            (*self.tail).next = region.as_ptr();
        }
        self.tail = region.as_ptr();
        self.len += 1;
    }

    pub unsafe fn unlink(&mut self, region: NonNull<RegionHeader>) {
        let node = region.as_ref();
        if node.prev.is_null() {
            self.head = node.next;
        } else {
            (*node.prev).next = node.next;
        }
        if node.next.is_null() {
            self.tail = node.prev;
        } else {
            (*node.next).prev = node.prev;
        }
        self.len -= 1;
    }

    pub fn iter(&self) -> RegionIter {
        RegionIter { cursor: self.head }
    }
}

pub(crate) struct RegionIter {
    cursor: *mut RegionHeader,
}

impl Iterator for RegionIter {
    type Item = NonNull<RegionHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        let region = NonNull::new(self.cursor)?;
        self.cursor = unsafe { region.as_ref().next };
        Some(region)
    }
}
