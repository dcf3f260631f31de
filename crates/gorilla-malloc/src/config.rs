use crate::util::{DEFAULT_ARENA_PAGES, DEFAULT_LARGE_CUTOFF_PAGES};

/// Per-heap policy knobs. All sizes that depend on the page size are
/// expressed in pages and resolved against the heap's page-size snapshot
/// at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena region granularity in pages. Fresh arena regions are rounded
    /// up to a multiple of this.
    pub arena_pages: usize,
    /// Large-block cutoff in bytes. 0 means "derive from the page size"
    /// (DEFAULT_LARGE_CUTOFF_PAGES pages). A block whose total size exceeds
    /// the cutoff gets its own dedicated region.
    pub large_cutoff: usize,
    /// Release an arena region back to the OS as soon as it is completely
    /// free again. Off by default: an empty region is kept for reuse, which
    /// also makes address-reuse behavior deterministic instead of depending
    /// on where the kernel maps the replacement.
    pub release_empty_regions: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            arena_pages: DEFAULT_ARENA_PAGES,
            large_cutoff: 0,
            release_empty_regions: false,
        }
    }
}

impl HeapConfig {
    /// Read overrides from the environment:
    /// `GORILLA_ARENA_PAGES`, `GORILLA_LARGE_CUTOFF` (bytes),
    /// `GORILLA_RELEASE_EMPTY` (presence enables).
    ///
    /// Parsing goes through `libc::getenv` directly and never allocates, so
    /// this is callable from inside a `#[global_allocator]` code path.
    pub fn from_env() -> Self {
        let mut config = HeapConfig::default();
        unsafe {
            if let Some(val) = getenv_usize(b"GORILLA_ARENA_PAGES\0") {
                if val > 0 {
                    config.arena_pages = val;
                }
            }
            if let Some(val) = getenv_usize(b"GORILLA_LARGE_CUTOFF\0") {
                config.large_cutoff = val;
            }
            let key = b"GORILLA_RELEASE_EMPTY\0".as_ptr() as *const libc::c_char;
            if !libc::getenv(key).is_null() {
                config.release_empty_regions = true;
            }
        }
        config
    }

    /// Resolve the large cutoff against a concrete page size.
    pub(crate) fn resolved_large_cutoff(&self, page_size: usize) -> usize {
        if self.large_cutoff == 0 {
            DEFAULT_LARGE_CUTOFF_PAGES * page_size
        } else {
            self.large_cutoff
        }
    }
}

/// Parse an environment variable as a usize, without allocating.
///
/// # Safety
/// Calls libc::getenv; `key` must be NUL-terminated.
unsafe fn getenv_usize(key: &[u8]) -> Option<usize> {
    let val = libc::getenv(key.as_ptr() as *const libc::c_char);
    if val.is_null() {
        return None;
    }

    let mut result: usize = 0;
    let mut ptr = val as *const u8;
    loop {
        let byte = *ptr;
        if byte == 0 {
            break;
        }
        if !byte.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add((byte - b'0') as usize)?;
        ptr = ptr.add(1);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HeapConfig::default();
        assert_eq!(config.arena_pages, DEFAULT_ARENA_PAGES);
        assert_eq!(config.large_cutoff, 0);
        assert!(!config.release_empty_regions);
    }

    #[test]
    fn cutoff_resolution() {
        let config = HeapConfig::default();
        assert_eq!(config.resolved_large_cutoff(4096), 4 * 4096);

        let explicit = HeapConfig {
            large_cutoff: 1 << 20,
            ..HeapConfig::default()
        };
        assert_eq!(explicit.resolved_large_cutoff(4096), 1 << 20);
    }

    #[test]
    fn env_overrides() {
        // Serialized by the test runner within this module; no other test
        // touches these variables.
        std::env::set_var("GORILLA_ARENA_PAGES", "16");
        std::env::set_var("GORILLA_LARGE_CUTOFF", "65536");
        std::env::set_var("GORILLA_RELEASE_EMPTY", "1");

        let config = HeapConfig::from_env();
        assert_eq!(config.arena_pages, 16);
        assert_eq!(config.large_cutoff, 65536);
        assert!(config.release_empty_regions);

        std::env::remove_var("GORILLA_ARENA_PAGES");
        std::env::remove_var("GORILLA_LARGE_CUTOFF");
        std::env::remove_var("GORILLA_RELEASE_EMPTY");

        let config = HeapConfig::from_env();
        assert_eq!(config.arena_pages, DEFAULT_ARENA_PAGES);

        std::env::set_var("GORILLA_ARENA_PAGES", "not-a-number");
        let config = HeapConfig::from_env();
        assert_eq!(config.arena_pages, DEFAULT_ARENA_PAGES);
        std::env::remove_var("GORILLA_ARENA_PAGES");
    }
}
