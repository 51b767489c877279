//! Lock-free reader/writer lock guarding map access to a storage region.

use crate::flags::MapFlags;
use std::sync::atomic::{AtomicU32, Ordering};

/// High bit marks an exclusive (write) holder; the low bits count readers.
const WRITER: u32 = 1 << 31;

/// Largest reader count the lock can hold.
const MAX_READERS: u32 = WRITER - 1;

/// Map lock shared by every block that views the same storage.
///
/// Any number of read maps may be held at once. A write map excludes every
/// other map. Acquisition never blocks: a conflicting request fails and the
/// caller reports the map as refused.
pub(crate) struct MapLock {
    state: AtomicU32,
}

impl MapLock {
    /// Create an unlocked map lock.
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
        }
    }

    /// Try to lock for the given access.
    ///
    /// Returns `false` if the request conflicts with a current holder.
    pub(crate) fn try_lock(&self, flags: MapFlags) -> bool {
        if flags.is_exclusive() {
            return self
                .state
                .compare_exchange(0, WRITER, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok();
        }

        loop {
            let current = self.state.load(Ordering::Relaxed);
            if current & WRITER != 0 || current == MAX_READERS {
                return false;
            }

            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(_) => continue, // Another reader raced us; retry
            }
        }
    }

    /// Release a lock previously taken with the same flags.
    pub(crate) fn unlock(&self, flags: MapFlags) {
        if flags.is_exclusive() {
            let prev = self.state.swap(0, Ordering::Release);
            debug_assert_eq!(prev, WRITER, "write unlock without write lock");
        } else {
            let prev = self.state.fetch_sub(1, Ordering::Release);
            debug_assert!(
                (prev & !WRITER) > 0 && (prev & WRITER) == 0,
                "read unlock without read lock"
            );
        }
    }

    /// Number of read maps currently held.
    #[cfg(test)]
    pub(crate) fn readers(&self) -> u32 {
        let state = self.state.load(Ordering::Relaxed);
        if state & WRITER != 0 { 0 } else { state }
    }

    /// Whether a write map is currently held.
    #[cfg(test)]
    pub(crate) fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & WRITER != 0
    }
}
