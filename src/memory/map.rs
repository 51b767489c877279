//! Scoped map guard.

use super::block::Memory;
use crate::flags::MapFlags;
use std::ops::Deref;

/// An active map of a memory block.
///
/// Produced by [`Memory::map`]. The guard holds its own reference to the
/// block and the storage's map lock; dropping it (or calling
/// [`unmap`](MapInfo::unmap)) runs the allocator's unmap hook and releases
/// the lock. A map therefore cannot outlive its unmap, and unmapping twice
/// is impossible.
///
/// The view covers the block's valid data, `[offset, offset + size)`.
pub struct MapInfo {
    memory: Memory,
    flags: MapFlags,
}

impl MapInfo {
    pub(crate) fn new(memory: Memory, flags: MapFlags) -> Self {
        Self { memory, flags }
    }

    /// Access this map was taken with.
    #[inline]
    pub fn flags(&self) -> MapFlags {
        self.flags
    }

    /// Number of valid bytes in the view.
    #[inline]
    pub fn size(&self) -> usize {
        self.memory.size()
    }

    /// Bytes from the start of the view to the end of the storage.
    #[inline]
    pub fn maxsize(&self) -> usize {
        self.memory.maxsize() - self.memory.offset()
    }

    /// The mapped block.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Pointer to the first valid byte.
    pub fn as_ptr(&self) -> *const u8 {
        // SAFETY: offset <= maxsize, so this stays within the region.
        unsafe { self.memory.storage().as_ptr().add(self.memory.offset()) }
    }

    /// The valid data.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: We hold the map lock; the window is inside the storage and
        // cannot change while this guard holds a reference to the block.
        unsafe {
            self.memory
                .storage()
                .slice(self.memory.offset(), self.memory.size())
        }
    }

    /// The valid data, writable. `None` unless mapped with
    /// [`WRITE`](MapFlags::WRITE).
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if !self.flags.contains(MapFlags::WRITE) {
            return None;
        }

        // SAFETY: The write lock is exclusive over the storage and `&mut
        // self` rules out other views through this guard.
        Some(unsafe {
            self.memory
                .storage()
                .slice_mut(self.memory.offset(), self.memory.size())
        })
    }

    /// Storage-relative view, used to reach prefix and padding bytes.
    pub(crate) fn region(&self, start: usize, len: usize) -> &[u8] {
        assert!(
            start + len <= self.memory.maxsize(),
            "region exceeds storage bounds"
        );
        // SAFETY: Bounds checked above; the map lock is held.
        unsafe { self.memory.storage().slice(start, len) }
    }

    /// Unmap now. Equivalent to dropping the guard.
    pub fn unmap(self) {}
}

impl Drop for MapInfo {
    fn drop(&mut self) {
        self.memory.allocator().unmap(&self.memory);
        self.memory.storage().lock().unlock(self.flags);
        tracing::trace!(storage = self.memory.storage().id(), flags = ?self.flags, "memory unmapped");
    }
}

impl Deref for MapInfo {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for MapInfo {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for MapInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapInfo")
            .field("flags", &self.flags)
            .field("size", &self.size())
            .field("maxsize", &self.maxsize())
            .finish()
    }
}
