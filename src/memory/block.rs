//! The reference-counted memory block handle.

use super::map::MapInfo;
use super::storage::{DestroyNotify, Storage};
use crate::allocator::{self, Allocation, AllocationParams, Allocator, registry};
use crate::defaults::WRAPPED_ALIGNMENT;
use crate::error::{Error, Result};
use crate::flags::{MapFlags, MemoryFlags};
use crate::observability;
use bytes::Bytes;
use std::sync::{Arc, Weak};

/// A reference-counted handle to a windowed region of bytes.
///
/// A block views `[offset, offset + size)` of a storage region that is
/// `maxsize` bytes long. Offsets are relative to the storage, so blocks made
/// with [`share`](Memory::share) report the same `maxsize` as their parent.
///
/// `Memory` is an ownership token: it is not `Clone`. Take another reference
/// with [`acquire`](Memory::acquire) and give one back with
/// [`release`](Memory::release) or by dropping it. When the last reference
/// goes away the block is destroyed, and once no block views the storage any
/// more the storage is freed (running its destroy notification, if any).
///
/// # Example
///
/// ```rust
/// use memblock::{MapFlags, Memory, MemoryFlags};
///
/// let mem = Memory::new_wrapped(MemoryFlags::empty(), b"0123456789".to_vec(), 10, 0, 10)
///     .expect("valid window");
/// assert_eq!(mem.size(), 10);
///
/// let map = mem.map(MapFlags::READ).expect("readable");
/// assert_eq!(&map[..], b"0123456789");
/// ```
pub struct Memory {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    storage: Arc<Storage>,
    allocator: Arc<dyn Allocator>,
    /// Root block this one was shared from. Not kept alive by us.
    parent: Option<Weak<MemoryInner>>,
    flags: MemoryFlags,
    align: usize,
    offset: usize,
    size: usize,
}

impl Drop for MemoryInner {
    fn drop(&mut self) {
        tracing::trace!(
            storage = self.storage.id(),
            offset = self.offset,
            size = self.size,
            "memory freed"
        );
        observability::record_free(self.allocator.mem_type());
    }
}

impl Memory {
    /// Wrap `data` as a memory block.
    ///
    /// The first `maxsize` bytes of `data` form the region and
    /// `[offset, offset + size)` is the valid data. With
    /// [`ZERO_PREFIXED`](MemoryFlags::ZERO_PREFIXED) the bytes before
    /// `offset` are zeroed, with [`ZERO_PADDED`](MemoryFlags::ZERO_PADDED)
    /// the bytes after the valid data are zeroed.
    ///
    /// Returns `None` if the window does not fit.
    pub fn new_wrapped(
        flags: MemoryFlags,
        data: impl Into<Vec<u8>>,
        maxsize: usize,
        offset: usize,
        size: usize,
    ) -> Option<Self> {
        Self::wrap(flags, data.into(), maxsize, offset, size, None)
            .inspect_err(|e| tracing::debug!(error = %e, "wrapping memory failed"))
            .ok()
    }

    /// Wrap `data` and register a callback that gets it back on destruction.
    ///
    /// `notify` runs once, after the last block viewing the data (including
    /// blocks made with [`share`](Memory::share)) is destroyed. If wrapping
    /// fails the callback is dropped without running and `data` is freed.
    pub fn new_wrapped_full<F>(
        flags: MemoryFlags,
        data: impl Into<Vec<u8>>,
        maxsize: usize,
        offset: usize,
        size: usize,
        notify: F,
    ) -> Option<Self>
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        Self::wrap(flags, data.into(), maxsize, offset, size, Some(Box::new(notify)))
            .inspect_err(|e| tracing::debug!(error = %e, "wrapping memory failed"))
            .ok()
    }

    /// Like [`new_wrapped`](Memory::new_wrapped), reporting why wrapping
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] if `offset + size > maxsize` or
    /// `maxsize > data.len()`.
    pub fn try_new_wrapped(
        flags: MemoryFlags,
        data: impl Into<Vec<u8>>,
        maxsize: usize,
        offset: usize,
        size: usize,
    ) -> Result<Self> {
        Self::wrap(flags, data.into(), maxsize, offset, size, None)
    }

    fn wrap(
        flags: MemoryFlags,
        mut data: Vec<u8>,
        maxsize: usize,
        offset: usize,
        size: usize,
        notify: Option<DestroyNotify>,
    ) -> Result<Self> {
        let end = offset.checked_add(size).ok_or(Error::SizeOverflow)?;
        if end > maxsize || maxsize > data.len() {
            return Err(Error::InvalidWindow {
                offset,
                size,
                maxsize: maxsize.min(data.len()),
            });
        }

        if flags.contains(MemoryFlags::ZERO_PREFIXED) {
            data[..offset].fill(0);
        }
        if flags.contains(MemoryFlags::ZERO_PADDED) {
            data[end..maxsize].fill(0);
        }

        let storage = Storage::from_vec(data, maxsize, notify)?;
        let allocator = registry::system_allocator();
        observability::record_alloc(allocator.mem_type(), maxsize);

        Ok(Self::from_parts(
            Arc::new(storage),
            allocator,
            None,
            flags,
            WRAPPED_ALIGNMENT,
            offset,
            size,
        ))
    }

    /// Allocate a block of `size` bytes.
    ///
    /// Uses `allocator`, or the registry's default allocator when `None`.
    ///
    /// # Errors
    ///
    /// Returns whatever the allocator reports.
    pub fn alloc(
        allocator: Option<&Arc<dyn Allocator>>,
        size: usize,
        params: &AllocationParams,
    ) -> Result<Self> {
        allocator::alloc(allocator, size, params)
    }

    /// Build a block from an allocator's result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] if the allocation's window does not
    /// fit its storage.
    pub fn from_allocation(allocator: Arc<dyn Allocator>, allocation: Allocation) -> Result<Self> {
        let Allocation {
            storage,
            offset,
            size,
            align,
            flags,
        } = allocation;

        let maxsize = storage.len();
        if offset.checked_add(size).is_none_or(|end| end > maxsize) {
            return Err(Error::InvalidWindow {
                offset,
                size,
                maxsize,
            });
        }

        observability::record_alloc(allocator.mem_type(), maxsize);
        tracing::trace!(
            mem_type = allocator.mem_type(),
            storage = storage.id(),
            maxsize,
            offset,
            size,
            "memory allocated"
        );

        Ok(Self::from_parts(
            Arc::new(storage),
            allocator,
            None,
            flags,
            align,
            offset,
            size,
        ))
    }

    fn from_parts(
        storage: Arc<Storage>,
        allocator: Arc<dyn Allocator>,
        parent: Option<Weak<MemoryInner>>,
        flags: MemoryFlags,
        align: usize,
        offset: usize,
        size: usize,
    ) -> Self {
        observability::record_block_created(allocator.mem_type());
        Self {
            inner: Arc::new(MemoryInner {
                storage,
                allocator,
                parent,
                flags,
                align,
                offset,
                size,
            }),
        }
    }

    /// Take another reference to this block.
    pub fn acquire(&self) -> Memory {
        Memory {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give back this reference.
    ///
    /// Returns `true` if it was the last one and the block was destroyed.
    pub fn release(self) -> bool {
        Arc::into_inner(self.inner).is_some()
    }

    /// Current number of references to this block.
    ///
    /// Active [`MapInfo`] guards each hold one.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether two handles refer to the same block.
    pub fn ptr_eq(&self, other: &Memory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The block this one was shared from, if it is still alive.
    ///
    /// This block does not keep its parent alive; the returned handle is a
    /// fresh reference.
    pub fn parent(&self) -> Option<Memory> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Memory { inner })
    }

    /// The allocator that produced this block's storage.
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.inner.allocator
    }

    /// Memory type name of the allocator.
    pub fn mem_type(&self) -> &str {
        self.inner.allocator.mem_type()
    }

    /// Size of the backing region in bytes.
    #[inline]
    pub fn maxsize(&self) -> usize {
        self.inner.storage.len()
    }

    /// Alignment of the backing region in bytes.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.inner.align
    }

    /// Start of the valid data.
    #[inline]
    pub fn offset(&self) -> usize {
        self.inner.offset
    }

    /// Length of the valid data.
    #[inline]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// `(size, offset, maxsize)` in one call.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.size(), self.offset(), self.maxsize())
    }

    /// Flags of this block.
    #[inline]
    pub fn flags(&self) -> MemoryFlags {
        self.inner.flags
    }

    /// Whether all of `flags` are set.
    #[inline]
    pub fn has_flags(&self, flags: MemoryFlags) -> bool {
        self.inner.flags.contains(flags)
    }

    /// Whether [`resize`](Memory::resize) and flag changes would succeed:
    /// the block is not read-only and this is the only handle to it.
    pub fn is_writable(&self) -> bool {
        !self.has_flags(MemoryFlags::READONLY)
            && Arc::strong_count(&self.inner) == 1
            && Arc::weak_count(&self.inner) == 0
    }

    pub(crate) fn storage(&self) -> &Arc<Storage> {
        &self.inner.storage
    }

    /// Resolve a `(offset, size)` request relative to the valid data into a
    /// storage-relative `(start, len)`.
    ///
    /// `offset` may be negative to reach into the prefix. `None` size means
    /// up to the end of the valid data.
    pub(crate) fn resolve_window(&self, offset: isize, size: Option<usize>) -> Option<(usize, usize)> {
        if offset > 0 && offset.unsigned_abs() > self.size() {
            return None;
        }

        let start = self.offset().checked_add_signed(offset)?;
        let len = match size {
            Some(len) => len,
            None => (self.offset() + self.size()).checked_sub(start)?,
        };

        let end = start.checked_add(len)?;
        if end > self.maxsize() {
            return None;
        }

        Some((start, len))
    }

    /// Copy `size` bytes starting `offset` bytes into the valid data.
    ///
    /// `size = None` copies to the end of the valid data. The copy has its
    /// own storage, no parent, and is always writable.
    ///
    /// Returns `None` if `offset` is past the valid data, the window leaves
    /// the region, or the block cannot be read.
    pub fn copy(&self, offset: isize, size: Option<usize>) -> Option<Memory> {
        let copy = self.inner.allocator.copy(self, offset, size);
        if copy.is_none() {
            tracing::debug!(offset, ?size, "memory copy failed");
        }
        copy
    }

    /// Create a sub-block over the same storage without copying.
    ///
    /// Window rules match [`copy`](Memory::copy). The sub-block is
    /// read-only and its parent is this block (or this block's parent).
    ///
    /// Returns `None` for [`NO_SHARE`](MemoryFlags::NO_SHARE) blocks or an
    /// invalid window.
    pub fn share(&self, offset: isize, size: Option<usize>) -> Option<Memory> {
        if self.has_flags(MemoryFlags::NO_SHARE) {
            tracing::debug!("memory is not shareable");
            return None;
        }

        let Some((start, len)) = self.resolve_window(offset, size) else {
            tracing::debug!(offset, ?size, "share window out of range");
            return None;
        };

        let parent = match &self.inner.parent {
            Some(parent) => Weak::clone(parent),
            None => Arc::downgrade(&self.inner),
        };

        Some(Self::from_parts(
            Arc::clone(&self.inner.storage),
            Arc::clone(&self.inner.allocator),
            Some(parent),
            self.flags() | MemoryFlags::READONLY,
            self.alignment(),
            start,
            len,
        ))
    }

    /// If `other` directly follows `self` in a common parent, return
    /// `self`'s offset relative to the parent's valid data.
    pub fn is_span(&self, other: &Memory) -> Option<usize> {
        let (Some(a), Some(b)) = (&self.inner.parent, &other.inner.parent) else {
            return None;
        };
        if !Weak::ptr_eq(a, b) || !Arc::ptr_eq(self.storage(), other.storage()) {
            return None;
        }
        if self.offset() + self.size() != other.offset() {
            return None;
        }

        let parent = a.upgrade()?;
        self.offset().checked_sub(parent.offset)
    }

    /// Move the start of the valid data by `offset` and set its size.
    ///
    /// Growing the prefix clears [`ZERO_PREFIXED`](MemoryFlags::ZERO_PREFIXED),
    /// growing the padding clears [`ZERO_PADDED`](MemoryFlags::ZERO_PADDED).
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if the block is read-only or other handles,
    /// maps or sub-blocks refer to it; [`Error::InvalidWindow`] if the new
    /// window leaves the region.
    pub fn resize(&mut self, offset: isize, size: usize) -> Result<()> {
        let maxsize = self.maxsize();
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        if inner.flags.contains(MemoryFlags::READONLY) {
            return Err(Error::NotWritable);
        }

        let invalid = || Error::InvalidWindow {
            offset: inner.offset.saturating_add_signed(offset),
            size,
            maxsize,
        };
        let new_offset = inner.offset.checked_add_signed(offset).ok_or_else(invalid)?;
        if new_offset.checked_add(size).is_none_or(|end| end > maxsize) {
            return Err(invalid());
        }

        if offset > 0 {
            inner.flags.remove(MemoryFlags::ZERO_PREFIXED);
        }
        if new_offset + size < inner.offset + inner.size {
            inner.flags.remove(MemoryFlags::ZERO_PADDED);
        }

        inner.offset = new_offset;
        inner.size = size;
        Ok(())
    }

    /// Set flags on this block.
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if other handles refer to the block.
    pub fn set_flags(&mut self, flags: MemoryFlags) -> Result<()> {
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        inner.flags.insert(flags);
        Ok(())
    }

    /// Clear flags on this block.
    ///
    /// # Errors
    ///
    /// [`Error::NotWritable`] if other handles refer to the block.
    pub fn unset_flags(&mut self, flags: MemoryFlags) -> Result<()> {
        let inner = Arc::get_mut(&mut self.inner).ok_or(Error::NotWritable)?;
        inner.flags.remove(flags);
        Ok(())
    }

    /// Map the block for the requested access.
    ///
    /// Returns `None` if the block is not mappable, write access is asked of
    /// a read-only block, the allocator refuses the access, or the storage is
    /// already mapped in a conflicting way. Read maps can be held together;
    /// a write map excludes every other map of the same storage.
    ///
    /// The map stays valid until the returned guard is dropped or
    /// [`unmap`](MapInfo::unmap)ped.
    pub fn map(&self, flags: MapFlags) -> Option<MapInfo> {
        let refused = |reason: &'static str| {
            tracing::debug!(?flags, reason, "memory map refused");
            observability::record_map_failure(reason);
            None
        };

        if flags.is_empty() {
            return refused("no access requested");
        }
        if self.has_flags(MemoryFlags::NOT_MAPPABLE) {
            return refused("not mappable");
        }
        if flags.contains(MapFlags::WRITE) && self.has_flags(MemoryFlags::READONLY) {
            return refused("read-only");
        }

        let lock = self.storage().lock();
        if !lock.try_lock(flags) {
            return refused("already mapped");
        }
        if !self.inner.allocator.map(self, flags) {
            lock.unlock(flags);
            return refused("access not supported by allocator");
        }

        observability::record_map(flags);
        tracing::trace!(storage = self.storage().id(), ?flags, "memory mapped");
        Some(MapInfo::new(self.acquire(), flags))
    }

    /// Snapshot of the valid data.
    ///
    /// Empty if the block cannot be mapped for reading.
    pub fn bytes(&self) -> Bytes {
        match self.map(MapFlags::READ) {
            Some(map) => Bytes::copy_from_slice(map.as_slice()),
            None => Bytes::new(),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("mem_type", &self.mem_type())
            .field("maxsize", &self.maxsize())
            .field("align", &self.alignment())
            .field("offset", &self.offset())
            .field("size", &self.size())
            .field("flags", &self.flags())
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn wrapped(data: &[u8]) -> Memory {
        Memory::new_wrapped(MemoryFlags::empty(), data.to_vec(), data.len(), 0, data.len())
            .unwrap()
    }

    #[test]
    fn test_wrapped_reports_window() {
        let mem = Memory::new_wrapped(MemoryFlags::empty(), vec![1u8; 64], 48, 8, 32).unwrap();
        assert_eq!(mem.maxsize(), 48);
        assert_eq!(mem.offset(), 8);
        assert_eq!(mem.size(), 32);
        assert_eq!(mem.sizes(), (32, 8, 48));
        assert_eq!(mem.alignment(), WRAPPED_ALIGNMENT);
        assert!(mem.parent().is_none());
    }

    #[test]
    fn test_wrapped_invalid_window() {
        assert!(Memory::new_wrapped(MemoryFlags::empty(), vec![0u8; 10], 10, 4, 7).is_none());
        assert!(Memory::new_wrapped(MemoryFlags::empty(), vec![0u8; 10], 11, 0, 10).is_none());
        assert_eq!(
            Memory::try_new_wrapped(MemoryFlags::empty(), vec![0u8; 10], 10, 4, 7).unwrap_err(),
            Error::InvalidWindow {
                offset: 4,
                size: 7,
                maxsize: 10
            }
        );
    }

    #[test]
    fn test_wrapped_zero_fill() {
        let flags = MemoryFlags::ZERO_PREFIXED | MemoryFlags::ZERO_PADDED;
        let mem = Memory::new_wrapped(flags, vec![0xAAu8; 16], 16, 4, 8).unwrap();
        assert_eq!(mem.bytes().as_ref(), &[0xAA; 8]);

        let map = mem.map(MapFlags::READ).unwrap();
        assert_eq!(map.region(0, 4), &[0; 4]);
        assert_eq!(map.region(12, 4), &[0; 4]);
    }

    #[test]
    fn test_wrapped_without_zero_flags_keeps_bytes() {
        let mem = Memory::new_wrapped(MemoryFlags::empty(), vec![0xAAu8; 16], 16, 4, 8).unwrap();
        let map = mem.map(MapFlags::READ).unwrap();
        assert_eq!(map.region(0, 4), &[0xAA; 4]);
    }

    #[test]
    fn test_acquire_release() {
        let mem = wrapped(b"abc");
        assert_eq!(mem.ref_count(), 1);

        let second = mem.acquire();
        assert_eq!(mem.ref_count(), 2);
        assert!(second.ptr_eq(&mem));

        assert!(!second.release());
        assert_eq!(mem.ref_count(), 1);
        assert!(mem.release());
    }

    #[test]
    fn test_destroy_notify_after_last_release() {
        let destroyed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&destroyed);
        let mem = Memory::new_wrapped_full(MemoryFlags::empty(), vec![1, 2, 3], 3, 0, 3, move |_| {
            flag.store(true, Ordering::SeqCst)
        })
        .unwrap();

        let refs: Vec<_> = (0..3).map(|_| mem.acquire()).collect();
        assert!(!mem.release());
        for r in refs {
            assert!(!destroyed.load(Ordering::SeqCst));
            r.release();
        }
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_copy_whole() {
        let mem = wrapped(b"hello world");
        let copy = mem.copy(0, None).unwrap();
        assert_eq!(copy.bytes(), mem.bytes());
        assert!(copy.parent().is_none());
        assert!(!copy.ptr_eq(&mem));
        assert!(copy.is_writable());
    }

    #[test]
    fn test_copy_window() {
        let mem = wrapped(b"hello world");
        assert_eq!(mem.copy(6, Some(5)).unwrap().bytes().as_ref(), b"world");
        assert_eq!(mem.copy(6, None).unwrap().bytes().as_ref(), b"world");
        assert_eq!(mem.copy(11, None).unwrap().size(), 0);
        assert!(mem.copy(12, None).is_none());
        assert!(mem.copy(6, Some(6)).is_none());
        assert!(mem.copy(-1, None).is_none());
    }

    #[test]
    fn test_copy_into_prefix() {
        let mem = Memory::new_wrapped(MemoryFlags::empty(), b"xxabcd".to_vec(), 6, 2, 4).unwrap();
        let copy = mem.copy(-2, None).unwrap();
        assert_eq!(copy.bytes().as_ref(), b"xxabcd");
    }

    #[test]
    fn test_copy_of_readonly_is_writable() {
        let mem = Memory::new_wrapped(MemoryFlags::READONLY, b"data".to_vec(), 4, 0, 4).unwrap();
        assert!(mem.map(MapFlags::WRITE).is_none());

        let copy = mem.copy(0, None).unwrap();
        assert!(!copy.has_flags(MemoryFlags::READONLY));
        let mut map = copy.map(MapFlags::WRITE).unwrap();
        map.as_mut_slice().unwrap().copy_from_slice(b"DATA");
        drop(map);

        assert_eq!(copy.bytes().as_ref(), b"DATA");
        assert_eq!(mem.bytes().as_ref(), b"data");
    }

    #[test]
    fn test_share_is_readonly_view() {
        let mem = wrapped(b"0123456789");
        let sub = mem.share(2, Some(4)).unwrap();

        assert_eq!(sub.bytes().as_ref(), b"2345");
        assert_eq!(sub.offset(), 2);
        assert_eq!(sub.maxsize(), 10);
        assert!(sub.has_flags(MemoryFlags::READONLY));
        assert!(sub.parent().unwrap().ptr_eq(&mem));
        assert!(sub.map(MapFlags::WRITE).is_none());
    }

    #[test]
    fn test_share_of_share_points_at_root() {
        let mem = wrapped(b"0123456789");
        let sub = mem.share(2, None).unwrap();
        let subsub = sub.share(1, Some(2)).unwrap();

        assert_eq!(subsub.bytes().as_ref(), b"34");
        assert!(subsub.parent().unwrap().ptr_eq(&mem));
    }

    #[test]
    fn test_share_does_not_keep_parent_alive() {
        let mem = wrapped(b"0123456789");
        let sub = mem.share(0, Some(5)).unwrap();
        drop(mem);

        assert!(sub.parent().is_none());
        assert_eq!(sub.bytes().as_ref(), b"01234");
    }

    #[test]
    fn test_no_share() {
        let mem = Memory::new_wrapped(MemoryFlags::NO_SHARE, b"abc".to_vec(), 3, 0, 3).unwrap();
        assert!(mem.share(0, None).is_none());
    }

    #[test]
    fn test_is_span() {
        let mem = Memory::new_wrapped(MemoryFlags::empty(), b"..0123456789".to_vec(), 12, 2, 10)
            .unwrap();
        let a = mem.share(0, Some(4)).unwrap();
        let b = mem.share(4, Some(6)).unwrap();

        assert_eq!(a.is_span(&b), Some(0));
        assert_eq!(b.is_span(&a), None);

        let c = mem.share(5, None).unwrap();
        assert_eq!(a.is_span(&c), None);

        let other = wrapped(b"0123456789");
        let d = other.share(4, None).unwrap();
        assert_eq!(a.is_span(&d), None);
    }

    #[test]
    fn test_resize() {
        let mut mem = Memory::new_wrapped(
            MemoryFlags::ZERO_PREFIXED | MemoryFlags::ZERO_PADDED,
            vec![0u8; 16],
            16,
            4,
            8,
        )
        .unwrap();

        // Shrinking the prefix keeps it zeroed
        mem.resize(-2, 10).unwrap();
        assert_eq!(mem.sizes(), (10, 2, 16));
        assert!(mem.has_flags(MemoryFlags::ZERO_PREFIXED));
        assert!(mem.has_flags(MemoryFlags::ZERO_PADDED));

        // Growing prefix and padding clears both
        mem.resize(3, 4).unwrap();
        assert_eq!(mem.sizes(), (4, 5, 16));
        assert!(!mem.has_flags(MemoryFlags::ZERO_PREFIXED));
        assert!(!mem.has_flags(MemoryFlags::ZERO_PADDED));
    }

    #[test]
    fn test_resize_out_of_range() {
        let mut mem = wrapped(b"0123456789");
        assert!(matches!(mem.resize(-1, 5), Err(Error::InvalidWindow { .. })));
        assert!(matches!(mem.resize(5, 6), Err(Error::InvalidWindow { .. })));
        assert_eq!(mem.sizes(), (10, 0, 10));
    }

    #[test]
    fn test_resize_requires_sole_owner() {
        let mut mem = wrapped(b"0123456789");
        let other = mem.acquire();
        assert!(!mem.is_writable());
        assert_eq!(mem.resize(1, 2), Err(Error::NotWritable));
        drop(other);

        let map = mem.map(MapFlags::READ).unwrap();
        assert!(!mem.is_writable());
        drop(map);

        assert!(mem.is_writable());
        mem.resize(1, 2).unwrap();
    }

    #[test]
    fn test_flags_mutation() {
        let mut mem = wrapped(b"abc");
        mem.set_flags(MemoryFlags::READONLY).unwrap();
        assert!(mem.map(MapFlags::WRITE).is_none());
        assert_eq!(mem.resize(0, 1), Err(Error::NotWritable));

        mem.unset_flags(MemoryFlags::READONLY).unwrap();
        assert!(mem.map(MapFlags::WRITE).is_some());
    }

    #[test]
    fn test_not_mappable() {
        let mem = Memory::new_wrapped(MemoryFlags::NOT_MAPPABLE, b"abc".to_vec(), 3, 0, 3).unwrap();
        assert!(mem.map(MapFlags::READ).is_none());
        assert!(mem.bytes().is_empty());
    }

    #[test]
    fn test_empty_map_flags_refused() {
        let mem = wrapped(b"abc");
        assert!(mem.map(MapFlags::empty()).is_none());
    }

    #[test]
    fn test_bytes_is_valid_window() {
        let mem = Memory::new_wrapped(MemoryFlags::empty(), b"__payload__".to_vec(), 11, 2, 7)
            .unwrap();
        assert_eq!(mem.bytes().as_ref(), b"payload");
    }

    #[test]
    fn test_debug_format() {
        let mem = wrapped(b"abc");
        let s = format!("{:?}", mem);
        assert!(s.contains("SystemMemory"));
        assert!(s.contains("size: 3"));
    }
}
